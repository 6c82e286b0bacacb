//! Use cases - orchestration over entities and ports.
//!
//! - `registration` - one-shot injection of capabilities into the host registry
//! - `passive` - periodic passive effects over live targets

pub mod passive;
pub mod registration;

pub use passive::{PassiveCapability, PassiveEffectCoordinator};
pub use registration::{BatchReport, CapabilityRegistry};
