//! Enchantry Engine library.
//!
//! Injects third-party capabilities into a host's frozen registry and runs
//! their passive effects on the worker that owns each target.
//!
//! ## Structure
//!
//! - `entities/` - Wrappers over host state (tag bindings, trigger ledger)
//! - `use_cases/` - Registry boot protocol and passive effect coordinator
//! - `infrastructure/` - Ports plus reference adapters
//! - `app` - Engine composition

pub mod app;
pub mod entities;
pub mod infrastructure;
pub mod use_cases;

pub use app::{Engine, EngineError, HostPorts};
pub use infrastructure::config::EngineConfig;
