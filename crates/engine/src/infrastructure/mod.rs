//! Infrastructure implementations.
//!
//! Port traits plus the reference adapters that implement them.

pub mod clock;
pub mod config;
pub mod isolation;
pub mod item_store;
pub mod manual_dispatcher;
pub mod memory_registry;
pub mod ports;
pub mod telemetry;
pub mod tokio_dispatcher;
