//! Port traits for the host boundary.
//!
//! These are the only abstractions in the engine; everything else is
//! concrete types. Ports exist for:
//! - The host's frozen capability registry
//! - The host's scheduler (possibly region-sharded)
//! - World enumeration and target liveness
//! - Per-item durable storage
//! - Effect implementations
//! - Clock (for testing)

mod capability;
mod error;
mod host;
mod scheduler;
mod storage;
mod testing;
mod world;

pub use capability::Capability;
pub use error::{DispatchError, HostRegistryError, StoreError, WorldError};
pub use host::{CapabilityRef, HostRegistry};
pub use scheduler::{HostDispatcher, Job, RepeatingJob, TaskHandle};
pub use storage::ItemDurableStore;
pub use testing::ClockPort;
pub use world::{TargetLiveness, WorldPort};

#[cfg(test)]
pub use capability::MockCapability;
#[cfg(test)]
pub use host::MockHostRegistry;
#[cfg(test)]
pub use storage::MockItemDurableStore;
#[cfg(test)]
pub use testing::MockClockPort;
#[cfg(test)]
pub use world::{MockTargetLiveness, MockWorldPort};
