//! Passive effects.
//!
//! A repeating tick snapshots live targets and fans out one job per target
//! to the worker owning that target's region. Each job tries every ready
//! passive capability against the items the target carries.

mod coordinator;
mod error;

use std::sync::Arc;
use std::time::Duration;

use enchantry_domain::CapabilityId;

use crate::infrastructure::ports::Capability;

pub use coordinator::{
    PassiveEffectCoordinator, PassiveStats, TargetReport, TickReport, TriggerOutcome,
};
pub use error::{LoopError, TriggerError, TriggerStage};

/// A capability the coordinator runs periodically.
#[derive(Clone)]
pub struct PassiveCapability {
    capability: Arc<dyn Capability>,
    period: Duration,
    scan_full_inventory: bool,
}

impl PassiveCapability {
    /// `period` is how often the capability is tried; it is rounded up to
    /// whole ticks.
    pub fn new(capability: Arc<dyn Capability>, period: Duration) -> Self {
        Self {
            capability,
            period,
            scan_full_inventory: false,
        }
    }

    /// Also try items in general inventory slots, not just equipped ones.
    pub fn with_full_inventory_scan(mut self) -> Self {
        self.scan_full_inventory = true;
        self
    }

    pub fn id(&self) -> &CapabilityId {
        self.capability.id()
    }

    pub fn capability(&self) -> &Arc<dyn Capability> {
        &self.capability
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn scans_full_inventory(&self) -> bool {
        self.scan_full_inventory
    }

    /// Whole ticks between tries, at least one.
    pub fn period_ticks(&self, tick_interval: Duration) -> u64 {
        let tick = tick_interval.as_millis().max(1);
        let ticks = self.period.as_millis().div_ceil(tick);
        u64::try_from(ticks).unwrap_or(u64::MAX).max(1)
    }
}

impl std::fmt::Debug for PassiveCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassiveCapability")
            .field("id", self.id())
            .field("period", &self.period)
            .field("scan_full_inventory", &self.scan_full_inventory)
            .finish()
    }
}
