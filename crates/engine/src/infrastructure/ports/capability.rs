//! The contract effect implementations fulfil.

use enchantry_domain::{CapabilityId, EquippedItem, Target};

/// A passive effect.
///
/// Implementations are third-party code. Every method may fail or panic;
/// the coordinator isolates each call and never lets one failure reach
/// another target or the timer.
#[cfg_attr(test, mockall::automock)]
pub trait Capability: Send + Sync {
    fn id(&self) -> &CapabilityId;

    fn is_available(&self, target: &Target) -> anyhow::Result<bool>;

    /// Whether the item still has budget left. Items without charges always
    /// have budget.
    fn has_charges(&self, item: &EquippedItem) -> anyhow::Result<bool> {
        Ok(item.charges.map_or(true, |c| c > 0))
    }

    /// Apply the effect. Returns true iff something was actually applied.
    fn trigger(&self, target: &Target, item: &EquippedItem, level: u32) -> anyhow::Result<bool>;

    fn consume_charges(&self, item: &EquippedItem, level: u32) -> anyhow::Result<()> {
        let _ = (item, level);
        Ok(())
    }
}
