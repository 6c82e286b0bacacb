//! Host world ports: target enumeration, liveness and the items targets carry.

use enchantry_domain::{CapabilityId, EquippedItem, RegionId, Target};

use super::error::WorldError;

/// Liveness checks, read at execution time by dispatchers and at snapshot
/// time by the coordinator.
#[cfg_attr(test, mockall::automock)]
pub trait TargetLiveness: Send + Sync {
    /// False once the target died, despawned or disconnected.
    fn is_valid(&self, target: &Target) -> bool;

    /// The region that owns the target right now.
    fn current_region(&self, target: &Target) -> Option<RegionId>;
}

/// Read access to the live simulation.
///
/// `equipped_items` and `inventory_items` touch the target itself and are
/// only called from the worker that owns the target's region.
#[cfg_attr(test, mockall::automock)]
pub trait WorldPort: Send + Sync {
    fn online_players(&self) -> Vec<Target>;

    /// Non-player targets. Hosts that shard the world may only be able to
    /// enumerate these when `supports_region_safe_enumeration` is true.
    fn non_player_targets(&self) -> Result<Vec<Target>, WorldError>;

    fn supports_region_safe_enumeration(&self) -> bool;

    /// Items in equipment slots that carry `capability`.
    fn equipped_items(&self, target: &Target, capability: &CapabilityId) -> Vec<EquippedItem>;

    /// Items in general inventory slots that carry `capability`.
    fn inventory_items(&self, target: &Target, capability: &CapabilityId) -> Vec<EquippedItem>;
}
