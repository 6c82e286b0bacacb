//! Domain entities.

mod capability_definition;
mod equipped_item;
mod item_group;
mod target;

pub use capability_definition::{CapabilityDefinition, MAX_LEVEL_LIMIT, MAX_WEIGHT};
pub use equipped_item::{EquippedItem, ItemLocation};
pub use item_group::ItemGroup;
pub use target::{Target, TargetKind};
