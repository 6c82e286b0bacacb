//! Value objects - immutable, validated building blocks of definitions.

mod capability_id;
mod cost;
mod distribution;
mod equipment_slot;
mod tag_key;

pub use capability_id::CapabilityId;
pub use cost::{CostCurve, LinearCost};
pub use distribution::{Distribution, TradeType};
pub use equipment_slot::EquipmentSlot;
pub use tag_key::{known, TagKey, CUSTOM_NAMESPACE, HOST_NAMESPACE};
