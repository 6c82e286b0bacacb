//! Enchantry domain.
//!
//! Pure types shared by the registry protocol and the passive effect
//! coordinator. Nothing here touches the host.

pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use entities::{
    CapabilityDefinition, EquippedItem, ItemGroup, ItemLocation, Target, TargetKind,
    MAX_LEVEL_LIMIT, MAX_WEIGHT,
};

pub use error::DomainError;

pub use ids::{ItemId, RegionId, TargetId};

pub use value_objects::{
    known, CapabilityId, CostCurve, Distribution, EquipmentSlot, LinearCost, TagKey, TradeType,
    CUSTOM_NAMESPACE, HOST_NAMESPACE,
};
