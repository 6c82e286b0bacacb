//! Items carried by a target that hold a capability.

use serde::{Deserialize, Serialize};

use crate::ids::ItemId;
use crate::value_objects::EquipmentSlot;

/// Where on the carrier an item sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "at")]
pub enum ItemLocation {
    Equipped(EquipmentSlot),
    Inventory(u32),
}

/// One item carrying one capability at some level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquippedItem {
    pub item_id: ItemId,
    pub material: String,
    pub location: ItemLocation,
    pub level: u32,
    /// Remaining charges; `None` when the item does not use charges.
    pub charges: Option<u32>,
}

impl EquippedItem {
    pub fn new(
        item_id: ItemId,
        material: impl Into<String>,
        location: ItemLocation,
        level: u32,
    ) -> Self {
        Self {
            item_id,
            material: material.into(),
            location,
            level,
            charges: None,
        }
    }

    pub fn with_charges(mut self, charges: u32) -> Self {
        self.charges = Some(charges);
        self
    }

    pub fn is_equipped(&self) -> bool {
        matches!(self.location, ItemLocation::Equipped(_))
    }
}
