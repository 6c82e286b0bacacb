//! Item groups - named sets of item materials plus the slots they occupy.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{EquipmentSlot, TagKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGroup {
    pub id: String,
    pub materials: Vec<String>,
    pub slots: Vec<EquipmentSlot>,
}

impl ItemGroup {
    pub fn new(
        id: impl Into<String>,
        materials: impl IntoIterator<Item = impl Into<String>>,
        slots: impl IntoIterator<Item = EquipmentSlot>,
    ) -> Self {
        Self {
            id: id.into(),
            materials: materials.into_iter().map(Into::into).collect(),
            slots: slots.into_iter().collect(),
        }
    }

    /// Item tag the host binds this group under.
    pub fn tag(&self) -> TagKey {
        TagKey::item_group(&self.id)
    }

    pub fn contains(&self, material: &str) -> bool {
        self.materials.iter().any(|m| m == material)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.trim().is_empty() {
            return Err(DomainError::invalid_id("Item group id cannot be empty"));
        }
        if self.slots.is_empty() {
            return Err(DomainError::validation(format!(
                "item group '{}' has no equipment slots",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_lives_in_custom_namespace() {
        let group = ItemGroup::new("sword", ["diamond_sword"], [EquipmentSlot::MainHand]);
        assert_eq!(group.tag().to_string(), "enchantry:items/sword");
        assert!(group.contains("diamond_sword"));
        assert!(!group.contains("bow"));
    }

    #[test]
    fn requires_slots() {
        let group = ItemGroup::new("nothing", Vec::<String>::new(), Vec::new());
        assert!(group.validate().is_err());
    }
}
