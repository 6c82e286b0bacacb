//! Tag binding index.
//!
//! Incremental membership edits over a host whose tags can only be rebound
//! wholesale. Every edit reads the current members, applies the change and
//! rebinds through `HostRegistry::bind_tag`, which rewrites the container in
//! place.
//!
//! Only valid during the single-threaded boot window; `&mut self` on every
//! edit keeps it that way for callers holding one index.

use std::sync::Arc;

use enchantry_domain::TagKey;

use crate::infrastructure::ports::{CapabilityRef, HostRegistry, HostRegistryError};

pub struct TagBindingIndex {
    registry: Arc<dyn HostRegistry>,
}

impl TagBindingIndex {
    pub fn new(registry: Arc<dyn HostRegistry>) -> Self {
        Self { registry }
    }

    pub fn members(&self, tag: &TagKey) -> Option<Vec<CapabilityRef>> {
        self.registry.tag_members(tag)
    }

    /// Make sure `tag` exists. Existing contents are left alone.
    pub fn create_tag(&mut self, tag: &TagKey) -> Result<(), HostRegistryError> {
        if self.registry.tag_members(tag).is_some() {
            return Ok(());
        }
        self.registry.bind_tag(tag, Vec::new())
    }

    /// Add `member` to `tag`. Returns false if it was already there.
    pub fn add_member(
        &mut self,
        tag: &TagKey,
        member: &CapabilityRef,
    ) -> Result<bool, HostRegistryError> {
        let mut members = self.current(tag)?;
        if members.contains(member) {
            return Ok(false);
        }
        members.push(member.clone());
        self.registry.bind_tag(tag, members)?;
        Ok(true)
    }

    /// Remove `member` from `tag`. Returns false if it was not there.
    pub fn remove_member(
        &mut self,
        tag: &TagKey,
        member: &CapabilityRef,
    ) -> Result<bool, HostRegistryError> {
        let mut members = self.current(tag)?;
        let before = members.len();
        members.retain(|m| m != member);
        if members.len() == before {
            return Ok(false);
        }
        self.registry.bind_tag(tag, members)?;
        Ok(true)
    }

    fn current(&self, tag: &TagKey) -> Result<Vec<CapabilityRef>, HostRegistryError> {
        self.registry
            .tag_members(tag)
            .ok_or_else(|| HostRegistryError::UnknownTag(tag.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_registry::InMemoryHostRegistry;
    use crate::infrastructure::ports::MockHostRegistry;
    use enchantry_domain::{known, CapabilityId};

    fn reference(raw: u32, id: &str) -> CapabilityRef {
        CapabilityRef::new(raw, CapabilityId::new(id).unwrap())
    }

    #[test]
    fn edits_preserve_container_identity() {
        let registry = Arc::new(InMemoryHostRegistry::new());
        let held = registry.tag_container(&known::CURSE).unwrap();
        registry.open_mutation_window().unwrap();
        let curse = registry.seed_entry(CapabilityId::new("minecraft:vanishing_curse").unwrap());
        let mut index = TagBindingIndex::new(registry.clone());

        assert!(index.add_member(&known::CURSE, &curse).unwrap());
        assert!(held.contains(curse.id()));

        assert!(index.remove_member(&known::CURSE, &curse).unwrap());
        assert!(held.is_empty());
        assert!(Arc::ptr_eq(
            &held,
            &registry.tag_container(&known::CURSE).unwrap()
        ));
    }

    #[test]
    fn add_keeps_existing_members_and_order() {
        let existing = reference(1, "minecraft:mending");
        let added = reference(2, "vein_miner");

        let mut registry = MockHostRegistry::new();
        let current = vec![existing.clone()];
        registry
            .expect_tag_members()
            .returning(move |_| Some(current.clone()));
        let expected = vec![existing.clone(), added.clone()];
        registry
            .expect_bind_tag()
            .withf(move |tag, members| *tag == known::TREASURE && *members == expected)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut index = TagBindingIndex::new(Arc::new(registry));
        assert!(index.add_member(&known::TREASURE, &added).unwrap());
    }

    #[test]
    fn no_op_edits_do_not_rebind() {
        let member = reference(3, "telepathy");
        let mut registry = MockHostRegistry::new();
        let current = vec![member.clone()];
        registry
            .expect_tag_members()
            .returning(move |_| Some(current.clone()));
        registry.expect_bind_tag().times(0);

        let mut index = TagBindingIndex::new(Arc::new(registry));
        assert!(!index.add_member(&known::TRADEABLE, &member).unwrap());
        assert!(!index
            .remove_member(&known::TRADEABLE, &reference(4, "other"))
            .unwrap());
    }

    #[test]
    fn missing_tags_are_reported() {
        let mut registry = MockHostRegistry::new();
        registry.expect_tag_members().returning(|_| None);

        let mut index = TagBindingIndex::new(Arc::new(registry));
        let tag = TagKey::custom("missing");
        let err = index.add_member(&tag, &reference(1, "a")).unwrap_err();

        assert_eq!(err, HostRegistryError::UnknownTag(tag));
    }

    #[test]
    fn create_tag_leaves_existing_contents() {
        let registry = Arc::new(InMemoryHostRegistry::new());
        registry.open_mutation_window().unwrap();
        let mut index = TagBindingIndex::new(registry.clone());
        let tag = TagKey::custom("exclusive_set/vein_miner");
        let member = registry.seed_entry(CapabilityId::new("minecraft:fortune").unwrap());

        index.create_tag(&tag).unwrap();
        index.add_member(&tag, &member).unwrap();
        index.create_tag(&tag).unwrap();

        assert_eq!(index.members(&tag), Some(vec![member]));
    }
}
