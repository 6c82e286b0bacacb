//! In-memory host registry.
//!
//! Models the host's frozen capability registry for embedding and tests:
//! it starts frozen, holds the host's own tags, and hands out tag containers
//! that other subsystems may keep. Binding a tag rewrites the container's
//! contents in place so those holders observe the change.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use enchantry_domain::{
    known, CapabilityDefinition, CapabilityId, ItemGroup, TagKey, TradeType,
};

use crate::infrastructure::ports::{CapabilityRef, HostRegistry, HostRegistryError};

/// A tag as the host stores it. Identity is the `Arc`; contents change.
#[derive(Debug, Default)]
pub struct TagContainer {
    members: RwLock<Vec<CapabilityRef>>,
}

impl TagContainer {
    pub fn members(&self) -> Vec<CapabilityRef> {
        self.members.read().clone()
    }

    pub fn contains(&self, id: &CapabilityId) -> bool {
        self.members.read().iter().any(|m| m.id() == id)
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    fn replace_contents(&self, members: Vec<CapabilityRef>) {
        *self.members.write() = members;
    }
}

#[derive(Default)]
struct RegistryState {
    open: bool,
    next_raw: u32,
    entries: HashMap<CapabilityId, CapabilityRef>,
    definitions: HashMap<CapabilityId, CapabilityDefinition>,
    tags: HashMap<TagKey, Arc<TagContainer>>,
    item_groups: HashMap<String, ItemGroup>,
    /// Item tags: tag key to the materials it matches.
    item_tags: HashMap<TagKey, Vec<String>>,
}

impl RegistryState {
    fn ensure_open(&self) -> Result<(), HostRegistryError> {
        if self.open {
            Ok(())
        } else {
            Err(HostRegistryError::Frozen)
        }
    }

    fn insert_entry(&mut self, id: CapabilityId) -> CapabilityRef {
        let reference = CapabilityRef::new(self.next_raw, id.clone());
        self.next_raw += 1;
        self.entries.insert(id, reference.clone());
        reference
    }
}

/// In-memory implementation of [`HostRegistry`].
pub struct InMemoryHostRegistry {
    state: RwLock<RegistryState>,
}

impl InMemoryHostRegistry {
    /// A frozen registry holding the host's distribution and trade tags,
    /// all empty.
    pub fn new() -> Self {
        let mut state = RegistryState::default();
        for tag in known::distribution_tags() {
            state.tags.insert(tag, Arc::default());
        }
        for trade in TradeType::ALL {
            state.tags.insert(trade.tag(), Arc::default());
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Add host-provided entries, as if the host registered them at startup.
    pub fn with_entries<I>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = CapabilityId>,
    {
        for id in ids {
            self.seed_entry(id);
        }
        self
    }

    /// Add one host-provided entry and its exclusive-set tag, bypassing the
    /// mutation window.
    pub fn seed_entry(&self, id: CapabilityId) -> CapabilityRef {
        let mut state = self.state.write();
        if let Some(existing) = state.entries.get(&id) {
            return existing.clone();
        }
        state
            .tags
            .entry(TagKey::exclusive_set(&id))
            .or_default();
        state.insert_entry(id)
    }

    /// Add a host item group, bypassing the mutation window.
    pub fn seed_item_group(&self, group: ItemGroup) {
        self.state.write().item_groups.insert(group.id.clone(), group);
    }

    /// The container the host hands out for `tag`.
    pub fn tag_container(&self, tag: &TagKey) -> Option<Arc<TagContainer>> {
        self.state.read().tags.get(tag).cloned()
    }

    /// Materials bound under an item tag.
    pub fn item_tag(&self, tag: &TagKey) -> Option<Vec<String>> {
        self.state.read().item_tags.get(tag).cloned()
    }

    /// The definition a custom entry was created from.
    pub fn definition(&self, id: &CapabilityId) -> Option<CapabilityDefinition> {
        self.state.read().definitions.get(id).cloned()
    }

    pub fn entry_count(&self) -> usize {
        self.state.read().entries.len()
    }
}

impl Default for InMemoryHostRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRegistry for InMemoryHostRegistry {
    fn is_frozen(&self) -> bool {
        !self.state.read().open
    }

    fn open_mutation_window(&self) -> Result<(), HostRegistryError> {
        let mut state = self.state.write();
        if state.open {
            return Err(HostRegistryError::AlreadyOpen);
        }
        state.open = true;
        tracing::debug!("Host registry mutation window opened");
        Ok(())
    }

    fn create_entry(
        &self,
        definition: &CapabilityDefinition,
    ) -> Result<CapabilityRef, HostRegistryError> {
        let mut state = self.state.write();
        state.ensure_open()?;
        if state.entries.contains_key(&definition.id) {
            return Err(HostRegistryError::DuplicateEntry(definition.id.clone()));
        }
        state
            .definitions
            .insert(definition.id.clone(), definition.clone());
        Ok(state.insert_entry(definition.id.clone()))
    }

    fn lookup(&self, id: &CapabilityId) -> Option<CapabilityRef> {
        self.state.read().entries.get(id).cloned()
    }

    fn tag_members(&self, tag: &TagKey) -> Option<Vec<CapabilityRef>> {
        self.state.read().tags.get(tag).map(|c| c.members())
    }

    fn bind_tag(
        &self,
        tag: &TagKey,
        members: Vec<CapabilityRef>,
    ) -> Result<(), HostRegistryError> {
        let mut state = self.state.write();
        state.ensure_open()?;
        match state.tags.get(tag) {
            Some(container) => container.replace_contents(members),
            None => {
                let container = TagContainer::default();
                container.replace_contents(members);
                state.tags.insert(tag.clone(), Arc::new(container));
            }
        }
        Ok(())
    }

    fn bind_item_group(&self, group: &ItemGroup) -> Result<(), HostRegistryError> {
        let mut state = self.state.write();
        state.ensure_open()?;
        state.item_tags.insert(group.tag(), group.materials.clone());
        state.item_groups.insert(group.id.clone(), group.clone());
        Ok(())
    }

    fn has_item_group(&self, id: &str) -> bool {
        self.state.read().item_groups.contains_key(id)
    }

    fn seal_registry(&self) -> Result<(), HostRegistryError> {
        let mut state = self.state.write();
        if !state.open {
            return Err(HostRegistryError::AlreadySealed);
        }
        state.open = false;
        tracing::debug!(entries = state.entries.len(), "Host registry sealed");
        Ok(())
    }
}
