//! Host capability registry port.

use std::fmt;

use enchantry_domain::{CapabilityDefinition, CapabilityId, ItemGroup, TagKey};

use super::error::HostRegistryError;

/// Opaque handle to a registry entry owned by the host.
///
/// Handles are created once, inside the mutation window, and stay valid for
/// the life of the process. Holding one does not keep anything alive on the
/// host side; it only names the entry for tag edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityRef {
    raw: u32,
    id: CapabilityId,
}

impl CapabilityRef {
    pub fn new(raw: u32, id: CapabilityId) -> Self {
        Self { raw, id }
    }

    pub fn raw(&self) -> u32 {
        self.raw
    }

    pub fn id(&self) -> &CapabilityId {
        &self.id
    }
}

impl fmt::Display for CapabilityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.id, self.raw)
    }
}

/// The host's capability registry.
///
/// Frozen after host startup. Mutations are only valid between
/// `open_mutation_window` and `seal_registry`; reads are safe from any
/// thread once sealed.
///
/// `bind_tag` replaces the *contents* of an existing tag container and must
/// never swap the container object itself, because other host subsystems may
/// already hold it.
#[cfg_attr(test, mockall::automock)]
pub trait HostRegistry: Send + Sync {
    fn is_frozen(&self) -> bool;

    fn open_mutation_window(&self) -> Result<(), HostRegistryError>;

    /// Create the entry and return its handle. The entry is resolvable by
    /// `lookup` as soon as this returns.
    fn create_entry(
        &self,
        definition: &CapabilityDefinition,
    ) -> Result<CapabilityRef, HostRegistryError>;

    fn lookup(&self, id: &CapabilityId) -> Option<CapabilityRef>;

    /// Current members of a tag, or `None` if the tag does not exist.
    fn tag_members(&self, tag: &TagKey) -> Option<Vec<CapabilityRef>>;

    /// Bind `members` to `tag`, creating the tag if needed.
    fn bind_tag(&self, tag: &TagKey, members: Vec<CapabilityRef>)
        -> Result<(), HostRegistryError>;

    /// Bind `group` as an item tag under `group.tag()`.
    fn bind_item_group(&self, group: &ItemGroup) -> Result<(), HostRegistryError>;

    fn has_item_group(&self, id: &str) -> bool;

    fn seal_registry(&self) -> Result<(), HostRegistryError>;
}
