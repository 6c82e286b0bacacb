//! Capability registration.
//!
//! Injects custom capabilities into the host's frozen registry with a
//! one-shot protocol: unfreeze, bind item groups, register the whole batch
//! in two phases, freeze.
//!
//! Phase 1 creates each entry (after the entry exists its reference can be
//! bound into tags) and applies its distribution tags. Phase 2 runs only
//! once every entry of the batch exists and wires exclusivity in both
//! directions. A failure in phase 1 drops that capability alone.

mod distribution;
mod error;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use enchantry_domain::{CapabilityDefinition, CapabilityId, ItemGroup, TagKey};

use crate::entities::TagBindingIndex;
use crate::infrastructure::config::DistributionSettings;
use crate::infrastructure::ports::{CapabilityRef, HostRegistry};

pub use distribution::{distribution_edits, TagEdit};
pub use error::{RegistrationError, RegistryStateError};

/// Where the registry is in its boot protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootPhase {
    /// Frozen by the host, not yet opened by us.
    Pristine,
    /// Mutation window open.
    Open,
    /// Frozen again. Final.
    Sealed,
}

/// A capability the host accepted.
#[derive(Debug, Clone)]
pub struct RegisteredCapability {
    pub reference: CapabilityRef,
    pub definition: CapabilityDefinition,
}

/// Outcome of one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Ids the host accepted, in batch order.
    pub registered: Vec<CapabilityId>,
    /// Capabilities dropped in phase 1.
    pub failed: Vec<RegistrationError>,
    /// Exclusivity links that could not be made. The capability itself
    /// stays registered.
    pub unresolved_partners: Vec<RegistrationError>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.unresolved_partners.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<&CapabilityId> {
        self.failed.iter().map(RegistrationError::capability).collect()
    }
}

pub struct CapabilityRegistry {
    host: Arc<dyn HostRegistry>,
    tags: TagBindingIndex,
    settings: DistributionSettings,
    phase: BootPhase,
    entries: BTreeMap<CapabilityId, RegisteredCapability>,
}

impl CapabilityRegistry {
    pub fn new(host: Arc<dyn HostRegistry>, settings: DistributionSettings) -> Self {
        Self {
            tags: TagBindingIndex::new(Arc::clone(&host)),
            host,
            settings,
            phase: BootPhase::Pristine,
            entries: BTreeMap::new(),
        }
    }

    pub fn phase(&self) -> BootPhase {
        self.phase
    }

    /// Open the host's mutation window. Valid exactly once.
    pub fn unfreeze(&mut self) -> Result<(), RegistryStateError> {
        if self.phase != BootPhase::Pristine {
            return Err(RegistryStateError::WindowConsumed);
        }
        self.host.open_mutation_window()?;
        self.phase = BootPhase::Open;
        tracing::info!("Capability registry unfrozen");
        Ok(())
    }

    /// Bind item groups into the host. Invalid or rejected groups are
    /// logged and skipped; returns how many were bound.
    pub fn bind_item_groups(&mut self, groups: &[ItemGroup]) -> Result<usize, RegistryStateError> {
        self.ensure_open()?;
        let mut bound = 0;
        for group in groups {
            if let Err(e) = group.validate() {
                tracing::error!(group = %group.id, error = %e, "Skipping invalid item group");
                continue;
            }
            match self.host.bind_item_group(group) {
                Ok(()) => bound += 1,
                Err(e) => {
                    tracing::error!(group = %group.id, error = %e, "Host rejected item group")
                }
            }
        }
        tracing::debug!(bound, total = groups.len(), "Item groups bound");
        Ok(bound)
    }

    /// Register a batch of definitions. The registry stays open afterwards;
    /// call [`CapabilityRegistry::freeze`] once every batch is in.
    pub fn register_batch(
        &mut self,
        definitions: Vec<CapabilityDefinition>,
    ) -> Result<BatchReport, RegistryStateError> {
        self.ensure_open()?;
        let mut report = BatchReport::default();
        let mut seen = HashSet::new();

        for definition in definitions {
            let id = definition.id.clone();
            if !seen.insert(id.clone()) {
                tracing::error!(capability = %id, "Duplicate capability id in batch");
                report.failed.push(RegistrationError::DuplicateId(id));
                continue;
            }
            match self.create(definition) {
                Ok(()) => report.registered.push(id),
                Err(e) => {
                    tracing::error!(
                        capability = %e.capability(),
                        error = %e,
                        "Capability registration failed"
                    );
                    report.failed.push(e);
                }
            }
        }

        for id in &report.registered {
            for e in self.wire_exclusivity(id) {
                tracing::error!(capability = %id, error = %e, "Exclusivity link not created");
                report.unresolved_partners.push(e);
            }
        }

        tracing::info!(
            registered = report.registered.len(),
            failed = report.failed.len(),
            "Capability batch registered"
        );
        Ok(report)
    }

    /// Seal the host registry. Only valid while open.
    pub fn freeze(&mut self) -> Result<(), RegistryStateError> {
        match self.phase {
            BootPhase::Pristine => Err(RegistryStateError::NotOpen),
            BootPhase::Sealed => Err(RegistryStateError::AlreadyFrozen),
            BootPhase::Open => {
                self.host.seal_registry()?;
                self.phase = BootPhase::Sealed;
                tracing::info!(capabilities = self.entries.len(), "Capability registry frozen");
                Ok(())
            }
        }
    }

    /// Run the whole protocol: unfreeze, item groups, one batch, freeze.
    pub fn boot(
        &mut self,
        groups: &[ItemGroup],
        definitions: Vec<CapabilityDefinition>,
    ) -> Result<BatchReport, RegistryStateError> {
        self.unfreeze()?;
        self.bind_item_groups(groups)?;
        let report = self.register_batch(definitions)?;
        self.freeze()?;
        Ok(report)
    }

    pub fn get(&self, id: &CapabilityId) -> Option<&RegisteredCapability> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &CapabilityId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredCapability> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids currently in `id`'s exclusive-set tag on the host.
    pub fn exclusive_partners(&self, id: &CapabilityId) -> Vec<CapabilityId> {
        self.tags
            .members(&TagKey::exclusive_set(id))
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.id().clone())
            .collect()
    }

    fn ensure_open(&self) -> Result<(), RegistryStateError> {
        match self.phase {
            BootPhase::Open => Ok(()),
            BootPhase::Pristine => Err(RegistryStateError::NotOpen),
            BootPhase::Sealed => Err(RegistryStateError::AlreadyFrozen),
        }
    }

    /// Phase 1 for one definition.
    fn create(&mut self, definition: CapabilityDefinition) -> Result<(), RegistrationError> {
        let id = definition.id.clone();

        if self.entries.contains_key(&id) || self.host.lookup(&id).is_some() {
            return Err(RegistrationError::DuplicateId(id));
        }
        definition
            .validate()
            .map_err(|source| RegistrationError::InvalidDefinition {
                capability: id.clone(),
                source,
            })?;
        if let Some(group) = definition
            .item_groups()
            .into_iter()
            .find(|g| !self.host.has_item_group(g))
        {
            return Err(RegistrationError::UnknownItemGroup {
                capability: id,
                group: group.to_string(),
            });
        }

        let host_error = |source| RegistrationError::Host {
            capability: definition.id.clone(),
            source,
        };
        self.tags
            .create_tag(&TagKey::exclusive_set(&id))
            .map_err(host_error)?;
        let reference = self.host.create_entry(&definition).map_err(host_error)?;

        for edit in distribution_edits(&definition, &self.settings) {
            let applied = match &edit {
                TagEdit::Add(tag) => self.tags.add_member(tag, &reference),
                TagEdit::Remove(tag) => self.tags.remove_member(tag, &reference),
            };
            if let Err(e) = applied {
                tracing::warn!(
                    capability = %id,
                    tag = %edit.tag(),
                    error = %e,
                    "Distribution tag not updated"
                );
            }
        }

        tracing::debug!(capability = %id, reference = %reference, "Capability entry created");
        self.entries.insert(
            id,
            RegisteredCapability {
                reference,
                definition,
            },
        );
        Ok(())
    }

    /// Phase 2 for one registered capability.
    fn wire_exclusivity(&mut self, id: &CapabilityId) -> Vec<RegistrationError> {
        let Some(entry) = self.entries.get(id) else {
            return Vec::new();
        };
        let own = entry.reference.clone();
        let partners: Vec<CapabilityId> = entry.definition.exclusive_set.iter().cloned().collect();
        let own_tag = TagKey::exclusive_set(id);
        let mut errors = Vec::new();

        for partner in partners {
            let resolved = self
                .entries
                .get(&partner)
                .map(|p| p.reference.clone())
                .or_else(|| self.host.lookup(&partner));
            let Some(partner_ref) = resolved else {
                errors.push(RegistrationError::UnresolvedExclusivityPartner {
                    capability: id.clone(),
                    partner,
                });
                continue;
            };

            let partner_tag = TagKey::exclusive_set(&partner);
            let linked = self
                .tags
                .add_member(&own_tag, &partner_ref)
                .and_then(|_| self.tags.create_tag(&partner_tag))
                .and_then(|()| self.tags.add_member(&partner_tag, &own));
            if let Err(source) = linked {
                errors.push(RegistrationError::Host {
                    capability: id.clone(),
                    source,
                });
            }
        }
        errors
    }
}
