//! Registration errors.

use enchantry_domain::{CapabilityId, DomainError};

use crate::infrastructure::ports::HostRegistryError;

/// Failure to register one capability. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Duplicate capability id: {0}")]
    DuplicateId(CapabilityId),

    #[error("Unknown item group '{group}' for {capability}")]
    UnknownItemGroup {
        capability: CapabilityId,
        group: String,
    },

    #[error("Invalid definition for {capability}: {source}")]
    InvalidDefinition {
        capability: CapabilityId,
        #[source]
        source: DomainError,
    },

    #[error("Exclusivity partner {partner} of {capability} is not registered")]
    UnresolvedExclusivityPartner {
        capability: CapabilityId,
        partner: CapabilityId,
    },

    #[error("Host rejected {capability}: {source}")]
    Host {
        capability: CapabilityId,
        #[source]
        source: HostRegistryError,
    },
}

impl RegistrationError {
    /// The capability this error is about.
    pub fn capability(&self) -> &CapabilityId {
        match self {
            Self::DuplicateId(id) => id,
            Self::UnknownItemGroup { capability, .. }
            | Self::InvalidDefinition { capability, .. }
            | Self::UnresolvedExclusivityPartner { capability, .. }
            | Self::Host { capability, .. } => capability,
        }
    }
}

/// Misuse of the unfreeze/register/freeze protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryStateError {
    /// The mutation window was already opened once.
    #[error("Registry mutation window was already used")]
    WindowConsumed,

    #[error("Registry mutation window is not open")]
    NotOpen,

    #[error("Registry is already frozen")]
    AlreadyFrozen,

    #[error("Host registry error: {0}")]
    Host(#[from] HostRegistryError),
}
