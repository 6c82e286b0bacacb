//! Error types for port operations.

use enchantry_domain::{CapabilityId, ItemId, TagKey};

/// Host registry operation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostRegistryError {
    /// Mutation attempted outside the open window.
    #[error("Registry is frozen")]
    Frozen,

    /// Window opened while it was already open.
    #[error("Registry mutation window is already open")]
    AlreadyOpen,

    /// Seal attempted on a sealed registry.
    #[error("Registry is already sealed")]
    AlreadySealed,

    #[error("Registry already has an entry for {0}")]
    DuplicateEntry(CapabilityId),

    #[error("Tag not found: {0}")]
    UnknownTag(TagKey),

    #[error("Item group not found: {0}")]
    UnknownItemGroup(String),

    /// The host refused the operation for its own reasons.
    #[error("Host rejected {operation}: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },
}

impl HostRegistryError {
    pub fn rejected(operation: &'static str, message: impl ToString) -> Self {
        Self::Rejected {
            operation,
            message: message.to_string(),
        }
    }
}

/// Scheduling errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("Dispatcher is shut down")]
    ShutDown,
    #[error("Dispatcher rejected job: {0}")]
    Rejected(String),
}

/// Per-item durable storage errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The item no longer exists (destroyed, despawned).
    #[error("Item not found: {0}")]
    ItemGone(ItemId),
    #[error("Storage error in {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn backend(operation: &'static str, message: impl ToString) -> Self {
        Self::Backend {
            operation,
            message: message.to_string(),
        }
    }
}

/// World enumeration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("Enumeration failed: {0}")]
    Enumeration(String),
}
