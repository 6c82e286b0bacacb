//! Capability identifier newtype.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Maximum length of a capability id
const MAX_ID_LENGTH: usize = 128;

/// A validated capability id.
///
/// Custom capabilities use a bare path (`vein_miner`); host-provided ones may
/// carry a namespace (`minecraft:silk_touch`). Allowed characters are
/// lowercase ASCII letters, digits, `_`, `-`, `.`, `/` and at most one `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CapabilityId(String);

impl CapabilityId {
    /// Create a new validated capability id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidId` if the id is empty, too long, has
    /// more than one namespace separator or contains other characters.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("Capability id cannot be empty"));
        }
        if trimmed.len() > MAX_ID_LENGTH {
            return Err(DomainError::invalid_id(format!(
                "Capability id cannot exceed {} characters",
                MAX_ID_LENGTH
            )));
        }
        if trimmed.matches(':').count() > 1 {
            return Err(DomainError::invalid_id(format!(
                "Capability id '{}' has more than one namespace separator",
                trimmed
            )));
        }
        if let Some(bad) = trimmed.chars().find(|c| !is_allowed(*c)) {
            return Err(DomainError::invalid_id(format!(
                "Capability id '{}' contains invalid character '{}'",
                trimmed, bad
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespace part, if the id is namespaced.
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once(':').map(|(ns, _)| ns)
    }

    /// Path part (the whole id when not namespaced).
    pub fn path(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(_, path)| path)
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.' | '/' | ':')
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CapabilityId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for CapabilityId {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CapabilityId> for String {
    fn from(id: CapabilityId) -> String {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_namespaced_ids() {
        let plain = CapabilityId::new("vein_miner").unwrap();
        assert_eq!(plain.namespace(), None);
        assert_eq!(plain.path(), "vein_miner");

        let namespaced = CapabilityId::new("minecraft:silk_touch").unwrap();
        assert_eq!(namespaced.namespace(), Some("minecraft"));
        assert_eq!(namespaced.path(), "silk_touch");
    }

    #[test]
    fn trims_whitespace() {
        let id = CapabilityId::new("  repairing ").unwrap();
        assert_eq!(id.as_str(), "repairing");
    }

    #[test]
    fn rejects_empty_and_malformed_ids() {
        assert!(CapabilityId::new("   ").is_err());
        assert!(CapabilityId::new("Vein Miner").is_err());
        assert!(CapabilityId::new("a:b:c").is_err());
        assert!(CapabilityId::new("x".repeat(MAX_ID_LENGTH + 1)).is_err());
    }

    #[test]
    fn deserializes_through_validation() {
        let ok: CapabilityId = serde_json::from_str("\"ice_aspect\"").unwrap();
        assert_eq!(ok.as_str(), "ice_aspect");

        let bad: Result<CapabilityId, _> = serde_json::from_str("\"ICE\"");
        assert!(bad.is_err());
    }
}
