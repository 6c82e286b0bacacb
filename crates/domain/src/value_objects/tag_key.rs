//! Tag keys - names of host-visible membership groups.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::error::DomainError;
use crate::value_objects::CapabilityId;

/// Namespace owned by this crate for custom tags.
pub const CUSTOM_NAMESPACE: &str = "enchantry";

/// Namespace of tags that ship with the host.
pub const HOST_NAMESPACE: &str = "minecraft";

/// A namespaced tag key (`namespace:path`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagKey {
    namespace: Cow<'static, str>,
    path: Cow<'static, str>,
}

impl TagKey {
    /// A tag shipped with the host.
    pub const fn host(path: &'static str) -> Self {
        Self {
            namespace: Cow::Borrowed(HOST_NAMESPACE),
            path: Cow::Borrowed(path),
        }
    }

    /// A tag in the custom namespace.
    pub fn custom(path: impl Into<String>) -> Self {
        Self {
            namespace: Cow::Borrowed(CUSTOM_NAMESPACE),
            path: Cow::Owned(path.into()),
        }
    }

    /// The exclusive-set tag owned by a capability.
    ///
    /// Keyed on the full id so `minecraft:silk_touch` and a custom
    /// `silk_touch` own different tags. A bare id is in the custom namespace.
    pub fn exclusive_set(id: &CapabilityId) -> Self {
        let namespace = id.namespace().unwrap_or(CUSTOM_NAMESPACE);
        Self::custom(format!("exclusive_set/{}/{}", namespace, id.path()))
    }

    /// The item tag backing an item group.
    pub fn item_group(group_id: &str) -> Self {
        Self::custom(format!("items/{}", group_id))
    }

    /// Parse `namespace:path`; a bare path gets the host namespace.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let (namespace, path) = raw.split_once(':').unwrap_or((HOST_NAMESPACE, raw));
        if namespace.is_empty() || path.is_empty() {
            return Err(DomainError::parse(format!("Malformed tag key: '{}'", raw)));
        }
        Ok(Self {
            namespace: Cow::Owned(namespace.to_string()),
            path: Cow::Owned(path.to_string()),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_custom(&self) -> bool {
        self.namespace == CUSTOM_NAMESPACE
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl TryFrom<String> for TagKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TagKey> for String {
    fn from(key: TagKey) -> String {
        key.to_string()
    }
}

/// Capability tags the host ships with.
pub mod known {
    use super::TagKey;

    pub const TREASURE: TagKey = TagKey::host("treasure");
    pub const NON_TREASURE: TagKey = TagKey::host("non_treasure");
    pub const DOUBLE_TRADE_PRICE: TagKey = TagKey::host("double_trade_price");
    pub const ON_RANDOM_LOOT: TagKey = TagKey::host("on_random_loot");
    pub const ON_MOB_SPAWN_EQUIPMENT: TagKey = TagKey::host("on_mob_spawn_equipment");
    pub const ON_TRADED_EQUIPMENT: TagKey = TagKey::host("on_traded_equipment");
    pub const TRADEABLE: TagKey = TagKey::host("tradeable");
    pub const CURSE: TagKey = TagKey::host("curse");
    pub const IN_ENCHANTING_TABLE: TagKey = TagKey::host("in_enchanting_table");

    /// Every distribution tag above.
    pub fn distribution_tags() -> [TagKey; 9] {
        [
            TREASURE,
            NON_TREASURE,
            DOUBLE_TRADE_PRICE,
            ON_RANDOM_LOOT,
            ON_MOB_SPAWN_EQUIPMENT,
            ON_TRADED_EQUIPMENT,
            TRADEABLE,
            CURSE,
            IN_ENCHANTING_TABLE,
        ]
    }
}
