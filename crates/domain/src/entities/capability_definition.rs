//! Capability definition - the registrable description of a custom effect.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::DomainError;
use crate::value_objects::{CapabilityId, CostCurve, Distribution};

/// Upper bound of a capability's max level
pub const MAX_LEVEL_LIMIT: u32 = 255;

/// Upper bound of a capability's weight
pub const MAX_WEIGHT: u32 = 1024;

/// A capability as configured at boot, before the host knows about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDefinition {
    pub id: CapabilityId,
    pub display_name: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    #[serde(default)]
    pub cost: CostCurve,
    #[serde(default = "default_anvil_cost")]
    pub anvil_cost: u32,
    /// Item group the capability is offered on at the enchanting table.
    pub primary_items: String,
    /// Item group the capability can be applied to at all.
    pub supported_items: String,
    #[serde(default)]
    pub distribution: Distribution,
    /// Ids of capabilities that may not coexist with this one.
    #[serde(default)]
    pub exclusive_set: BTreeSet<CapabilityId>,
}

fn default_weight() -> u32 {
    5
}

fn default_max_level() -> u32 {
    1
}

fn default_anvil_cost() -> u32 {
    2
}

impl CapabilityDefinition {
    /// Create a definition whose primary and supported groups are the same.
    pub fn new(
        id: CapabilityId,
        display_name: impl Into<String>,
        items: impl Into<String>,
    ) -> Self {
        let items = items.into();
        Self {
            id,
            display_name: display_name.into(),
            weight: default_weight(),
            max_level: default_max_level(),
            cost: CostCurve::default(),
            anvil_cost: default_anvil_cost(),
            primary_items: items.clone(),
            supported_items: items,
            distribution: Distribution::default(),
            exclusive_set: BTreeSet::new(),
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_max_level(mut self, max_level: u32) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn with_cost(mut self, cost: CostCurve) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_anvil_cost(mut self, anvil_cost: u32) -> Self {
        self.anvil_cost = anvil_cost;
        self
    }

    pub fn with_primary_items(mut self, group: impl Into<String>) -> Self {
        self.primary_items = group.into();
        self
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn with_exclusive(mut self, other: CapabilityId) -> Self {
        self.exclusive_set.insert(other);
        self
    }

    pub fn is_curse(&self) -> bool {
        self.distribution.curse
    }

    pub fn is_treasure(&self) -> bool {
        self.distribution.treasure
    }

    /// Item groups this definition needs resolved, primary first.
    pub fn item_groups(&self) -> [&str; 2] {
        [self.primary_items.as_str(), self.supported_items.as_str()]
    }

    /// Check the definition's own invariants.
    ///
    /// Cross-definition rules (id uniqueness, group existence, partners)
    /// are checked by the registry, not here.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.display_name.trim().is_empty() {
            return Err(DomainError::validation("display name cannot be empty"));
        }
        if self.weight == 0 || self.weight > MAX_WEIGHT {
            return Err(DomainError::validation(format!(
                "weight {} outside [1, {}]",
                self.weight, MAX_WEIGHT
            )));
        }
        if self.max_level == 0 || self.max_level > MAX_LEVEL_LIMIT {
            return Err(DomainError::validation(format!(
                "max level {} outside [1, {}]",
                self.max_level, MAX_LEVEL_LIMIT
            )));
        }
        self.cost.validate(self.max_level)?;
        if self.primary_items.trim().is_empty() || self.supported_items.trim().is_empty() {
            return Err(DomainError::validation("item group references cannot be empty"));
        }
        if self.exclusive_set.contains(&self.id) {
            return Err(DomainError::validation(format!(
                "'{}' cannot be exclusive with itself",
                self.id
            )));
        }
        Ok(())
    }
}
