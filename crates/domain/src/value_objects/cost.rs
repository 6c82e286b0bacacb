//! Linear enchanting-cost curves.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A linear cost: `base + per_level * (level - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearCost {
    pub base: i32,
    pub per_level: i32,
}

impl LinearCost {
    pub const fn new(base: i32, per_level: i32) -> Self {
        Self { base, per_level }
    }

    /// Cost at `level` (levels start at 1).
    pub fn at(&self, level: u32) -> i64 {
        i64::from(self.base) + i64::from(self.per_level) * (i64::from(level) - 1)
    }
}

/// Minimum and maximum cost curves of a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCurve {
    pub min: LinearCost,
    pub max: LinearCost,
}

impl CostCurve {
    pub const fn new(min: LinearCost, max: LinearCost) -> Self {
        Self { min, max }
    }

    /// Check `min <= max` at every level in `[1, max_level]`.
    pub fn validate(&self, max_level: u32) -> Result<(), DomainError> {
        if max_level == 0 {
            return Err(DomainError::validation("max level must be at least 1"));
        }
        for level in 1..=max_level {
            let (min, max) = (self.min.at(level), self.max.at(level));
            if min > max {
                return Err(DomainError::validation(format!(
                    "min cost {} exceeds max cost {} at level {}",
                    min, max, level
                )));
            }
            if min < 0 {
                return Err(DomainError::validation(format!(
                    "min cost {} is negative at level {}",
                    min, level
                )));
            }
        }
        Ok(())
    }
}

impl Default for CostCurve {
    fn default() -> Self {
        Self::new(LinearCost::new(1, 10), LinearCost::new(21, 10))
    }
}
