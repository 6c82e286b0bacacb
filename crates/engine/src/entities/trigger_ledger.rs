//! Persistent trigger ledger.
//!
//! Last successful trigger time per (item, capability), stored on the item
//! itself so it follows the item between inventories and across restarts.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use enchantry_domain::{CapabilityId, ItemId};

use crate::infrastructure::ports::{ItemDurableStore, StoreError};

const KEY_PREFIX: &str = "last_trigger/";

pub struct TriggerLedger {
    store: Arc<dyn ItemDurableStore>,
}

impl TriggerLedger {
    pub fn new(store: Arc<dyn ItemDurableStore>) -> Self {
        Self { store }
    }

    pub fn key(capability: &CapabilityId) -> String {
        format!("{}{}", KEY_PREFIX, capability)
    }

    /// Last trigger time, or `None` if there is none or it cannot be read.
    ///
    /// Malformed values and storage failures both read as "never triggered".
    pub fn get(&self, item: ItemId, capability: &CapabilityId) -> Option<DateTime<Utc>> {
        let raw = match self.store.get(item, &Self::key(capability)) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(
                    item = %item,
                    capability = %capability,
                    error = %e,
                    "Failed to read trigger ledger"
                );
                return None;
            }
        };
        let parsed = raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis);
        if parsed.is_none() {
            tracing::debug!(
                item = %item,
                capability = %capability,
                value = %raw,
                "Ignoring malformed trigger ledger value"
            );
        }
        parsed
    }

    /// Record a trigger at `at`. A stored timestamp never moves backwards;
    /// an older `at` leaves it as is.
    pub fn set(
        &self,
        item: ItemId,
        capability: &CapabilityId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(previous) = self.get(item, capability) {
            if previous > at {
                return Ok(());
            }
        }
        self.store
            .set(item, &Self::key(capability), at.timestamp_millis().to_string())
    }
}
