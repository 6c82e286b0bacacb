//! In-memory per-item durable store.

use std::collections::{BTreeMap, HashMap};

use dashmap::{DashMap, DashSet};
use uuid::Uuid;

use enchantry_domain::ItemId;

use crate::infrastructure::ports::{ItemDurableStore, StoreError};

/// [`ItemDurableStore`] kept in memory, with JSON snapshots standing in for
/// persistence across restarts.
#[derive(Default)]
pub struct InMemoryItemStore {
    values: DashMap<ItemId, HashMap<String, String>>,
    /// Tombstones for destroyed items. Kept until [`InMemoryItemStore::purge`]
    /// so a job still holding the id sees `ItemGone`, not an empty item.
    destroyed: DashSet<ItemId>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget an item, as when the host destroys it. Later writes fail.
    pub fn destroy(&self, item: ItemId) {
        self.values.remove(&item);
        self.destroyed.insert(item);
    }

    /// Drop every tombstone. Returns how many were held.
    ///
    /// Call once no job can still reference a destroyed item, for example
    /// after the dispatcher has drained.
    pub fn purge(&self) -> usize {
        let purged = self.destroyed.len();
        self.destroyed.clear();
        purged
    }

    pub fn tombstone_count(&self) -> usize {
        self.destroyed.len()
    }

    pub fn item_count(&self) -> usize {
        self.values.len()
    }

    /// Serialize every stored value.
    pub fn snapshot(&self) -> Result<String, StoreError> {
        let data: BTreeMap<String, BTreeMap<String, String>> = self
            .values
            .iter()
            .map(|entry| {
                let values = entry
                    .value()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                (entry.key().to_string(), values)
            })
            .collect();
        serde_json::to_string(&data).map_err(|e| StoreError::backend("snapshot", e))
    }

    /// Rebuild a store from [`InMemoryItemStore::snapshot`] output.
    pub fn restore(snapshot: &str) -> Result<Self, StoreError> {
        let data: BTreeMap<String, HashMap<String, String>> =
            serde_json::from_str(snapshot).map_err(|e| StoreError::backend("restore", e))?;
        let store = Self::new();
        for (raw_id, values) in data {
            let uuid = Uuid::parse_str(&raw_id).map_err(|e| StoreError::backend("restore", e))?;
            store.values.insert(ItemId::from_uuid(uuid), values);
        }
        Ok(store)
    }
}

impl ItemDurableStore for InMemoryItemStore {
    fn get(&self, item: ItemId, key: &str) -> Result<Option<String>, StoreError> {
        if self.destroyed.contains(&item) {
            return Err(StoreError::ItemGone(item));
        }
        Ok(self
            .values
            .get(&item)
            .and_then(|values| values.get(key).cloned()))
    }

    fn set(&self, item: ItemId, key: &str, value: String) -> Result<(), StoreError> {
        if self.destroyed.contains(&item) {
            return Err(StoreError::ItemGone(item));
        }
        self.values
            .entry(item)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_scoped_per_item() {
        let store = InMemoryItemStore::new();
        let a = ItemId::new();
        let b = ItemId::new();

        store.set(a, "last_trigger/vein_miner", "100".into()).unwrap();

        assert_eq!(
            store.get(a, "last_trigger/vein_miner").unwrap(),
            Some("100".to_string())
        );
        assert_eq!(store.get(b, "last_trigger/vein_miner").unwrap(), None);
        assert_eq!(store.get(a, "other").unwrap(), None);
    }

    #[test]
    fn destroyed_items_reject_access() {
        let store = InMemoryItemStore::new();
        let item = ItemId::new();
        store.set(item, "k", "v".into()).unwrap();

        store.destroy(item);

        assert_eq!(store.get(item, "k"), Err(StoreError::ItemGone(item)));
        assert_eq!(
            store.set(item, "k", "w".into()),
            Err(StoreError::ItemGone(item))
        );
        assert_eq!(store.item_count(), 0);
    }

    #[test]
    fn purge_releases_tombstones() {
        let store = InMemoryItemStore::new();
        for _ in 0..3 {
            store.destroy(ItemId::new());
        }
        assert_eq!(store.tombstone_count(), 3);

        assert_eq!(store.purge(), 3);

        assert_eq!(store.tombstone_count(), 0);
        let item = ItemId::new();
        store.set(item, "k", "v".into()).unwrap();
        store.destroy(item);
        assert_eq!(store.get(item, "k"), Err(StoreError::ItemGone(item)));
        assert_eq!(store.tombstone_count(), 1);
    }

    #[test]
    fn snapshot_survives_a_restart() {
        let store = InMemoryItemStore::new();
        let item = ItemId::new();
        store.set(item, "last_trigger/telepathy", "1700000000000".into()).unwrap();

        let restored = InMemoryItemStore::restore(&store.snapshot().unwrap()).unwrap();

        assert_eq!(
            restored.get(item, "last_trigger/telepathy").unwrap(),
            Some("1700000000000".to_string())
        );
    }

    #[test]
    fn restore_rejects_bad_item_ids() {
        let err = InMemoryItemStore::restore(r#"{"not-a-uuid":{"k":"v"}}"#)
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::Backend { operation: "restore", .. }));
    }
}
