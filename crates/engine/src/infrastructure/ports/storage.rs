//! Per-item durable key/value storage port.

use enchantry_domain::ItemId;

use super::error::StoreError;

/// Durable string storage attached to a single item.
///
/// Values travel with the item across inventory moves and survive restarts.
#[cfg_attr(test, mockall::automock)]
pub trait ItemDurableStore: Send + Sync {
    fn get(&self, item: ItemId, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, item: ItemId, key: &str, value: String) -> Result<(), StoreError>;
}
