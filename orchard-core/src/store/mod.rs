//! Item storage backends
//!
//! This module defines the `ItemStore` trait for pluggable persistence and
//! provides two implementations:
//! - `MemoryStore`: process-local, lost on restart
//! - `JsonFileStore`: snapshot written to a JSON file after every mutation
//!
//! Stores carry no authorization policy; see [`crate::guard`].

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use orchard_types::{Item, ItemId, ItemPayload, SubjectId};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Trait for item storage backends
///
/// Every method is atomic with respect to concurrent calls on the same item.
/// Concurrent updates resolve last-write-wins.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// All items, ordered by id
    async fn list_items(&self) -> StoreResult<Vec<Item>>;

    /// Allocate a fresh id and persist a new item owned by `owner_id`
    async fn create_item(&self, payload: ItemPayload, owner_id: SubjectId) -> StoreResult<Item>;

    /// Owner of the item with this id
    async fn get_owner(&self, id: ItemId) -> StoreResult<SubjectId>;

    /// Replace the payload of an existing item
    async fn update_item(&self, id: ItemId, payload: ItemPayload) -> StoreResult<Item>;

    /// Remove an item permanently
    async fn delete_item(&self, id: ItemId) -> StoreResult<()>;
}

/// In-memory table shared by the store backends.
///
/// `next_id` only ever grows, so ids are not reused after deletion.
#[derive(Debug, Clone)]
pub(crate) struct ItemTable {
    next_id: u64,
    items: BTreeMap<ItemId, Item>,
}

impl Default for ItemTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            items: BTreeMap::new(),
        }
    }
}

impl ItemTable {
    pub(crate) fn list(&self) -> Vec<Item> {
        self.items.values().cloned().collect()
    }

    pub(crate) fn create(
        &mut self,
        payload: ItemPayload,
        owner_id: SubjectId,
    ) -> StoreResult<Item> {
        let id = ItemId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| StoreError::Storage("item id space exhausted".into()))?;
        let item = Item {
            id,
            owner_id,
            payload,
        };
        self.items.insert(id, item.clone());
        Ok(item)
    }

    pub(crate) fn owner(&self, id: ItemId) -> StoreResult<SubjectId> {
        self.items
            .get(&id)
            .map(|item| item.owner_id.clone())
            .ok_or(StoreError::NotFound(id))
    }

    pub(crate) fn update(&mut self, id: ItemId, payload: ItemPayload) -> StoreResult<Item> {
        let item = self.items.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        item.payload = payload;
        Ok(item.clone())
    }

    pub(crate) fn delete(&mut self, id: ItemId) -> StoreResult<()> {
        self.items
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

/// On-disk form of an [`ItemTable`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    next_id: u64,
    items: Vec<Item>,
}

impl From<&ItemTable> for Snapshot {
    fn from(table: &ItemTable) -> Self {
        Self {
            next_id: table.next_id,
            items: table.list(),
        }
    }
}

impl TryFrom<Snapshot> for ItemTable {
    type Error = StoreError;

    fn try_from(snapshot: Snapshot) -> Result<Self, Self::Error> {
        // Zero is never a valid id, so it cannot be the next one either.
        if snapshot.next_id == 0 {
            return Err(StoreError::Storage("next id in snapshot must be positive".into()));
        }
        let mut items = BTreeMap::new();
        for item in snapshot.items {
            if item.id.as_u64() == 0 || item.id.as_u64() >= snapshot.next_id {
                return Err(StoreError::Storage(format!(
                    "item {} is outside the allocated id range (next id {})",
                    item.id, snapshot.next_id
                )));
            }
            if items.insert(item.id, item).is_some() {
                return Err(StoreError::Storage("duplicate item id in snapshot".into()));
            }
        }
        Ok(Self {
            next_id: snapshot.next_id,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_not_reused_after_delete() {
        let mut table = ItemTable::default();
        let first = table.create(ItemPayload::new("apple"), SubjectId::new("u1")).unwrap();
        table.delete(first.id).unwrap();
        let second = table.create(ItemPayload::new("pear"), SubjectId::new("u1")).unwrap();

        assert_eq!(first.id, ItemId(1));
        assert_eq!(second.id, ItemId(2));
        assert!(table.owner(first.id).is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_missing_item_reports_not_found() {
        let mut table = ItemTable::default();
        assert!(matches!(table.owner(ItemId(4)), Err(StoreError::NotFound(ItemId(4)))));
        assert!(matches!(
            table.update(ItemId(4), ItemPayload::new("fig")),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(table.delete(ItemId(4)), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_snapshot_rejects_ids_beyond_counter() {
        let snapshot = Snapshot {
            next_id: 2,
            items: vec![Item {
                id: ItemId(5),
                owner_id: SubjectId::new("u1"),
                payload: ItemPayload::new("plum"),
            }],
        };
        assert!(ItemTable::try_from(snapshot).is_err());
    }

    #[test]
    fn test_snapshot_rejects_zero_counter() {
        let snapshot: Snapshot = serde_json::from_str(r#"{"nextId":0,"items":[]}"#).unwrap();
        assert!(matches!(
            ItemTable::try_from(snapshot),
            Err(StoreError::Storage(_))
        ));
    }

    #[test]
    fn test_exhausted_counter_refuses_to_allocate() {
        let mut table = ItemTable::try_from(Snapshot {
            next_id: u64::MAX,
            items: Vec::new(),
        })
        .unwrap();

        assert!(matches!(
            table.create(ItemPayload::new("fig"), SubjectId::new("u1")),
            Err(StoreError::Storage(_))
        ));
        assert_eq!(table.len(), 0);
        assert_eq!(table.next_id, u64::MAX);
    }
}
