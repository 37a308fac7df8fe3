use async_trait::async_trait;
use orchard_types::{Item, ItemId, ItemPayload, SubjectId};
use parking_lot::RwLock;

use super::{ItemStore, ItemTable};
use crate::error::StoreResult;

/// Process-local item store.
///
/// Each operation holds the lock for its whole duration, which makes single
/// item operations atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: RwLock<ItemTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        Ok(self.table.read().list())
    }

    async fn create_item(&self, payload: ItemPayload, owner_id: SubjectId) -> StoreResult<Item> {
        self.table.write().create(payload, owner_id)
    }

    async fn get_owner(&self, id: ItemId) -> StoreResult<SubjectId> {
        self.table.read().owner(id)
    }

    async fn update_item(&self, id: ItemId, payload: ItemPayload) -> StoreResult<Item> {
        self.table.write().update(id, payload)
    }

    async fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        self.table.write().delete(id)
    }
}
