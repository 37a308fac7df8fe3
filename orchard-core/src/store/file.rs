use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use orchard_types::{Item, ItemId, ItemPayload, SubjectId};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{ItemStore, ItemTable, Snapshot};
use crate::error::{StoreError, StoreResult};

/// Durable item store backed by a single JSON file.
///
/// Mutations are applied to a copy of the table, written to disk, and only
/// then committed. A failed write leaves both the file and the in-memory
/// table untouched.
///
/// Once a mutation holds the table lock it runs to completion on its own
/// task, so dropping the caller's future cannot leave the file ahead of
/// memory.
#[derive(Debug)]
pub struct JsonFileStore {
    path: Arc<PathBuf>,
    table: Arc<Mutex<ItemTable>>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let table = match tokio::fs::read(&path).await {
            Ok(raw) => {
                let snapshot: Snapshot = serde_json::from_slice(&raw)?;
                ItemTable::try_from(snapshot)?
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => ItemTable::default(),
            Err(err) => return Err(err.into()),
        };

        info!(path = %path.display(), items = table.len(), "opened item store");
        Ok(Self {
            path: Arc::new(path),
            table: Arc::new(Mutex::new(table)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `mutate` against a copy of the table and commit it once persisted.
    async fn commit<T, F>(&self, mutate: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ItemTable) -> StoreResult<T> + Send + 'static,
    {
        let mut table = self.table.clone().lock_owned().await;
        let path = self.path.clone();

        let task = tokio::spawn(async move {
            let mut next = table.clone();
            let out = mutate(&mut next)?;
            persist(&path, &next).await?;
            *table = next;
            Ok::<T, StoreError>(out)
        });

        task.await
            .map_err(|err| StoreError::Storage(format!("store write task failed: {err}")))?
    }
}

/// Write `table` to a temp file, flush it to the device, then rename it over
/// `path`.
async fn persist(path: &Path, table: &ItemTable) -> StoreResult<()> {
    let raw = serde_json::to_vec_pretty(&Snapshot::from(table))?;
    let tmp = path.with_extension("json.tmp");

    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(&raw).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), "item store flushed");
    Ok(())
}

#[async_trait]
impl ItemStore for JsonFileStore {
    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        Ok(self.table.lock().await.list())
    }

    async fn create_item(&self, payload: ItemPayload, owner_id: SubjectId) -> StoreResult<Item> {
        self.commit(move |table| table.create(payload, owner_id)).await
    }

    async fn get_owner(&self, id: ItemId) -> StoreResult<SubjectId> {
        self.table.lock().await.owner(id)
    }

    async fn update_item(&self, id: ItemId, payload: ItemPayload) -> StoreResult<Item> {
        self.commit(move |table| table.update(id, payload)).await
    }

    async fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        self.commit(move |table| table.delete(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("items.json")).await.unwrap();
        assert!(store.list_items().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_items_and_counter_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("items.json");

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            let apple = store
                .create_item(ItemPayload::new("apple"), SubjectId::new("u1"))
                .await
                .unwrap();
            store
                .create_item(ItemPayload::new("kiwi"), SubjectId::new("u2"))
                .await
                .unwrap();
            store.delete_item(apple.id).await.unwrap();
        }

        let store = JsonFileStore::open(&path).await.unwrap();
        let items = store.list_items().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].payload.name, "kiwi");
        assert_eq!(items[0].owner_id, SubjectId::new("u2"));

        // id 1 was deleted and id 2 is live, so the next id is 3
        let fig = store
            .create_item(ItemPayload::new("fig"), SubjectId::new("u1"))
            .await
            .unwrap();
        assert_eq!(fig.id, ItemId(3));
    }

    #[tokio::test]
    async fn test_failed_mutation_does_not_touch_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .create_item(ItemPayload::new("apple"), SubjectId::new("u1"))
            .await
            .unwrap();
        let before = std::fs::read(&path).unwrap();

        let err = store
            .update_item(ItemId(9), ItemPayload::new("pear"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ItemId(9))));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(StoreError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_store_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        let apple = store
            .create_item(ItemPayload::new("apple"), SubjectId::new("u1"))
            .await
            .unwrap();
        let before = store.list_items().await.unwrap();
        let on_disk = std::fs::read(&path).unwrap();

        // A directory sitting on the temp path makes every flush fail.
        let blocker = path.with_extension("json.tmp");
        std::fs::create_dir(&blocker).unwrap();

        assert!(matches!(
            store
                .create_item(ItemPayload::new("pear"), SubjectId::new("u1"))
                .await,
            Err(StoreError::Storage(_))
        ));
        assert!(matches!(
            store.update_item(apple.id, ItemPayload::new("banana")).await,
            Err(StoreError::Storage(_))
        ));
        assert!(matches!(
            store.delete_item(apple.id).await,
            Err(StoreError::Storage(_))
        ));
        assert_eq!(store.list_items().await.unwrap(), before);
        assert_eq!(std::fs::read(&path).unwrap(), on_disk);

        std::fs::remove_dir(&blocker).unwrap();
        let kiwi = store
            .create_item(ItemPayload::new("kiwi"), SubjectId::new("u2"))
            .await
            .unwrap();
        assert_eq!(kiwi.id, ItemId(2));

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.list_items().await.unwrap(),
            store.list_items().await.unwrap()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancelled_mutations_keep_memory_and_disk_in_step() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        let apple = store
            .create_item(ItemPayload::new("apple"), SubjectId::new("u1"))
            .await
            .unwrap();

        for n in 0..300u64 {
            let budget = Duration::from_micros(20 + (n * 37) % 400);
            let _ = timeout(
                budget,
                store.update_item(apple.id, ItemPayload::new(format!("banana-{n}"))),
            )
            .await;
            let _ = timeout(
                budget,
                store.create_item(ItemPayload::new(format!("fig-{n}")), SubjectId::new("u1")),
            )
            .await;
        }

        // Waits for any write still running after its caller went away.
        let in_memory = store.list_items().await.unwrap();
        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.list_items().await.unwrap(), in_memory);

        // The id counters agree as well.
        let from_disk = reopened
            .create_item(ItemPayload::new("plum"), SubjectId::new("u1"))
            .await
            .unwrap();
        let from_memory = store
            .create_item(ItemPayload::new("plum"), SubjectId::new("u1"))
            .await
            .unwrap();
        assert_eq!(from_disk.id, from_memory.id);
    }
}
