use super::types::{Database, Document, Filter, IndexSpec, StoreError};
use super::DocumentStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Name of the database file inside the data directory.
pub const DATABASE_FILE: &str = "cmdb.json";

/// Document store persisted to a single JSON file.
///
/// Every mutation writes and fsyncs a temp file, then renames it over the
/// database file, so a crash leaves either the previous or the new state.
/// The in-memory copy is only replaced once the write has succeeded.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    db: Mutex<Database>,
}

impl FileStore {
    /// Open (or create) the database in `data_dir`.
    pub async fn open(data_dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(data_dir).await?;
        let path = data_dir.join(DATABASE_FILE);

        let db = if path.exists() {
            let content = fs::read_to_string(&path).await?;
            serde_json::from_str(&content)?
        } else {
            Database::default()
        };

        debug!(path = %path.display(), tables = db.tables.len(), "Opened file store");
        Ok(Self {
            path,
            db: Mutex::new(db),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, db: &Database) -> Result<(), StoreError> {
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(db)?;
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(content.as_bytes()).await?;
        // Contents must reach the disk before the rename makes them visible.
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    /// Apply `op` to a copy of the database, persist it, then commit it in memory.
    async fn mutate<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Database) -> Result<T, StoreError> + Send,
        T: Send,
    {
        let mut guard = self.db.lock().await;
        let mut next = guard.clone();
        let out = op(&mut next)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(out)
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn find(&self, table: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        Ok(self.db.lock().await.find(table, filter))
    }

    async fn insert(&self, table: &str, doc: Document) -> Result<(), StoreError> {
        self.mutate(|db| db.insert(table, doc)).await
    }

    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        set: &Document,
    ) -> Result<u64, StoreError> {
        self.mutate(|db| db.update(table, filter, set)).await
    }

    async fn has_table(&self, table: &str) -> Result<bool, StoreError> {
        Ok(self.db.lock().await.tables.contains_key(table))
    }

    async fn create_table(&self, table: &str) -> Result<(), StoreError> {
        self.mutate(|db| {
            db.tables.entry(table.to_string()).or_default();
            Ok(())
        })
        .await
    }

    async fn create_index(&self, table: &str, index: &IndexSpec) -> Result<(), StoreError> {
        self.mutate(|db| db.create_index(table, index)).await
    }

    async fn drop_table(&self, table: &str) -> Result<(), StoreError> {
        self.mutate(|db| {
            db.drop_table(table);
            Ok(())
        })
        .await
    }

    async fn next_sequence(&self, table: &str) -> Result<u64, StoreError> {
        self.mutate(|db| Ok(db.next_sequence(table))).await
    }
}
