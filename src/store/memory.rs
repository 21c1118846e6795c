use super::types::{Database, Document, Filter, IndexSpec, StoreError};
use super::DocumentStore;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// In-process document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    db: Mutex<Database>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, table: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        Ok(self.db.lock().await.find(table, filter))
    }

    async fn insert(&self, table: &str, doc: Document) -> Result<(), StoreError> {
        self.db.lock().await.insert(table, doc)
    }

    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        set: &Document,
    ) -> Result<u64, StoreError> {
        self.db.lock().await.update(table, filter, set)
    }

    async fn has_table(&self, table: &str) -> Result<bool, StoreError> {
        Ok(self.db.lock().await.tables.contains_key(table))
    }

    async fn create_table(&self, table: &str) -> Result<(), StoreError> {
        self.db
            .lock()
            .await
            .tables
            .entry(table.to_string())
            .or_default();
        Ok(())
    }

    async fn create_index(&self, table: &str, index: &IndexSpec) -> Result<(), StoreError> {
        self.db.lock().await.create_index(table, index)
    }

    async fn drop_table(&self, table: &str) -> Result<(), StoreError> {
        self.db.lock().await.drop_table(table);
        Ok(())
    }

    async fn next_sequence(&self, table: &str) -> Result<u64, StoreError> {
        Ok(self.db.lock().await.next_sequence(table))
    }
}
