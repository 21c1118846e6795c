//! Document store abstraction used by the orchestrator and migration steps.
//!
//! Steps only see the [`DocumentStore`] trait. Two implementations ship with
//! the crate: [`MemoryStore`] for tests and embedding, and [`FileStore`],
//! which persists the whole database to a single JSON file.

mod file;
mod memory;
mod types;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use types::{Document, Filter, IndexSpec, StoreError};

use async_trait::async_trait;

/// Operations a migration step may perform against the database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents in `table` matching `filter`, in insertion order.
    async fn find(&self, table: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, table: &str, filter: &Filter) -> Result<u64, StoreError> {
        Ok(self.find(table, filter).await?.len() as u64)
    }

    async fn insert(&self, table: &str, doc: Document) -> Result<(), StoreError>;

    /// Set the fields of `set` on every matching document; returns the match count.
    async fn update(&self, table: &str, filter: &Filter, set: &Document)
        -> Result<u64, StoreError>;

    async fn has_table(&self, table: &str) -> Result<bool, StoreError>;

    async fn create_table(&self, table: &str) -> Result<(), StoreError>;

    /// Create `index` on `table`. Creating an index whose name already exists is a no-op.
    async fn create_index(&self, table: &str, index: &IndexSpec) -> Result<(), StoreError>;

    async fn drop_table(&self, table: &str) -> Result<(), StoreError>;

    /// Issue the next auto-increment value for `table`, starting at 1.
    async fn next_sequence(&self, table: &str) -> Result<u64, StoreError>;
}

/// Build a [`Filter`] from `(field, value)` pairs.
pub fn filter<I, K>(pairs: I) -> Filter
where
    I: IntoIterator<Item = (K, serde_json::Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
