#![allow(dead_code)]

use async_trait::async_trait;
use cmdb_migrator::{
    db_only, Document, DocumentStore, ExecutionContext, Filter, IndexSpec, MemoryStore,
    MigrationError, RunConfiguration, StepHandler, StoreError,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Order in which steps ran.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn run_config() -> RunConfiguration {
    RunConfiguration::new("0", "admin")
}

pub fn context() -> ExecutionContext {
    ExecutionContext::new()
}

/// Create a temporary directory for a file-backed store
pub fn create_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

pub fn doc(value: Value) -> Document {
    value.as_object().cloned().expect("object literal")
}

/// A step that appends `name` to `log`.
pub fn recording_step(log: &CallLog, name: &str) -> Arc<dyn StepHandler> {
    let log = Arc::clone(log);
    let name = name.to_string();
    db_only(move |_ctx, _db, _run| {
        let log = Arc::clone(&log);
        let name = name.clone();
        Box::pin(async move {
            log.lock().unwrap().push(name);
            Ok::<(), MigrationError>(())
        })
    })
}

/// A step that fails while `fail` is set and records itself otherwise.
pub fn flaky_step(log: &CallLog, name: &str, fail: &Arc<AtomicBool>) -> Arc<dyn StepHandler> {
    let log = Arc::clone(log);
    let fail = Arc::clone(fail);
    let name = name.to_string();
    db_only(move |_ctx, _db, _run| {
        let log = Arc::clone(&log);
        let fail = Arc::clone(&fail);
        let name = name.clone();
        Box::pin(async move {
            if fail.load(Ordering::SeqCst) {
                return Err(MigrationError::Failed(format!("{} is broken", name)));
            }
            log.lock().unwrap().push(name);
            Ok(())
        })
    })
}

/// Store that refuses writes to one table.
pub struct ReadOnlyTableStore {
    pub inner: MemoryStore,
    pub table: String,
}

impl ReadOnlyTableStore {
    pub fn new(table: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            table: table.to_string(),
        }
    }

    fn check(&self, table: &str) -> Result<(), StoreError> {
        if table == self.table {
            Err(StoreError::Other(format!("{} is read-only", table)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for ReadOnlyTableStore {
    async fn find(&self, table: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.inner.find(table, filter).await
    }

    async fn insert(&self, table: &str, doc: Document) -> Result<(), StoreError> {
        self.check(table)?;
        self.inner.insert(table, doc).await
    }

    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        set: &Document,
    ) -> Result<u64, StoreError> {
        self.check(table)?;
        self.inner.update(table, filter, set).await
    }

    async fn has_table(&self, table: &str) -> Result<bool, StoreError> {
        self.inner.has_table(table).await
    }

    async fn create_table(&self, table: &str) -> Result<(), StoreError> {
        self.check(table)?;
        self.inner.create_table(table).await
    }

    async fn create_index(&self, table: &str, index: &IndexSpec) -> Result<(), StoreError> {
        self.check(table)?;
        self.inner.create_index(table, index).await
    }

    async fn drop_table(&self, table: &str) -> Result<(), StoreError> {
        self.check(table)?;
        self.inner.drop_table(table).await
    }

    async fn next_sequence(&self, table: &str) -> Result<u64, StoreError> {
        self.inner.next_sequence(table).await
    }
}
