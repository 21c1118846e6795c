//! Persisted record of the database's applied migration version.

use super::types::MigrationError;
use crate::store::{filter, DocumentStore, StoreError};
use crate::upsert::{upsert, UpsertError};
use crate::utils::SYSTEM_TABLE;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminator field of system records.
const TYPE_FIELD: &str = "type";

/// Discriminator value of the version record.
const VERSION_RECORD_TYPE: &str = "version";

/// The version record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    /// Highest version fully applied. Empty before the first successful step.
    #[serde(default)]
    pub current_version: String,
    /// Version recorded by the first completed run. Set once.
    #[serde(default)]
    pub init_version: String,
    #[serde(default)]
    pub distro: String,
    #[serde(default)]
    pub distro_version: String,
}

/// Reads and writes the single version record.
#[derive(Debug, Clone)]
pub struct VersionStateStore {
    table: String,
}

impl VersionStateStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Load the record, or `None` if the database has never been migrated.
    pub async fn load(
        &self,
        db: &dyn DocumentStore,
    ) -> Result<Option<VersionRecord>, MigrationError> {
        let mut docs = db
            .find(
                &self.table,
                &filter([(TYPE_FIELD, Value::from(VERSION_RECORD_TYPE))]),
            )
            .await?;

        match docs.len() {
            0 => Ok(None),
            1 => {
                let record = serde_json::from_value(Value::Object(docs.remove(0)))
                    .map_err(StoreError::from)?;
                Ok(Some(record))
            }
            n => Err(MigrationError::Failed(format!(
                "{} version records found in {}",
                n, self.table
            ))),
        }
    }

    /// Write the whole record, creating it on first use.
    pub async fn save(
        &self,
        db: &dyn DocumentStore,
        record: &VersionRecord,
    ) -> Result<(), UpsertError> {
        let mut doc = match serde_json::to_value(record).map_err(StoreError::from)? {
            Value::Object(map) => map,
            _ => return Err(StoreError::Other("version record is not an object".into()).into()),
        };
        doc.insert(TYPE_FIELD.to_string(), Value::from(VERSION_RECORD_TYPE));

        upsert(db, &self.table, doc, None, &[TYPE_FIELD], &[]).await?;
        Ok(())
    }
}

impl Default for VersionStateStore {
    fn default() -> Self {
        Self::new(SYSTEM_TABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_load_absent_record() {
        let store = MemoryStore::new();
        let state = VersionStateStore::default();
        assert_eq!(state.load(&store).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemoryStore::new();
        let state = VersionStateStore::default();
        let mut record = VersionRecord {
            current_version: "y3.9.202001010000".to_string(),
            ..Default::default()
        };

        state.save(&store, &record).await.unwrap();
        record.current_version = "y3.9.202002010000".to_string();
        state.save(&store, &record).await.unwrap();

        assert_eq!(state.load(&store).await.unwrap(), Some(record));
        assert_eq!(
            store
                .count(SYSTEM_TABLE, &crate::store::Filter::new())
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_record_uses_camel_case_fields() {
        let store = MemoryStore::new();
        let state = VersionStateStore::default();
        let record = VersionRecord {
            current_version: "x19.05.16.01".to_string(),
            init_version: "v3.0.8".to_string(),
            distro: "community".to_string(),
            distro_version: "0.1.0".to_string(),
        };
        state.save(&store, &record).await.unwrap();

        let docs = store
            .find(SYSTEM_TABLE, &filter([("type", json!("version"))]))
            .await
            .unwrap();
        assert_eq!(docs[0]["currentVersion"], json!("x19.05.16.01"));
        assert_eq!(docs[0]["initVersion"], json!("v3.0.8"));
        assert_eq!(docs[0]["distroVersion"], json!("0.1.0"));
    }
}
