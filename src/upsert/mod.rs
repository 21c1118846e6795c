//! Insert-or-update by unique key.
//!
//! Migration steps write seed and reference data through [`upsert`] so that
//! re-running a partially applied step neither duplicates records nor loses
//! fields set by an earlier run.

use crate::store::{Document, DocumentStore, Filter, StoreError};
use crate::utils::now_iso;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Stamped on insert, never overwritten by later upserts.
pub const CREATE_TIME_FIELD: &str = "create_time";

/// Refreshed on every upsert.
pub const LAST_TIME_FIELD: &str = "last_time";

#[derive(Error, Debug)]
pub enum UpsertError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("{matched} records in {table} match unique fields {fields:?}")]
    Ambiguous {
        table: String,
        fields: Vec<String>,
        matched: usize,
    },

    #[error("Record in {table} has no numeric {field}")]
    InvalidId { table: String, field: String },
}

/// What [`upsert`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub inserted: bool,
    pub matched_existing: bool,
    /// The auto-increment value: freshly issued on insert, the stored one on update.
    pub id: Option<u64>,
    /// The document as it was before the update.
    pub previous: Option<Document>,
}

/// Insert `record` into `table` unless a document with the same values for
/// `unique_fields` exists, in which case update that document.
///
/// On insert, `id_field` (if any) receives the next sequence value of the
/// table. On update, `id_field`, the creation timestamp and every field in
/// `exclude_on_update` are left as stored. More than one matching document
/// is reported as [`UpsertError::Ambiguous`] and nothing is written.
pub async fn upsert(
    db: &dyn DocumentStore,
    table: &str,
    mut record: Document,
    id_field: Option<&str>,
    unique_fields: &[&str],
    exclude_on_update: &[&str],
) -> Result<UpsertOutcome, UpsertError> {
    let filter: Filter = unique_fields
        .iter()
        .map(|f| (f.to_string(), record.get(*f).cloned().unwrap_or(Value::Null)))
        .collect();

    let mut existing = db.find(table, &filter).await?;
    let now = now_iso();

    match existing.len() {
        0 => {
            let id = match id_field {
                Some(field) => {
                    let id = db.next_sequence(table).await?;
                    record.insert(field.to_string(), Value::from(id));
                    Some(id)
                }
                None => None,
            };
            record.insert(CREATE_TIME_FIELD.to_string(), Value::from(now.clone()));
            record.insert(LAST_TIME_FIELD.to_string(), Value::from(now));
            db.insert(table, record).await?;

            debug!(table, ?id, "Upsert inserted record");
            Ok(UpsertOutcome {
                inserted: true,
                matched_existing: false,
                id,
                previous: None,
            })
        }
        1 => {
            let previous = existing.remove(0);
            let id = match id_field {
                Some(field) => Some(previous.get(field).and_then(Value::as_u64).ok_or_else(
                    || UpsertError::InvalidId {
                        table: table.to_string(),
                        field: field.to_string(),
                    },
                )?),
                None => None,
            };

            for key in exclude_on_update
                .iter()
                .copied()
                .chain(id_field)
                .chain([CREATE_TIME_FIELD])
            {
                record.remove(key);
            }
            record.insert(LAST_TIME_FIELD.to_string(), Value::from(now));
            db.update(table, &filter, &record).await?;

            debug!(table, ?id, "Upsert updated record");
            Ok(UpsertOutcome {
                inserted: false,
                matched_existing: true,
                id,
                previous: Some(previous),
            })
        }
        matched => Err(UpsertError::Ambiguous {
            table: table.to_string(),
            fields: unique_fields.iter().map(|f| f.to_string()).collect(),
            matched,
        }),
    }
}
