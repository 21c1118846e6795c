use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// A stored record.
pub type Document = Map<String, Value>;

/// Top-level field equality filter. A field absent from a document matches `null`.
pub type Filter = Map<String, Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Duplicate key in {table} for index {index}")]
    DuplicateKey { table: String, index: String },

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Store error: {0}")]
    Other(String),
}

/// Secondary index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSpec {
    pub name: String,
    pub keys: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, keys: &[&str]) -> Self {
        Self {
            name: name.into(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Table {
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

/// Whole-database state shared by the in-memory and file-backed stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Database {
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
    #[serde(default)]
    pub sequences: BTreeMap<String, u64>,
}

pub(crate) fn matches(doc: &Document, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(key, expected)| doc.get(key).unwrap_or(&Value::Null) == expected)
}

fn index_key(doc: &Document, keys: &[String]) -> Vec<Value> {
    keys.iter()
        .map(|k| doc.get(k).cloned().unwrap_or(Value::Null))
        .collect()
}

impl Table {
    /// Check `candidate` against unique indexes, ignoring the document at `skip`.
    fn check_unique(
        &self,
        table: &str,
        candidate: &Document,
        skip: Option<usize>,
    ) -> Result<(), StoreError> {
        for index in self.indexes.iter().filter(|i| i.unique) {
            let key = index_key(candidate, &index.keys);
            let clash = self
                .documents
                .iter()
                .enumerate()
                .any(|(pos, doc)| Some(pos) != skip && index_key(doc, &index.keys) == key);
            if clash {
                return Err(StoreError::DuplicateKey {
                    table: table.to_string(),
                    index: index.name.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Database {
    pub fn find(&self, table: &str, filter: &Filter) -> Vec<Document> {
        self.tables
            .get(table)
            .map(|t| {
                t.documents
                    .iter()
                    .filter(|d| matches(d, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn insert(&mut self, table: &str, doc: Document) -> Result<(), StoreError> {
        let entry = self.tables.entry(table.to_string()).or_default();
        entry.check_unique(table, &doc, None)?;
        entry.documents.push(doc);
        Ok(())
    }

    /// Merge `set` into every matching document. All-or-nothing on index violations.
    pub fn update(
        &mut self,
        table: &str,
        filter: &Filter,
        set: &Document,
    ) -> Result<u64, StoreError> {
        let Some(entry) = self.tables.get_mut(table) else {
            return Ok(0);
        };

        let mut staged = Table {
            indexes: entry.indexes.clone(),
            documents: entry.documents.clone(),
        };
        let mut touched = Vec::new();
        for (pos, doc) in staged.documents.iter_mut().enumerate() {
            if !matches(doc, filter) {
                continue;
            }
            for (key, value) in set {
                doc.insert(key.clone(), value.clone());
            }
            touched.push(pos);
        }

        for pos in &touched {
            staged.check_unique(table, &staged.documents[*pos], Some(*pos))?;
        }

        entry.documents = staged.documents;
        Ok(touched.len() as u64)
    }

    pub fn create_index(&mut self, table: &str, index: &IndexSpec) -> Result<(), StoreError> {
        let entry = self.tables.entry(table.to_string()).or_default();
        if entry.indexes.iter().any(|i| i.name == index.name) {
            return Ok(());
        }
        if index.unique {
            let mut seen = Vec::new();
            for doc in &entry.documents {
                let key = index_key(doc, &index.keys);
                if seen.contains(&key) {
                    return Err(StoreError::DuplicateKey {
                        table: table.to_string(),
                        index: index.name.clone(),
                    });
                }
                seen.push(key);
            }
        }
        entry.indexes.push(index.clone());
        Ok(())
    }

    pub fn drop_table(&mut self, table: &str) {
        self.tables.remove(table);
    }

    pub fn next_sequence(&mut self, table: &str) -> u64 {
        let seq = self.sequences.entry(table.to_string()).or_insert(0);
        *seq += 1;
        *seq
    }
}
