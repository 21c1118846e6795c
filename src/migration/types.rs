//! Types for the migration system.

use super::handler::StepHandler;
use crate::services::ServiceError;
use crate::store::StoreError;
use crate::upsert::UpsertError;
use crate::version::{VersionError, VersionIdentifier};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Error types for migration operations.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Version error: {0}")]
    VersionError(#[from] VersionError),

    #[error("Version {0} is already registered")]
    DuplicateVersion(String),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Upsert error: {0}")]
    UpsertError(#[from] UpsertError),

    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("{0}")]
    Failed(String),

    #[error("Migration {version} failed: {source}")]
    StepFailed {
        version: String,
        source: Box<MigrationError>,
    },

    #[error("Migration {version} applied but recording it failed: {source}")]
    StatePersistence {
        version: String,
        source: UpsertError,
    },

    #[error("Upgrade cancelled before {0}")]
    Cancelled(String),

    #[error("No migration registered for version {0}")]
    UnknownVersion(String),
}

/// Per-run execution context handed to every step.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    run_id: String,
    shutdown: Option<watch::Receiver<bool>>,
}

impl ExecutionContext {
    /// A context with a fresh run id that is never cancelled.
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            shutdown: None,
        }
    }

    /// A context cancelled once `true` is sent on the shutdown channel.
    pub fn with_shutdown(shutdown: watch::Receiver<bool>) -> Self {
        Self {
            shutdown: Some(shutdown),
            ..Self::new()
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered migration step.
#[derive(Clone)]
pub struct MigrationStep {
    /// The version as registered, after the correction table.
    pub name: String,
    pub version: VersionIdentifier,
    pub handler: Arc<dyn StepHandler>,
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Result of a completed upgrade run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeResult {
    /// The recorded current version after the run.
    pub current_version: String,
    /// Versions applied by this run, in order.
    pub finished_versions: Vec<String>,
}

/// An upgrade run that stopped early, with the progress it made.
#[derive(Error, Debug)]
#[error("Upgrade stopped at version {current_version:?}: {source}")]
pub struct UpgradeError {
    pub current_version: String,
    pub finished_versions: Vec<String>,
    pub source: MigrationError,
}

impl UpgradeError {
    pub fn new(
        current_version: impl Into<String>,
        finished_versions: Vec<String>,
        source: MigrationError,
    ) -> Self {
        Self {
            current_version: current_version.into(),
            finished_versions,
            source,
        }
    }

    /// Name of the step that failed, if the run stopped on a step.
    pub fn failed_version(&self) -> Option<&str> {
        match &self.source {
            MigrationError::StepFailed { version, .. }
            | MigrationError::StatePersistence { version, .. }
            | MigrationError::Cancelled(version) => Some(version),
            _ => None,
        }
    }
}

/// Recorded version versus what an upgrade would apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeStatus {
    pub current_version: Option<String>,
    pub init_version: Option<String>,
    pub pending_versions: Vec<String>,
}
