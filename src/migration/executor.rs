//! Migration executor for running pending migrations in version order.

use super::registry::MigrationRegistry;
use super::state::{VersionRecord, VersionStateStore};
use super::types::{
    ExecutionContext, MigrationError, MigrationStep, UpgradeError, UpgradeResult, UpgradeStatus,
};
use crate::config::{MigratorConfig, RunConfiguration};
use crate::services::{CacheService, IdentityService};
use crate::store::DocumentStore;
use crate::version::VersionIdentifier;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Executor for running migrations.
///
/// One upgrade runs at a time per database; nothing here guards against two
/// processes upgrading the same database concurrently.
pub struct MigrationExecutor {
    registry: Arc<MigrationRegistry>,
    state: VersionStateStore,
    distro: String,
    distro_version: String,
}

impl MigrationExecutor {
    /// Create a new executor with the given registry.
    pub fn new(registry: Arc<MigrationRegistry>) -> Self {
        let defaults = MigratorConfig::default();
        Self {
            registry,
            state: VersionStateStore::default(),
            distro: defaults.distro,
            distro_version: defaults.distro_version,
        }
    }

    /// Installation metadata recorded with the initial version.
    pub fn with_installation(
        mut self,
        distro: impl Into<String>,
        distro_version: impl Into<String>,
    ) -> Self {
        self.distro = distro.into();
        self.distro_version = distro_version.into();
        self
    }

    pub fn with_state_store(mut self, state: VersionStateStore) -> Self {
        self.state = state;
        self
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Apply every registered migration newer than the recorded version.
    ///
    /// This method:
    /// 1. Reads the recorded version (none recorded means everything is pending)
    /// 2. Sorts the registry by version
    /// 3. Applies each pending step in order, recording the version after each success
    /// 4. Stops at the first failure, reporting the progress made so far
    /// 5. Records the initial version and installation metadata on the first complete run
    pub async fn upgrade(
        &self,
        ctx: &ExecutionContext,
        db: &dyn DocumentStore,
        cache: Option<&dyn CacheService>,
        identity: Option<&dyn IdentityService>,
        run: &RunConfiguration,
    ) -> Result<UpgradeResult, UpgradeError> {
        let (mut record, current) = self
            .resolve(db)
            .await
            .map_err(|e| UpgradeError::new(String::new(), Vec::new(), e))?;

        info!(
            run_id = ctx.run_id(),
            current_version = %record.current_version,
            registered = self.registry.len(),
            "Starting upgrade"
        );

        let mut finished = Vec::new();
        let mut last_examined: Option<String> = None;

        for step in self.registry.sorted_steps() {
            last_examined = Some(step.name.clone());

            if current.as_ref().is_some_and(|cur| step.version <= *cur) {
                debug!(run_id = ctx.run_id(), version = %step.name, "Already applied, skipping");
                continue;
            }

            if let Err(source) = self.apply_step(ctx, &step, db, cache, identity, run).await {
                return Err(UpgradeError::new(
                    record.current_version,
                    finished,
                    source,
                ));
            }

            let previous = std::mem::replace(&mut record.current_version, step.name.clone());
            if let Err(e) = self.state.save(db, &record).await {
                error!(
                    run_id = ctx.run_id(),
                    version = %step.name,
                    error = %e,
                    "Failed to record applied migration"
                );
                // The step's data changes are in place but the record still
                // shows the previous version, so a re-run repeats this step.
                return Err(UpgradeError::new(
                    previous,
                    finished,
                    MigrationError::StatePersistence {
                        version: step.name,
                        source: e,
                    },
                ));
            }
            finished.push(step.name);
        }

        if record.init_version.is_empty() {
            if let Some(init_version) = last_examined {
                record.init_version = init_version;
                record.distro = self.distro.clone();
                record.distro_version = self.distro_version.clone();
                self.state.save(db, &record).await.map_err(|e| {
                    UpgradeError::new(
                        record.current_version.clone(),
                        finished.clone(),
                        MigrationError::StatePersistence {
                            version: record.init_version.clone(),
                            source: e,
                        },
                    )
                })?;
                info!(
                    run_id = ctx.run_id(),
                    init_version = %record.init_version,
                    distro = %record.distro,
                    "Recorded initial version"
                );
            }
        }

        info!(
            run_id = ctx.run_id(),
            current_version = %record.current_version,
            count = finished.len(),
            "Upgrade completed successfully"
        );

        Ok(UpgradeResult {
            current_version: record.current_version,
            finished_versions: finished,
        })
    }

    /// Run exactly one registered step, regardless of the recorded version.
    ///
    /// The version record is left untouched; this is for re-applying a step
    /// whose effects were lost or need repairing.
    pub async fn upgrade_specific_version(
        &self,
        ctx: &ExecutionContext,
        db: &dyn DocumentStore,
        cache: Option<&dyn CacheService>,
        identity: Option<&dyn IdentityService>,
        run: &RunConfiguration,
        version: &str,
    ) -> Result<(), MigrationError> {
        let step = self
            .registry
            .find(version)?
            .ok_or_else(|| MigrationError::UnknownVersion(version.to_string()))?;

        info!(run_id = ctx.run_id(), version = %step.name, "Re-applying single migration");
        self.apply_step(ctx, &step, db, cache, identity, run).await
    }

    /// Recorded version and the versions an upgrade would apply.
    pub async fn status(&self, db: &dyn DocumentStore) -> Result<UpgradeStatus, MigrationError> {
        let (record, current) = self.resolve(db).await?;

        let pending_versions = self
            .registry
            .sorted_steps()
            .into_iter()
            .filter(|s| current.as_ref().map_or(true, |cur| s.version > *cur))
            .map(|s| s.name)
            .collect();

        Ok(UpgradeStatus {
            current_version: non_empty(record.current_version),
            init_version: non_empty(record.init_version),
            pending_versions,
        })
    }

    /// Load the version record and parse its current version.
    async fn resolve(
        &self,
        db: &dyn DocumentStore,
    ) -> Result<(VersionRecord, Option<VersionIdentifier>), MigrationError> {
        let record = self.state.load(db).await?.unwrap_or_default();
        let current = if record.current_version.is_empty() {
            None
        } else {
            Some(self.registry.rules().parse(&record.current_version)?)
        };
        Ok((record, current))
    }

    async fn apply_step(
        &self,
        ctx: &ExecutionContext,
        step: &MigrationStep,
        db: &dyn DocumentStore,
        cache: Option<&dyn CacheService>,
        identity: Option<&dyn IdentityService>,
        run: &RunConfiguration,
    ) -> Result<(), MigrationError> {
        if ctx.is_cancelled() {
            warn!(run_id = ctx.run_id(), version = %step.name, "Upgrade cancelled");
            return Err(MigrationError::Cancelled(step.name.clone()));
        }

        info!(run_id = ctx.run_id(), version = %step.name, "Applying migration");
        step.handler
            .apply(ctx, db, cache, identity, run)
            .await
            .map_err(|e| {
                error!(run_id = ctx.run_id(), version = %step.name, error = %e, "Migration failed");
                MigrationError::StepFailed {
                    version: step.name.clone(),
                    source: Box::new(e),
                }
            })?;

        info!(run_id = ctx.run_id(), version = %step.name, "Migration applied");
        Ok(())
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
