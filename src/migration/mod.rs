//! Versioned migration system for the CMDB database.
//!
//! # Overview
//!
//! - Modules register their steps in a `MigrationRegistry` at start-up
//! - Versions are validated and parsed once, at registration
//! - The `MigrationExecutor` applies every step newer than the recorded
//!   version, strictly in version order, recording progress after each step
//! - A failed or cancelled run stops immediately; running the upgrade again
//!   resumes right after the last recorded step
//! - There are no down-migrations
//!
//! # Usage
//!
//! ```ignore
//! let registry = create_registry(VersionRules::default())?;
//! let executor = MigrationExecutor::new(registry);
//! let result = executor.upgrade(&ctx, &db, None, None, &run).await?;
//! ```

mod executor;
mod handler;
pub mod migrations;
mod registry;
mod state;
mod types;

pub use executor::MigrationExecutor;
pub use handler::{db_only, with_cache, with_identity, StepFuture, StepHandler};
pub use registry::MigrationRegistry;
pub use state::{VersionRecord, VersionStateStore};
pub use types::{
    ExecutionContext, MigrationError, MigrationStep, UpgradeError, UpgradeResult, UpgradeStatus,
};

use crate::version::VersionRules;
use std::sync::Arc;

/// Create the default migration registry with all built-in migrations.
///
/// Registration order does not matter; steps are ordered by version when
/// an upgrade runs.
pub fn create_registry(rules: VersionRules) -> Result<Arc<MigrationRegistry>, MigrationError> {
    let registry = MigrationRegistry::with_rules(rules);

    migrations::y3_8_202009101702::register(&registry)?;
    migrations::y3_10_202104221702::register(&registry)?;
    migrations::y3_15_202411071530::register(&registry)?;

    Ok(Arc::new(registry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_registry() {
        let registry = create_registry(VersionRules::default()).unwrap();
        let versions = registry.versions();

        assert_eq!(
            versions,
            vec![
                migrations::y3_8_202009101702::VERSION,
                migrations::y3_10_202104221702::VERSION,
                migrations::y3_15_202411071530::VERSION,
            ]
        );
    }
}
