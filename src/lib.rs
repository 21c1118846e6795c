pub mod config;
pub mod migration;
pub mod services;
pub mod store;
pub mod upsert;
pub mod utils;
pub mod version;

// Re-export commonly used types
pub use config::{read_config, write_config, ConfigError, MigratorConfig, RunConfiguration};
pub use migration::{
    create_registry, db_only, with_cache, with_identity, ExecutionContext, MigrationError,
    MigrationExecutor, MigrationRegistry, MigrationStep, StepHandler, UpgradeError,
    UpgradeResult, UpgradeStatus, VersionRecord, VersionStateStore,
};
pub use services::{CacheService, IdentityService, ServiceError};
pub use store::{Document, DocumentStore, FileStore, Filter, IndexSpec, MemoryStore, StoreError};
pub use upsert::{upsert, UpsertError, UpsertOutcome};
pub use version::{compare_versions, VersionError, VersionIdentifier, VersionRules};
