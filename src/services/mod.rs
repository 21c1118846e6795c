//! External services a migration step may touch besides the database.
//!
//! Both are optional on every step invocation; deployments without a cache
//! or an identity service pass `None`.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Identity service error: {0}")]
    Identity(String),
}

/// Shared cache in front of the database.
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Drop cached entries so readers reload them from the database.
    async fn invalidate(&self, keys: &[String]) -> Result<(), ServiceError>;
}

/// External identity/permission service that tracks resource types.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Register resource types created by a migration.
    async fn register_resource_types(&self, types: &[String]) -> Result<(), ServiceError>;
}
