//! Step handlers and the adapters that lift simpler step shapes into them.
//!
//! The orchestrator only ever calls [`StepHandler::apply`]. Step authors who
//! do not need the cache or the identity service write a closure over the
//! handles they use and wrap it with [`db_only`], [`with_cache`] or
//! [`with_identity`] at registration time.

use super::types::{ExecutionContext, MigrationError};
use crate::config::RunConfiguration;
use crate::services::{CacheService, IdentityService};
use crate::store::DocumentStore;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by step closures.
pub type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<(), MigrationError>> + Send + 'a>>;

/// A migration step body.
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn apply(
        &self,
        ctx: &ExecutionContext,
        db: &dyn DocumentStore,
        cache: Option<&dyn CacheService>,
        identity: Option<&dyn IdentityService>,
        run: &RunConfiguration,
    ) -> Result<(), MigrationError>;
}

struct DbOnly<F>(F);

#[async_trait]
impl<F> StepHandler for DbOnly<F>
where
    F: for<'a> Fn(
            &'a ExecutionContext,
            &'a dyn DocumentStore,
            &'a RunConfiguration,
        ) -> StepFuture<'a>
        + Send
        + Sync,
{
    async fn apply(
        &self,
        ctx: &ExecutionContext,
        db: &dyn DocumentStore,
        _cache: Option<&dyn CacheService>,
        _identity: Option<&dyn IdentityService>,
        run: &RunConfiguration,
    ) -> Result<(), MigrationError> {
        (self.0)(ctx, db, run).await
    }
}

struct WithCache<F>(F);

#[async_trait]
impl<F> StepHandler for WithCache<F>
where
    F: for<'a> Fn(
            &'a ExecutionContext,
            &'a dyn DocumentStore,
            Option<&'a dyn CacheService>,
            &'a RunConfiguration,
        ) -> StepFuture<'a>
        + Send
        + Sync,
{
    async fn apply(
        &self,
        ctx: &ExecutionContext,
        db: &dyn DocumentStore,
        cache: Option<&dyn CacheService>,
        _identity: Option<&dyn IdentityService>,
        run: &RunConfiguration,
    ) -> Result<(), MigrationError> {
        (self.0)(ctx, db, cache, run).await
    }
}

struct WithIdentity<F>(F);

#[async_trait]
impl<F> StepHandler for WithIdentity<F>
where
    F: for<'a> Fn(
            &'a ExecutionContext,
            &'a dyn DocumentStore,
            Option<&'a dyn CacheService>,
            Option<&'a dyn IdentityService>,
            &'a RunConfiguration,
        ) -> StepFuture<'a>
        + Send
        + Sync,
{
    async fn apply(
        &self,
        ctx: &ExecutionContext,
        db: &dyn DocumentStore,
        cache: Option<&dyn CacheService>,
        identity: Option<&dyn IdentityService>,
        run: &RunConfiguration,
    ) -> Result<(), MigrationError> {
        (self.0)(ctx, db, cache, identity, run).await
    }
}

/// Wrap a step that only touches the database.
pub fn db_only<F>(f: F) -> Arc<dyn StepHandler>
where
    F: for<'a> Fn(
            &'a ExecutionContext,
            &'a dyn DocumentStore,
            &'a RunConfiguration,
        ) -> StepFuture<'a>
        + Send
        + Sync
        + 'static,
{
    Arc::new(DbOnly(f))
}

/// Wrap a step that touches the database and the cache.
pub fn with_cache<F>(f: F) -> Arc<dyn StepHandler>
where
    F: for<'a> Fn(
            &'a ExecutionContext,
            &'a dyn DocumentStore,
            Option<&'a dyn CacheService>,
            &'a RunConfiguration,
        ) -> StepFuture<'a>
        + Send
        + Sync
        + 'static,
{
    Arc::new(WithCache(f))
}

/// Wrap a step that needs every handle.
pub fn with_identity<F>(f: F) -> Arc<dyn StepHandler>
where
    F: for<'a> Fn(
            &'a ExecutionContext,
            &'a dyn DocumentStore,
            Option<&'a dyn CacheService>,
            Option<&'a dyn IdentityService>,
            &'a RunConfiguration,
        ) -> StepFuture<'a>
        + Send
        + Sync
        + 'static,
{
    Arc::new(WithIdentity(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;
    use crate::store::{filter, MemoryStore};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCache {
        invalidated: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CacheService for RecordingCache {
        async fn invalidate(&self, keys: &[String]) -> Result<(), ServiceError> {
            self.invalidated.lock().unwrap().extend_from_slice(keys);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingIdentity {
        registered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl IdentityService for RecordingIdentity {
        async fn register_resource_types(&self, types: &[String]) -> Result<(), ServiceError> {
            self.registered.lock().unwrap().extend_from_slice(types);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_db_only_adapter() {
        let handler = db_only(|_ctx, db, run| {
            Box::pin(async move {
                let doc = json!({"tenant_id": run.tenant_id}).as_object().cloned().unwrap();
                db.insert("t", doc).await?;
                Ok::<(), MigrationError>(())
            })
        });

        let store = MemoryStore::new();
        let run = RunConfiguration::new("tenant-a", "admin");
        handler
            .apply(&ExecutionContext::new(), &store, None, None, &run)
            .await
            .unwrap();

        let found = store
            .find("t", &filter([("tenant_id", json!("tenant-a"))]))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_with_cache_adapter_receives_cache() {
        let handler = with_cache(|_ctx, _db, cache, _run| {
            Box::pin(async move {
                if let Some(cache) = cache {
                    cache.invalidate(&["biz".to_string()]).await?;
                }
                Ok::<(), MigrationError>(())
            })
        });

        let cache = RecordingCache::default();
        handler
            .apply(
                &ExecutionContext::new(),
                &MemoryStore::new(),
                Some(&cache as &dyn CacheService),
                None,
                &RunConfiguration::new("0", "admin"),
            )
            .await
            .unwrap();

        assert_eq!(*cache.invalidated.lock().unwrap(), vec!["biz".to_string()]);
    }

    #[tokio::test]
    async fn test_with_identity_adapter_receives_identity() {
        let handler = with_identity(|_ctx, _db, _cache, identity, _run| {
            Box::pin(async move {
                let identity = identity
                    .ok_or_else(|| MigrationError::Failed("identity service required".into()))?;
                identity
                    .register_resource_types(&["biz_set".to_string()])
                    .await?;
                Ok::<(), MigrationError>(())
            })
        });

        let identity = RecordingIdentity::default();
        let store = MemoryStore::new();
        let run = RunConfiguration::new("0", "admin");
        let ctx = ExecutionContext::new();

        handler
            .apply(&ctx, &store, None, Some(&identity as &dyn IdentityService), &run)
            .await
            .unwrap();
        assert_eq!(identity.registered.lock().unwrap().len(), 1);

        let err = handler.apply(&ctx, &store, None, None, &run).await;
        assert!(err.is_err());
    }
}
