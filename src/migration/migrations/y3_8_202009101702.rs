//! Seed the built-in model classifications.

use super::{CLASSIFICATION_TABLE, TENANT_FIELD};
use crate::config::RunConfiguration;
use crate::migration::{with_cache, ExecutionContext, MigrationError, MigrationRegistry};
use crate::services::CacheService;
use crate::store::DocumentStore;
use crate::upsert::upsert;
use serde_json::{json, Value};
use tracing::info;

pub const VERSION: &str = "y3.8.202009101702";

/// Cache key holding the classification list.
pub const CLASSIFICATION_CACHE_KEY: &str = "cc:v3:classification";

/// (classification id, display name, icon)
const CLASSIFICATIONS: &[(&str, &str, &str)] = &[
    ("bk_host_manage", "Host", "icon-cc-host"),
    ("bk_biz_topo", "Business Topology", "icon-cc-business"),
    ("bk_organization", "Organization", "icon-cc-organization"),
    ("bk_network", "Network", "icon-cc-network-equipment"),
];

pub fn register(registry: &MigrationRegistry) -> Result<(), MigrationError> {
    registry.register(
        VERSION,
        with_cache(|ctx, db, cache, run| Box::pin(seed_classifications(ctx, db, cache, run))),
    )
}

async fn seed_classifications(
    ctx: &ExecutionContext,
    db: &dyn DocumentStore,
    cache: Option<&dyn CacheService>,
    run: &RunConfiguration,
) -> Result<(), MigrationError> {
    let mut inserted = 0;
    for (id, name, icon) in CLASSIFICATIONS {
        let Value::Object(row) = json!({
            "bk_classification_id": id,
            "bk_classification_name": name,
            "bk_classification_icon": icon,
            "bk_classification_type": "inner",
            "creator": run.user,
            TENANT_FIELD: run.tenant_id,
        }) else {
            continue;
        };

        let outcome = upsert(
            db,
            CLASSIFICATION_TABLE,
            row,
            Some("id"),
            &["bk_classification_id", TENANT_FIELD],
            &["creator"],
        )
        .await?;
        if outcome.inserted {
            inserted += 1;
        }
    }

    if let Some(cache) = cache {
        cache
            .invalidate(&[CLASSIFICATION_CACHE_KEY.to_string()])
            .await?;
    }

    info!(run_id = ctx.run_id(), inserted, "Seeded classifications");
    Ok(())
}
