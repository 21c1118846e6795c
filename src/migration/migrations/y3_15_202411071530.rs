//! Seed the built-in object models and announce them to the identity service.

use super::{OBJECT_TABLE, TENANT_FIELD};
use crate::config::RunConfiguration;
use crate::migration::{with_identity, ExecutionContext, MigrationError, MigrationRegistry};
use crate::services::{CacheService, IdentityService};
use crate::store::DocumentStore;
use crate::upsert::upsert;
use serde_json::{json, Value};
use tracing::{info, warn};

pub const VERSION: &str = "y3.15.202411071530";

/// (object id, display name, classification id)
const OBJECTS: &[(&str, &str, &str)] = &[
    ("host", "Host", "bk_host_manage"),
    ("biz", "Business", "bk_organization"),
    ("set", "Set", "bk_biz_topo"),
    ("module", "Module", "bk_biz_topo"),
    ("process", "Process", "bk_biz_topo"),
    ("plat", "Cloud Area", "bk_host_manage"),
];

pub fn register(registry: &MigrationRegistry) -> Result<(), MigrationError> {
    registry.register(
        VERSION,
        with_identity(|ctx, db, cache, identity, run| {
            Box::pin(seed_objects(ctx, db, cache, identity, run))
        }),
    )
}

async fn seed_objects(
    ctx: &ExecutionContext,
    db: &dyn DocumentStore,
    _cache: Option<&dyn CacheService>,
    identity: Option<&dyn IdentityService>,
    run: &RunConfiguration,
) -> Result<(), MigrationError> {
    for (obj_id, name, classification) in OBJECTS {
        let Value::Object(row) = json!({
            "bk_obj_id": obj_id,
            "bk_obj_name": name,
            "bk_classification_id": classification,
            "ispre": true,
            "creator": run.user,
            TENANT_FIELD: run.tenant_id,
        }) else {
            continue;
        };

        upsert(
            db,
            OBJECT_TABLE,
            row,
            Some("id"),
            &["bk_obj_id", TENANT_FIELD],
            &["creator"],
        )
        .await?;
    }

    match identity {
        Some(identity) => {
            let types: Vec<String> = OBJECTS.iter().map(|(id, _, _)| id.to_string()).collect();
            identity.register_resource_types(&types).await?;
        }
        None => warn!(
            run_id = ctx.run_id(),
            "No identity service, skipping resource type registration"
        ),
    }

    info!(run_id = ctx.run_id(), count = OBJECTS.len(), "Seeded object models");
    Ok(())
}
