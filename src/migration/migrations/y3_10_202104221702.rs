//! Unique indexes over the seeded model tables.

use super::{CLASSIFICATION_TABLE, OBJECT_TABLE, TENANT_FIELD};
use crate::config::RunConfiguration;
use crate::migration::{db_only, ExecutionContext, MigrationError, MigrationRegistry};
use crate::store::{DocumentStore, IndexSpec};
use tracing::info;

pub const VERSION: &str = "y3.10.202104221702";

pub fn register(registry: &MigrationRegistry) -> Result<(), MigrationError> {
    registry.register(
        VERSION,
        db_only(|ctx, db, run| Box::pin(add_model_indexes(ctx, db, run))),
    )
}

async fn add_model_indexes(
    ctx: &ExecutionContext,
    db: &dyn DocumentStore,
    _run: &RunConfiguration,
) -> Result<(), MigrationError> {
    let indexes = [
        (
            CLASSIFICATION_TABLE,
            IndexSpec::new("bkcc_unique_classificationID", &["bk_classification_id", TENANT_FIELD])
                .unique(),
        ),
        (
            CLASSIFICATION_TABLE,
            IndexSpec::new("bkcc_unique_id", &["id"]).unique(),
        ),
        (
            OBJECT_TABLE,
            IndexSpec::new("bkcc_unique_objID", &["bk_obj_id", TENANT_FIELD]).unique(),
        ),
        (
            OBJECT_TABLE,
            IndexSpec::new("bkcc_idx_classificationID", &["bk_classification_id"]),
        ),
    ];

    for (table, index) in &indexes {
        if !db.has_table(table).await? {
            db.create_table(table).await?;
        }
        db.create_index(table, index).await?;
    }

    info!(run_id = ctx.run_id(), count = indexes.len(), "Created model indexes");
    Ok(())
}
