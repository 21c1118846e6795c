//! Built-in migration steps.
//!
//! Each module contributes its steps through a `register` function called
//! from [`crate::migration::create_registry`]. Add new modules here as they
//! are created.

pub mod y3_8_202009101702;
pub mod y3_10_202104221702;
pub mod y3_15_202411071530;

/// Classification records seeded by the built-in steps.
pub const CLASSIFICATION_TABLE: &str = "cc_ObjClassification";

/// Object model records seeded by the built-in steps.
pub const OBJECT_TABLE: &str = "cc_ObjDes";

/// Tenant column carried by every seeded record.
pub const TENANT_FIELD: &str = "tenant_id";
