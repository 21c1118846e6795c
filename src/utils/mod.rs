/// Table holding the system records, including the migration version record.
pub const SYSTEM_TABLE: &str = "cc_System";

/// Default data directory of the file store
pub const DEFAULT_DATA_DIR: &str = ".cmdb";

/// Name of the optional configuration file inside the data directory
pub const CONFIG_FILE: &str = "migrator.json";

/// Current crate version, recorded as the installed distribution version
pub const MIGRATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get current timestamp in ISO 8601 format
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}
