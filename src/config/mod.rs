use crate::utils::MIGRATOR_VERSION;
use crate::version::{default_corrections, VersionRules, DEFAULT_FUTURE_TOLERANCE_SECS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("futureToleranceSecs must be between 0 and {max}, got {value}")]
    InvalidFutureTolerance { value: i64, max: i64 },
}

/// Upper bound for `futureToleranceSecs` (about 100 years).
pub const MAX_FUTURE_TOLERANCE_SECS: i64 = 100 * 365 * 24 * 60 * 60;

fn default_distro() -> String {
    "community".to_string()
}

fn default_distro_version() -> String {
    MIGRATOR_VERSION.to_string()
}

fn default_future_tolerance_secs() -> i64 {
    DEFAULT_FUTURE_TOLERANCE_SECS
}

fn default_tenant_id() -> String {
    "0".to_string()
}

fn default_user() -> String {
    "migrate".to_string()
}

/// Migrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigratorConfig {
    /// Product distribution recorded alongside the initial version.
    #[serde(default = "default_distro")]
    pub distro: String,
    #[serde(default = "default_distro_version")]
    pub distro_version: String,
    /// How far (in seconds) a current-format version may be dated ahead of the
    /// local clock before registration rejects it.
    #[serde(default = "default_future_tolerance_secs")]
    pub future_tolerance_secs: i64,
    /// Raw version -> corrected version, applied before parsing.
    #[serde(default = "default_corrections")]
    pub version_corrections: BTreeMap<String, String>,
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,
    #[serde(default = "default_user")]
    pub user: String,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            distro: default_distro(),
            distro_version: default_distro_version(),
            future_tolerance_secs: default_future_tolerance_secs(),
            version_corrections: default_corrections(),
            tenant_id: default_tenant_id(),
            user: default_user(),
        }
    }
}

impl MigratorConfig {
    /// Build the version rules, rejecting a tolerance chrono cannot represent.
    pub fn version_rules(&self) -> Result<VersionRules, ConfigError> {
        let invalid = || ConfigError::InvalidFutureTolerance {
            value: self.future_tolerance_secs,
            max: MAX_FUTURE_TOLERANCE_SECS,
        };
        if !(0..=MAX_FUTURE_TOLERANCE_SECS).contains(&self.future_tolerance_secs) {
            return Err(invalid());
        }
        let tolerance =
            chrono::Duration::try_seconds(self.future_tolerance_secs).ok_or_else(invalid)?;
        Ok(VersionRules::new(self.version_corrections.clone(), tolerance))
    }

    pub fn run_configuration(&self) -> RunConfiguration {
        RunConfiguration {
            tenant_id: self.tenant_id.clone(),
            user: self.user.clone(),
        }
    }
}

/// Tenant and acting user handed unchanged to every migration step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfiguration {
    pub tenant_id: String,
    pub user: String,
}

impl RunConfiguration {
    pub fn new(tenant_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user: user.into(),
        }
    }
}

/// Read the configuration file
pub async fn read_config(config_path: &Path) -> Result<Option<MigratorConfig>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(config_path).await?;
    let config: MigratorConfig = serde_json::from_str(&content)?;
    Ok(Some(config))
}

/// Write the configuration file
pub async fn write_config(config_path: &Path, config: &MigratorConfig) -> Result<(), ConfigError> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(config_path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: MigratorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MigratorConfig::default());
        assert_eq!(config.future_tolerance_secs, 86400);
        assert_eq!(
            config.version_corrections.get("x18_10_10_01").map(String::as_str),
            Some("x18.10.10.01")
        );
    }

    #[test]
    fn test_camel_case_fields() {
        let config: MigratorConfig = serde_json::from_str(
            r#"{"distro": "enterprise", "futureToleranceSecs": 60, "tenantId": "t1"}"#,
        )
        .unwrap();
        assert_eq!(config.distro, "enterprise");
        assert_eq!(config.future_tolerance_secs, 60);
        assert_eq!(config.run_configuration(), RunConfiguration::new("t1", "migrate"));
        assert_eq!(
            config.version_rules().unwrap().future_tolerance().num_seconds(),
            60
        );
    }

    #[test]
    fn test_out_of_range_tolerance_is_rejected() {
        for value in ["9000000000000", "9223372036854775807", "-315360000", "-1"] {
            let config: MigratorConfig =
                serde_json::from_str(&format!(r#"{{"futureToleranceSecs": {value}}}"#)).unwrap();
            let err = config.version_rules().unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidFutureTolerance { .. }),
                "{value}: {err}"
            );
        }
    }

    #[test]
    fn test_zero_and_max_tolerance_are_accepted() {
        for value in [0, MAX_FUTURE_TOLERANCE_SECS] {
            let config = MigratorConfig {
                future_tolerance_secs: value,
                ..Default::default()
            };
            let rules = config.version_rules().unwrap();
            assert_eq!(rules.future_tolerance().num_seconds(), value);
            assert!(rules.validate("y3.8.202009101702").is_ok());
        }
    }

    #[tokio::test]
    async fn test_read_missing_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = read_config(&temp_dir.path().join("migrator.json")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("migrator.json");
        let config = MigratorConfig {
            user: "admin".to_string(),
            ..Default::default()
        };

        write_config(&path, &config).await.unwrap();
        assert_eq!(read_config(&path).await.unwrap(), Some(config));
    }
}
