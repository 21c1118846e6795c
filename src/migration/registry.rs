//! Migration registry for collecting steps contributed by independent modules.

use super::handler::StepHandler;
use super::types::{MigrationError, MigrationStep};
use crate::version::{VersionIdentifier, VersionRules};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error};

/// Registry of all available migration steps.
///
/// Built once at start-up and passed by reference to every module that
/// contributes steps, then to the executor. Registration validates the
/// version before taking the lock; the lock only guards the append.
pub struct MigrationRegistry {
    rules: VersionRules,
    steps: Mutex<Vec<MigrationStep>>,
}

impl MigrationRegistry {
    /// Create a new empty registry with the default version rules.
    pub fn new() -> Self {
        Self::with_rules(VersionRules::default())
    }

    pub fn with_rules(rules: VersionRules) -> Self {
        Self {
            rules,
            steps: Mutex::new(Vec::new()),
        }
    }

    /// Register a step under `version`.
    ///
    /// Fails if the version matches none of the known encodings, is a
    /// current-format version dated too far in the future, or is already
    /// registered (after correction).
    pub fn register(
        &self,
        version: &str,
        handler: Arc<dyn StepHandler>,
    ) -> Result<(), MigrationError> {
        let parsed = self.rules.validate(version).map_err(|e| {
            error!(version, error = %e, "Rejected migration registration");
            e
        })?;
        // Structured legacy versions are recorded in their dotted form.
        let name = match &parsed {
            VersionIdentifier::LegacyStructured(_) => parsed.to_string(),
            _ => self.rules.correct(version).to_string(),
        };

        let mut steps = self.steps.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = steps.iter().find(|s| s.version == parsed) {
            error!(version, existing = %existing.name, "Duplicate migration version");
            return Err(MigrationError::DuplicateVersion(version.to_string()));
        }
        steps.push(MigrationStep {
            name,
            version: parsed,
            handler,
        });
        drop(steps);

        debug!(version, "Registered migration");
        Ok(())
    }

    /// All steps ordered by version. Equal versions keep registration order.
    pub fn sorted_steps(&self) -> Vec<MigrationStep> {
        let mut steps = self
            .steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        steps.sort_by(|a, b| a.version.cmp(&b.version));
        steps
    }

    /// Registered version names in execution order.
    pub fn versions(&self) -> Vec<String> {
        self.sorted_steps().into_iter().map(|s| s.name).collect()
    }

    /// Look up a step by version, matching after correction and parsing.
    pub fn find(&self, version: &str) -> Result<Option<MigrationStep>, MigrationError> {
        let parsed = self.rules.parse(version)?;
        Ok(self
            .steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|s| s.version == parsed)
            .cloned())
    }

    pub fn len(&self) -> usize {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rules(&self) -> &VersionRules {
        &self.rules
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
