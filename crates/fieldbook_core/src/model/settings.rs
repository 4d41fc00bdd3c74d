//! Store settings singleton.
//!
//! # Invariants
//! - Branch names are trimmed, non-empty and unique.
//! - Branch order is insertion order and doubles as display order.

use crate::model::catalog::DEFAULT_BRANCHES;
use crate::model::validation::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Key of the single settings row.
pub const SETTINGS_KEY: &str = "app_settings";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub branches: Vec<String>,
    #[serde(default)]
    pub last_backup_timestamp: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            branches: DEFAULT_BRANCHES
                .iter()
                .map(|branch| branch.to_string())
                .collect(),
            last_backup_timestamp: None,
        }
    }
}

impl Settings {
    /// Returns a copy with trimmed branch names after checking them.
    ///
    /// # Errors
    /// - `EmptyBranchName` for a blank entry.
    /// - `DuplicateBranch` for a name listed twice.
    pub fn validate(&self) -> Result<Settings, ValidationError> {
        let mut seen = HashSet::new();
        let mut branches = Vec::with_capacity(self.branches.len());
        for branch in &self.branches {
            let trimmed = branch.trim();
            if trimmed.is_empty() {
                return Err(ValidationError::EmptyBranchName);
            }
            if !seen.insert(trimmed) {
                return Err(ValidationError::DuplicateBranch(trimmed.to_string()));
            }
            branches.push(trimmed.to_string());
        }

        Ok(Settings {
            branches,
            last_backup_timestamp: self.last_backup_timestamp,
        })
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.branches.iter().any(|branch| branch == name)
    }

    /// Returns a copy without `name`, keeping the order of the others.
    pub fn without_branch(&self, name: &str) -> Settings {
        Settings {
            branches: self
                .branches
                .iter()
                .filter(|branch| branch.as_str() != name)
                .cloned()
                .collect(),
            last_backup_timestamp: self.last_backup_timestamp,
        }
    }
}
