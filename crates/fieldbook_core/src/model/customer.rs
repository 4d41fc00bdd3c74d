//! Customer domain model.
//!
//! # Responsibility
//! - Define the persisted customer record and its write input.
//! - Normalize names so the `(name, branch)` uniqueness rule is not defeated
//!   by stray whitespace.
//!
//! # Invariants
//! - `status` is owned by the store; write input cannot set it.
//! - A validated draft always carries a non-empty name and branch.

use crate::model::catalog::{CustomerStatus, DueDay, Plan};
use crate::model::validation::{Field, ValidationError};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Store-assigned, monotonically increasing customer id.
pub type CustomerId = i64;

/// Persisted customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub branch: String,
    pub plan: Plan,
    pub due_day: DueDay,
    pub status: CustomerStatus,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Returns whether this customer counts in active views and totals.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Caller-supplied fields for creating or editing a customer.
///
/// Catalog fields are optional so that a form submitted without a choice is
/// reported as missing rather than silently defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerInput {
    pub name: String,
    pub branch: String,
    pub plan: Option<Plan>,
    pub due_day: Option<DueDay>,
}

/// Normalized customer fields ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDraft {
    pub name: String,
    pub branch: String,
    pub plan: Plan,
    pub due_day: DueDay,
}

impl CustomerInput {
    /// Validates required fields and returns the normalized draft.
    ///
    /// # Errors
    /// - `ValidationError::MissingFields` naming every absent field at once.
    pub fn validate(&self) -> Result<CustomerDraft, ValidationError> {
        let name = normalize_name(&self.name);
        let branch = self.branch.trim();

        let mut missing = Vec::new();
        if name.is_empty() {
            missing.push(Field::Name);
        }
        if branch.is_empty() {
            missing.push(Field::Branch);
        }
        if self.plan.is_none() {
            missing.push(Field::Plan);
        }
        if self.due_day.is_none() {
            missing.push(Field::DueDay);
        }

        match (self.plan, self.due_day) {
            (Some(plan), Some(due_day)) if missing.is_empty() => Ok(CustomerDraft {
                name,
                branch: branch.to_string(),
                plan,
                due_day,
            }),
            _ => Err(ValidationError::MissingFields(missing)),
        }
    }
}

/// Trims a customer name and collapses inner whitespace runs to one space.
pub fn normalize_name(name: &str) -> String {
    WHITESPACE_RE.replace_all(name.trim(), " ").into_owned()
}
