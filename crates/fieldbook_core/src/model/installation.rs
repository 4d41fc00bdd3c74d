//! Installation domain model.
//!
//! # Responsibility
//! - Define the persisted installation record with its two payment slots.
//! - Own amount coercion and total computation.
//!
//! # Invariants
//! - `total == payment1.amount + payment2.amount` for every written record.
//! - Raw amounts that do not start with a number count as `0`.

use crate::model::catalog::{DueDay, PaymentMethod, Plan};
use crate::model::customer::CustomerId;
use crate::model::validation::{Field, ValidationError};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LEADING_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").expect("valid number regex")
});

/// Store-assigned, monotonically increasing installation id.
pub type InstallationId = i64;

/// One settled amount and how it was paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    #[serde(default)]
    pub amount: f64,
}

impl Payment {
    /// Method and amount when this slot contributes to per-method totals.
    pub fn counted(&self) -> Option<(PaymentMethod, f64)> {
        match self.method {
            Some(method) if self.amount != 0.0 => Some((method, self.amount)),
            _ => None,
        }
    }
}

/// Persisted installation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    pub id: InstallationId,
    pub customer_id: CustomerId,
    pub branch: String,
    pub plan: Plan,
    pub due_day: DueDay,
    #[serde(default)]
    pub payment1: Payment,
    #[serde(default)]
    pub payment2: Payment,
    #[serde(default)]
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

impl Installation {
    /// Re-derives `total` from the payment slots.
    pub fn recompute_total(&mut self) {
        self.total = sum_payments(&self.payment1, &self.payment2);
    }

    pub fn uses_method(&self, method: PaymentMethod) -> bool {
        self.payment1.method == Some(method) || self.payment2.method == Some(method)
    }
}

/// Caller-supplied fields for registering or editing an installation.
///
/// Amounts are raw text, as typed into a form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallationInput {
    pub branch: String,
    pub plan: Option<Plan>,
    pub due_day: Option<DueDay>,
    pub method1: Option<PaymentMethod>,
    pub amount1: String,
    pub method2: Option<PaymentMethod>,
    pub amount2: String,
}

/// Normalized installation fields ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallationDraft {
    pub branch: String,
    pub plan: Plan,
    pub due_day: DueDay,
    pub payment1: Payment,
    pub payment2: Payment,
    pub total: f64,
}

impl InstallationInput {
    /// Validates required fields and computes the total.
    ///
    /// # Errors
    /// - `ValidationError::MissingFields` naming every absent field at once.
    pub fn validate(&self) -> Result<InstallationDraft, ValidationError> {
        let branch = self.branch.trim();

        let mut missing = Vec::new();
        if branch.is_empty() {
            missing.push(Field::Branch);
        }
        if self.plan.is_none() {
            missing.push(Field::Plan);
        }
        if self.due_day.is_none() {
            missing.push(Field::DueDay);
        }

        let (Some(plan), Some(due_day)) = (self.plan, self.due_day) else {
            return Err(ValidationError::MissingFields(missing));
        };
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let payment1 = Payment {
            method: self.method1,
            amount: parse_amount(&self.amount1),
        };
        let payment2 = Payment {
            method: self.method2,
            amount: parse_amount(&self.amount2),
        };

        Ok(InstallationDraft {
            branch: branch.to_string(),
            plan,
            due_day,
            payment1,
            payment2,
            total: sum_payments(&payment1, &payment2),
        })
    }
}

/// Parses a user-typed amount, reading only its leading numeric prefix.
///
/// `"150"` -> 150, `"99.5 reais"` -> 99.5, `"abc"`/`""` -> 0. Non-finite
/// results also become 0.
pub fn parse_amount(raw: &str) -> f64 {
    LEADING_NUMBER_RE
        .find(raw.trim_start())
        .and_then(|found| found.as_str().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

fn sum_payments(first: &Payment, second: &Payment) -> f64 {
    finite_or_zero(first.amount) + finite_or_zero(second.amount)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
