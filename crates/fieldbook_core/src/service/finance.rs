//! Financial aggregates derived from customers and installations.
//!
//! Pure functions over explicit slices; nothing here touches storage.
//!
//! # Invariants
//! - Installations of canceled customers never contribute to any total.
//! - Installations whose owner is absent from the customer list are treated
//!   like canceled ones.
//! - The recent list is an activity feed: it spans every installation,
//!   whatever its owner's status.

use crate::model::catalog::{DueDay, PaymentMethod, Plan};
use crate::model::customer::{Customer, CustomerId};
use crate::model::installation::Installation;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

/// How many installations the "latest installations" list holds.
pub const RECENT_INSTALLATIONS_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialSummary {
    /// Sum of `total` over `valid_installations`.
    pub grand_total: f64,
    /// Installations of non-canceled customers, in input order.
    pub valid_installations: Vec<Installation>,
    /// Each payment slot summed independently under its method.
    pub totals_by_payment_method: BTreeMap<PaymentMethod, f64>,
    pub totals_by_branch: BTreeMap<String, f64>,
    /// Newest first, taken from all installations.
    pub recent_installations: Vec<Installation>,
}

/// Optional dashboard filters; `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinancialFilter {
    pub branch: Option<String>,
    /// Matches when either payment slot uses this method.
    pub payment_method: Option<PaymentMethod>,
    pub plan: Option<Plan>,
    pub due_day: Option<DueDay>,
}

impl FinancialFilter {
    pub fn matches(&self, installation: &Installation) -> bool {
        self.branch
            .as_deref()
            .map_or(true, |branch| installation.branch == branch)
            && self
                .payment_method
                .map_or(true, |method| installation.uses_method(method))
            && self.plan.map_or(true, |plan| installation.plan == plan)
            && self
                .due_day
                .map_or(true, |due_day| installation.due_day == due_day)
    }
}

/// Installations left after a `FinancialFilter`, with their summed total.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredInstallations<'a> {
    pub items: Vec<&'a Installation>,
    pub total: f64,
}

impl FinancialSummary {
    pub fn filtered(&self, filter: &FinancialFilter) -> FilteredInstallations<'_> {
        let items = self
            .valid_installations
            .iter()
            .filter(|installation| filter.matches(installation))
            .collect::<Vec<_>>();
        let total = items.iter().map(|installation| installation.total).sum();
        FilteredInstallations { items, total }
    }
}

/// Installations that belong to a listed, non-canceled customer.
pub fn valid_installations<'a>(
    customers: &[Customer],
    installations: &'a [Installation],
) -> Vec<&'a Installation> {
    let active_ids = customers
        .iter()
        .filter(|customer| customer.is_active())
        .map(|customer| customer.id)
        .collect::<HashSet<CustomerId>>();

    installations
        .iter()
        .filter(|installation| active_ids.contains(&installation.customer_id))
        .collect()
}

/// Computes dashboard totals for the given customers and installations.
pub fn compute_financial_aggregates(
    customers: &[Customer],
    installations: &[Installation],
) -> FinancialSummary {
    let valid = valid_installations(customers, installations);

    let mut summary = FinancialSummary::default();
    for installation in &valid {
        summary.grand_total += installation.total;

        for (method, amount) in [installation.payment1, installation.payment2]
            .iter()
            .filter_map(|payment| payment.counted())
        {
            *summary.totals_by_payment_method.entry(method).or_insert(0.0) += amount;
        }

        if !installation.branch.is_empty() {
            *summary
                .totals_by_branch
                .entry(installation.branch.clone())
                .or_insert(0.0) += installation.total;
        }
    }

    let mut recent = installations.iter().collect::<Vec<_>>();
    recent.sort_by_key(|installation| Reverse((installation.created_at, installation.id)));
    summary.recent_installations = recent
        .into_iter()
        .take(RECENT_INSTALLATIONS_LIMIT)
        .cloned()
        .collect();
    summary.valid_installations = valid.into_iter().cloned().collect();

    summary
}
