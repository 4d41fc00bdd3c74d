//! Point-in-time read model handed to rendering collaborators.
//!
//! # Responsibility
//! - Carry every collection plus the fixed catalogs in one owned value.
//! - Provide the read-side views callers render: filtered/paginated customer
//!   lists, status counts, financial aggregates and export rows.
//!
//! # Invariants
//! - A snapshot is never refreshed in place; callers fetch a new one after
//!   each mutation.

use crate::model::catalog::{Catalog, CustomerStatus, DueDay, PaymentMethod, Plan};
use crate::model::customer::{Customer, CustomerId};
use crate::model::installation::{Installation, Payment};
use crate::model::settings::Settings;
use crate::service::finance::{compute_financial_aggregates, valid_installations, FinancialSummary};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Default number of customers per list page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub customers: Vec<Customer>,
    pub installations: Vec<Installation>,
    pub settings: Settings,
    pub catalog: Catalog,
}

/// Customer list filters; empty text and `None` match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFilter {
    /// Case-insensitive substring of the customer name.
    pub text: String,
    pub branch: Option<String>,
    pub due_day: Option<DueDay>,
    /// Canceled customers are hidden unless this is set.
    pub include_canceled: bool,
}

impl CustomerFilter {
    pub fn matches(&self, customer: &Customer) -> bool {
        let needle = self.text.trim().to_lowercase();
        (self.include_canceled || customer.is_active())
            && (needle.is_empty() || customer.name.to_lowercase().contains(&needle))
            && self
                .branch
                .as_deref()
                .map_or(true, |branch| customer.branch == branch)
            && self.due_day.map_or(true, |due_day| customer.due_day == due_day)
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerPage<'a> {
    pub items: Vec<&'a Customer>,
    /// Effective page after clamping into `1..=total_pages`.
    pub page: usize,
    /// At least 1, even for an empty result.
    pub total_pages: usize,
    pub total_items: usize,
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub not_installed: usize,
    pub installed: usize,
    pub canceled: usize,
}

impl StatusCounts {
    pub fn active(&self) -> usize {
        self.not_installed + self.installed
    }
}

/// Flat export row: one valid installation joined with its customer name.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub customer_name: String,
    pub branch: String,
    pub plan: Plan,
    pub due_day: DueDay,
    pub payment1: Payment,
    pub payment2: Payment,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

impl ReportRow {
    pub fn payment_methods(&self) -> impl Iterator<Item = PaymentMethod> + '_ {
        [self.payment1.method, self.payment2.method].into_iter().flatten()
    }
}

impl Snapshot {
    pub fn new(customers: Vec<Customer>, installations: Vec<Installation>, settings: Settings) -> Self {
        let catalog = Catalog::with_branches(settings.branches.clone());
        Self {
            customers,
            installations,
            settings,
            catalog,
        }
    }

    pub fn customer(&self, id: CustomerId) -> Option<&Customer> {
        self.customers.iter().find(|customer| customer.id == id)
    }

    pub fn active_customers(&self) -> impl Iterator<Item = &Customer> + '_ {
        self.customers.iter().filter(|customer| customer.is_active())
    }

    /// Customers of any status currently assigned to `branch`.
    pub fn customers_in_branch(&self, branch: &str) -> Vec<&Customer> {
        self.customers
            .iter()
            .filter(|customer| customer.branch == branch)
            .collect()
    }

    /// First (oldest) installation registered for a customer.
    pub fn installation_for_customer(&self, customer_id: CustomerId) -> Option<&Installation> {
        self.installations
            .iter()
            .filter(|installation| installation.customer_id == customer_id)
            .min_by_key(|installation| installation.id)
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for customer in &self.customers {
            match customer.status {
                CustomerStatus::NotInstalled => counts.not_installed += 1,
                CustomerStatus::Installed => counts.installed += 1,
                CustomerStatus::Canceled => counts.canceled += 1,
            }
        }
        counts
    }

    pub fn financials(&self) -> FinancialSummary {
        compute_financial_aggregates(&self.customers, &self.installations)
    }

    /// Filters customers, keeps id order, and cuts out one page.
    pub fn customer_page(&self, filter: &CustomerFilter, request: PageRequest) -> CustomerPage<'_> {
        let matching = self
            .customers
            .iter()
            .filter(|customer| filter.matches(customer))
            .collect::<Vec<_>>();

        let per_page = if request.per_page == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            request.per_page
        };
        let total_items = matching.len();
        let total_pages = total_items.div_ceil(per_page).max(1);
        let page = request.page.clamp(1, total_pages);

        let items = matching
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();

        CustomerPage {
            items,
            page,
            total_pages,
            total_items,
        }
    }

    /// Rows for spreadsheet/PDF collaborators, in installation order.
    pub fn report_rows(&self) -> Vec<ReportRow> {
        let names = self
            .customers
            .iter()
            .map(|customer| (customer.id, customer.name.as_str()))
            .collect::<HashMap<_, _>>();

        valid_installations(&self.customers, &self.installations)
            .into_iter()
            .map(|installation| ReportRow {
                customer_name: names
                    .get(&installation.customer_id)
                    .map(|name| name.to_string())
                    .unwrap_or_default(),
                branch: installation.branch.clone(),
                plan: installation.plan,
                due_day: installation.due_day,
                payment1: installation.payment1,
                payment2: installation.payment2,
                total: installation.total,
                created_at: installation.created_at,
            })
            .collect()
    }
}
