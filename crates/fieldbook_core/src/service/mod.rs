//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep callers decoupled from storage details: they get owned
//!   `Snapshot` values and typed `StoreError`s, never rows.

pub mod backup_service;
pub mod finance;
pub mod snapshot;
pub mod store;

pub use backup_service::{BackupBundle, RestoreSummary, BACKUP_FORMAT_VERSION};
pub use finance::{
    compute_financial_aggregates, FilteredInstallations, FinancialFilter, FinancialSummary,
};
pub use snapshot::{
    CustomerFilter, CustomerPage, PageRequest, ReportRow, Snapshot, StatusCounts,
    DEFAULT_PAGE_SIZE,
};
pub use store::{DataStore, ImportFailure, ImportReport};
