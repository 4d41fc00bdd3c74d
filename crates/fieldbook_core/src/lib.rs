//! Core domain logic for Fieldbook, a local customer and installation
//! registry for a field-service operation.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DB_PATH_VAR};
pub use error::{ConflictError, EntityRef, StoreError, StoreResult};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::catalog::{Catalog, CustomerStatus, DueDay, PaymentMethod, Plan};
pub use model::customer::{Customer, CustomerId, CustomerInput};
pub use model::installation::{Installation, InstallationId, InstallationInput, Payment};
pub use model::settings::Settings;
pub use model::validation::{Field, ValidationError};
pub use service::{
    BackupBundle, CustomerFilter, CustomerPage, DataStore, FinancialFilter, FinancialSummary,
    ImportFailure, ImportReport, PageRequest, ReportRow, RestoreSummary, Snapshot, StatusCounts,
    BACKUP_FORMAT_VERSION,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
