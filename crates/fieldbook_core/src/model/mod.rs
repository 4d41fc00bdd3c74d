//! Domain model for customers, installations and store settings.
//!
//! # Responsibility
//! - Define canonical records shared by repositories, services and callers.
//! - Own input validation and normalization rules for write paths.
//! - Replace free-form configuration strings with closed catalogs.
//!
//! # Invariants
//! - Records are identified by store-assigned integer ids.
//! - Customer cancellation is a soft state (`CustomerStatus::Canceled`);
//!   only an explicit delete removes rows.
//! - Timestamps are UTC with millisecond precision so they survive a
//!   persistence round-trip unchanged.

pub mod catalog;
pub mod customer;
pub mod installation;
pub mod settings;
pub mod validation;

use chrono::{DateTime, SubsecRound, Utc};

/// Current UTC time truncated to the precision stored on disk.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
