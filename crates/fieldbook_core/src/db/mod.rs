//! On-disk layout of a fieldbook store.
//!
//! A store is one SQLite file with three tables: `customers`,
//! `installations` (linked to customers by `customer_id`) and `settings`
//! (a key/value table whose `app_settings` row holds the branch list and
//! the last backup time as JSON). The tables are created by the migrations in
//! [`migrations`]; the settings row itself is written later by the service
//! layer on first open.
//!
//! The schema version lives in `PRAGMA user_version`. A file stamped by a
//! newer release is refused untouched, so an older binary never rewrites
//! data it does not understand.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or migrating a store file.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a release with more migrations than this one.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "fieldbook file uses schema {found}, this build reads up to {supported}; \
                 upgrade fieldbook or restore a backup into a new file"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
