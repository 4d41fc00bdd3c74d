//! Public error taxonomy of the store.
//!
//! Every store operation returns `StoreResult`. Callers match on the
//! variant to decide how to present the failure; nothing is swallowed.

use crate::db::DbError;
use crate::model::customer::CustomerId;
use crate::model::installation::InstallationId;
use crate::model::validation::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type StoreResult<T> = Result<T, StoreError>;

/// Record an operation referred to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Customer(CustomerId),
    Installation(InstallationId),
    Branch(String),
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer(id) => write!(f, "customer {id}"),
            Self::Installation(id) => write!(f, "installation {id}"),
            Self::Branch(name) => write!(f, "branch `{name}`"),
        }
    }
}

/// Write rejected because of existing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    /// Another customer already uses this `(name, branch)` pair.
    DuplicateCustomer { name: String, branch: String },
    /// Branch still referenced by `count` customers.
    BranchInUse { branch: String, count: usize },
    /// Branch is already configured.
    BranchExists(String),
    /// Canceled customers cannot receive new installations.
    CustomerCanceled(CustomerId),
}

impl Display for ConflictError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateCustomer { name, branch } => write!(
                f,
                "a customer named `{name}` already exists in branch `{branch}`"
            ),
            Self::BranchInUse { branch, count } => write!(
                f,
                "branch `{branch}` cannot be removed: {count} customers still reference it"
            ),
            Self::BranchExists(branch) => write!(f, "branch `{branch}` already exists"),
            Self::CustomerCanceled(id) => write!(f, "customer {id} is canceled"),
        }
    }
}

impl Error for ConflictError {}

#[derive(Debug)]
pub enum StoreError {
    /// Required input missing or inconsistent.
    Validation(ValidationError),
    /// Uniqueness or reference rule violated.
    Conflict(ConflictError),
    /// Referenced record does not exist.
    NotFound(EntityRef),
    /// Backup payload is structurally invalid.
    MalformedBackup(String),
    /// Backup payload carries another format version.
    IncompatibleVersion {
        found: Option<String>,
        expected: &'static str,
    },
    /// Backup file could not be read or written.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Persistence engine failure.
    Storage(RepoError),
    /// A write succeeded but its read-back did not.
    InconsistentState(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict(err) => write!(f, "{err}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::MalformedBackup(message) => write!(f, "malformed backup: {message}"),
            Self::IncompatibleVersion { found, expected } => match found {
                Some(found) => write!(
                    f,
                    "incompatible backup version `{found}`, expected `{expected}`"
                ),
                None => write!(f, "backup has no version, expected `{expected}`"),
            },
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Storage(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent store state: {details}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Conflict(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Storage(err) => Some(err),
            Self::NotFound(_)
            | Self::MalformedBackup(_)
            | Self::IncompatibleVersion { .. }
            | Self::InconsistentState(_) => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::Conflict(err) => Self::Conflict(err),
            RepoError::NotFound(entity) => Self::NotFound(entity),
            other => Self::Storage(other),
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ConflictError> for StoreError {
    fn from(value: ConflictError) -> Self {
        Self::Conflict(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Storage(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(RepoError::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::StoreError;
    use crate::db::DbError;
    use crate::repo::RepoError;
    use std::error::Error;
    use std::path::PathBuf;

    #[test]
    fn db_failures_map_to_storage_and_file_failures_stay_io() {
        let storage = StoreError::from(DbError::SchemaTooNew {
            found: 2,
            supported: 1,
        });
        assert!(matches!(
            storage,
            StoreError::Storage(RepoError::Db(DbError::SchemaTooNew { .. }))
        ));

        let io = StoreError::Io {
            path: PathBuf::from("backup.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(io.to_string().starts_with("backup.json: "));
        assert!(io.source().is_some());

        let inconsistent = StoreError::InconsistentState("saved customer not found in read-back");
        assert!(inconsistent.source().is_none());
    }
}
