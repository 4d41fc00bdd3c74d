//! Validation errors raised before any write reaches storage.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Input field that can be reported as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Branch,
    Plan,
    DueDay,
    CustomerIds,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Branch => "branch",
            Self::Plan => "plan",
            Self::DueDay => "due_day",
            Self::CustomerIds => "customer_ids",
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected write input. Never produced for persisted rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Every required field that was absent or blank, in declaration order.
    MissingFields(Vec<Field>),
    /// Branch is not part of the configured branch list.
    UnknownBranch(String),
    /// A configured branch name is blank after trimming.
    EmptyBranchName,
    /// The same branch name appears more than once in a branch list.
    DuplicateBranch(String),
    /// Arguments are individually present but inconsistent.
    InvalidArgument(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFields(fields) => {
                let names = fields
                    .iter()
                    .map(|field| field.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "required fields missing: {names}")
            }
            Self::UnknownBranch(branch) => write!(f, "branch `{branch}` is not configured"),
            Self::EmptyBranchName => write!(f, "branch name cannot be empty"),
            Self::DuplicateBranch(branch) => write!(f, "branch `{branch}` is listed twice"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
        }
    }
}

impl Error for ValidationError {}

impl ValidationError {
    /// Returns the missing fields when this is a `MissingFields` error.
    pub fn missing_fields(&self) -> &[Field] {
        match self {
            Self::MissingFields(fields) => fields,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Field, ValidationError};

    #[test]
    fn missing_fields_message_lists_every_field() {
        let err = ValidationError::MissingFields(vec![Field::Name, Field::Plan, Field::DueDay]);
        assert_eq!(
            err.to_string(),
            "required fields missing: name, plan, due_day"
        );
        assert_eq!(err.missing_fields().len(), 3);
    }
}
