//! Error types for dbdesk

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for dbdesk operations
pub type AdminResult<T> = Result<T, AdminError>;

/// Error types for statement synthesis, gating and execution.
///
/// Everything except [`AdminError::DatabaseExecution`] and
/// [`AdminError::Connection`] is raised before the database client is contacted.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Table is not in the live table list
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Column is not in the table's schema snapshot
    #[error("Unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// INSERT/UPDATE with nothing to write
    #[error("No values to write into '{0}'")]
    EmptyAssignment(String),

    /// UPDATE/DELETE without any WHERE predicate
    #[error("Refusing to modify every row of '{0}': at least one WHERE predicate is required")]
    MissingPredicate(String),

    /// Malformed predicate (missing value, empty IN list, ...)
    #[error("Invalid predicate on '{column}': {message}")]
    InvalidPredicate { column: String, message: String },

    /// Statement targets a different table than the one it was submitted for
    #[error("Table mismatch: expected '{expected}', statement targets '{found}'")]
    TableMismatch { expected: String, found: String },

    /// Destructive statement submitted without confirmation
    #[error("Confirmation required: {0}")]
    ConfirmationRequired(String),

    /// Statement rejected by the builder surface's policy
    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    /// Error reported by the database while running a statement
    #[error("Database error: {message} (statement: {statement})")]
    DatabaseExecution { statement: String, message: String },

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Serializable discriminant of [`AdminError`] for request/response payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownTable,
    UnknownColumn,
    EmptyAssignment,
    MissingPredicate,
    InvalidPredicate,
    TableMismatch,
    ConfirmationRequired,
    PolicyViolation,
    DatabaseExecution,
    Connection,
    Validation,
    Serialization,
}

impl AdminError {
    /// Create an unknown column error
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create an invalid predicate error
    pub fn invalid_predicate(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPredicate {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a database execution error carrying the statement text
    pub fn database(statement: impl Into<String>, message: impl ToString) -> Self {
        Self::DatabaseExecution {
            statement: statement.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The serializable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTable(_) => ErrorKind::UnknownTable,
            Self::UnknownColumn { .. } => ErrorKind::UnknownColumn,
            Self::EmptyAssignment(_) => ErrorKind::EmptyAssignment,
            Self::MissingPredicate(_) => ErrorKind::MissingPredicate,
            Self::InvalidPredicate { .. } => ErrorKind::InvalidPredicate,
            Self::TableMismatch { .. } => ErrorKind::TableMismatch,
            Self::ConfirmationRequired(_) => ErrorKind::ConfirmationRequired,
            Self::PolicyViolation(_) => ErrorKind::PolicyViolation,
            Self::DatabaseExecution { .. } => ErrorKind::DatabaseExecution,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Check if this error was raised before the database was contacted
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            Self::DatabaseExecution { .. } | Self::Connection(_)
        )
    }

    /// Check if this is a missing predicate error
    pub fn is_missing_predicate(&self) -> bool {
        matches!(self, Self::MissingPredicate(_))
    }

    /// Check if this is a confirmation required error
    pub fn is_confirmation_required(&self) -> bool {
        matches!(self, Self::ConfirmationRequired(_))
    }
}

impl From<serde_json::Error> for AdminError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl AdminError {
    /// Map a driver error for `statement`, keeping the server message and
    /// SQLSTATE when there is one.
    pub fn from_db_error(statement: impl Into<String>, err: tokio_postgres::Error) -> Self {
        let message = match err.as_db_error() {
            Some(db_err) => format!("{} (SQLSTATE {})", db_err.message(), db_err.code().code()),
            None => err.to_string(),
        };
        Self::DatabaseExecution {
            statement: statement.into(),
            message,
        }
    }
}

#[cfg(feature = "postgres")]
impl From<deadpool_postgres::PoolError> for AdminError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Connection(err.to_string())
    }
}
