//! Error type shared by the executor, the query builder and the record mapper.
//!
//! `TideError` covers every failure surfaced to callers. Variants are grouped into
//! the categories returned by [`TideError::kind`], so callers can branch on the
//! category without matching every variant.

use std::fmt;

/// Broad category of a [`TideError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unresolvable primary key, missing attribute mapping, bad config
    Configuration,
    /// Row ↔ record conversion failure
    Mapping,
    /// Foreign key not found, or a relationship against the same record type
    Relationship,
    /// Statement execution failure
    Execution,
    /// A "must find" accessor matched zero rows
    NotFound,
    /// A capability the current executor does not provide
    Unsupported,
}

/// Error type for all tidewater operations
#[derive(Debug)]
pub enum TideError {
    /// Model definition or environment is misconfigured
    Configuration(String),
    /// Primary key value is null where one is required
    NullPrimaryKey(String),
    /// A row value could not be coerced into the attribute's type
    InvalidValueType {
        column: String,
        expected: String,
        actual: String,
    },
    /// A mapped column is absent from the result row
    ColumnNotFound(String),
    /// Relationship resolution failure
    Relationship(String),
    /// `SQLite` error from `rusqlite`
    Sqlite(rusqlite::Error),
    /// Other execution errors reported by an executor
    Execution(String),
    /// The builder was asked to compile something it cannot express
    InvalidQuery(String),
    /// No row matched a "must find" lookup
    NotFound { table: String, key: String },
    /// Capability withheld by the executor
    Unsupported(String),
    /// Configuration could not be loaded
    Config(config::ConfigError),
    /// Transaction already committed or rolled back
    TransactionClosed,
}

impl TideError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TideError::Configuration(_) | TideError::NullPrimaryKey(_) | TideError::Config(_) => {
                ErrorKind::Configuration
            }
            TideError::InvalidValueType { .. } | TideError::ColumnNotFound(_) => ErrorKind::Mapping,
            TideError::Relationship(_) => ErrorKind::Relationship,
            TideError::Sqlite(_)
            | TideError::Execution(_)
            | TideError::InvalidQuery(_)
            | TideError::TransactionClosed => ErrorKind::Execution,
            TideError::NotFound { .. } => ErrorKind::NotFound,
            TideError::Unsupported(_) => ErrorKind::Unsupported,
        }
    }

    pub(crate) fn not_found(table: impl Into<String>, key: impl fmt::Display) -> Self {
        TideError::NotFound {
            table: table.into(),
            key: key.to_string(),
        }
    }
}

impl fmt::Display for TideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TideError::Configuration(s) => write!(f, "Configuration error: {s}"),
            TideError::NullPrimaryKey(column) => {
                write!(f, "The value of primary key is null: {column}")
            }
            TideError::InvalidValueType {
                column,
                expected,
                actual,
            } => write!(
                f,
                "Invalid value type for column {column}: expected {expected}, got {actual}"
            ),
            TideError::ColumnNotFound(column) => write!(f, "Column not found: {column}"),
            TideError::Relationship(s) => write!(f, "Relationship error: {s}"),
            TideError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            TideError::Execution(s) => write!(f, "Execution error: {s}"),
            TideError::InvalidQuery(s) => write!(f, "Query error: {s}"),
            TideError::NotFound { table, key } => {
                write!(f, "There is no row in table {table} with {key} as key")
            }
            TideError::Unsupported(s) => write!(f, "Unsupported operation: {s}"),
            TideError::Config(e) => write!(f, "Config error: {e}"),
            TideError::TransactionClosed => {
                write!(f, "Transaction has already been committed or rolled back")
            }
        }
    }
}

impl std::error::Error for TideError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TideError::Sqlite(e) => Some(e),
            TideError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for TideError {
    fn from(err: rusqlite::Error) -> Self {
        TideError::Sqlite(err)
    }
}

impl From<config::ConfigError> for TideError {
    fn from(err: config::ConfigError) -> Self {
        TideError::Config(err)
    }
}
