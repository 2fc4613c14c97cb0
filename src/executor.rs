//! `TideExecutor` trait
//!
//! The query builder and the record mapper never touch a connection directly. They
//! compile SQL with `?` placeholders plus a positional [`Value`] list and hand both to
//! a `TideExecutor`. [`Database`](crate::Database) and
//! [`Transaction`](crate::Transaction) are the provided implementations.

use crate::error::TideError;
use crate::query::Grammar;
use crate::value::{Row, Value};

/// Result of [`TideExecutor::run`]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Rows produced by a query
    Rows(Vec<Row>),
    /// Rows affected by a mutating statement
    Affected(u64),
}

/// Statement category, decided by the leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    Update,
    Delete,
    Query,
}

impl StatementKind {
    /// Classify `sql` by its first keyword, ignoring case and leading whitespace
    pub fn of(sql: &str) -> Self {
        let keyword = sql
            .trim_start()
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match keyword.as_str() {
            "insert" | "replace" => StatementKind::Insert,
            "update" => StatementKind::Update,
            "delete" => StatementKind::Delete,
            _ => StatementKind::Query,
        }
    }

    /// `true` for statements that report an affected-row count
    pub fn is_mutation(self) -> bool {
        !matches!(self, StatementKind::Query)
    }
}

/// Trait for executing compiled statements
///
/// # Examples
///
/// ```no_run
/// use tidewater::{Database, TideExecutor, TideError, Value};
///
/// # fn main() -> Result<(), TideError> {
/// let db = Database::open_in_memory()?;
/// db.execute("create table users (id integer primary key, name text)", &[])?;
///
/// let affected = db.execute("insert into users (name) values (?)", &[Value::from("Ada")])?;
/// assert_eq!(affected, 1);
///
/// let rows = db.query_all("select * from users", &[])?;
/// assert_eq!(rows.len(), 1);
/// # Ok(())
/// # }
/// ```
pub trait TideExecutor {
    /// Dialect the builder compiles for when running against this executor
    fn grammar(&self) -> Grammar;

    /// Run a query and return every row
    ///
    /// # Errors
    ///
    /// Returns `TideError` if preparing or stepping the statement fails.
    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, TideError>;

    /// Run a mutating statement and return the number of rows affected
    ///
    /// Implementations wrap the statement in an implicit transaction unless that is
    /// disabled or an explicit transaction is already open; on failure the implicit
    /// transaction is rolled back and the original error is returned.
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the statement fails.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, TideError>;

    /// Run an insert and return the key generated for the new row
    ///
    /// Callers must check [`supports_insert_get_id`](Self::supports_insert_get_id)
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `TideError::Execution` when no row was inserted, or the underlying
    /// error if the statement fails.
    fn insert_get_id(&self, sql: &str, params: &[Value]) -> Result<Value, TideError>;

    /// Whether [`insert_get_id`](Self::insert_get_id) is available
    fn supports_insert_get_id(&self) -> bool {
        true
    }

    /// Run a query and return its first row, if any
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, TideError> {
        Ok(self.query_all(sql, params)?.into_iter().next())
    }

    /// Run any statement, deciding between rows and an affected count from its
    /// leading keyword
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the statement fails.
    fn run(&self, sql: &str, params: &[Value]) -> Result<Outcome, TideError> {
        if StatementKind::of(sql).is_mutation() {
            self.execute(sql, params).map(Outcome::Affected)
        } else {
            self.query_all(sql, params).map(Outcome::Rows)
        }
    }
}
