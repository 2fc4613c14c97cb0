//! Explicit transactions
//!
//! A [`Transaction`] widens the transaction boundary across many statements. It
//! implements [`TideExecutor`], so builders and records run inside it by passing it
//! where a [`Database`] would go. Nested transactions use savepoints.
//!
//! A transaction that is dropped without [`commit`](Transaction::commit) or
//! [`rollback`](Transaction::rollback) is rolled back.

use crate::connection::Database;
use crate::error::TideError;
use crate::executor::TideExecutor;
use crate::query::Grammar;
use crate::value::{Row, Value};

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// A database transaction
///
/// # Examples
///
/// ```no_run
/// use tidewater::{Database, QueryBuilder, Row, TideError};
///
/// # fn main() -> Result<(), TideError> {
/// let db = Database::open_in_memory()?;
/// let mut tx = db.begin()?;
/// QueryBuilder::table("users").insert(&tx, &Row::new().with("name", "Alice"))?;
///
/// // Roll back only the inner work
/// let nested = tx.begin_nested()?;
/// QueryBuilder::table("users").insert(&nested, &Row::new().with("name", "Bob"))?;
/// nested.rollback()?;
///
/// tx.commit()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Transaction<'a> {
    db: &'a Database,
    depth: u32,
    closed: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(db: &'a Database) -> Result<Self, TideError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::begin_transaction_span(0).entered();

        db.control("BEGIN")?;
        db.enter_transaction();
        Ok(Self {
            db,
            depth: 0,
            closed: false,
        })
    }

    /// Start a nested transaction backed by a savepoint
    ///
    /// The nested transaction borrows this one, so only one child is open at a time
    /// and this transaction cannot finish before it.
    ///
    /// # Errors
    ///
    /// Returns `TideError::TransactionClosed` if this transaction is closed, or the
    /// `SAVEPOINT` error.
    pub fn begin_nested(&mut self) -> Result<Transaction<'_>, TideError> {
        self.ensure_open()?;

        let depth = self.depth + 1;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::begin_transaction_span(depth).entered();

        self.db.control(&format!("SAVEPOINT sp_{depth}"))?;
        self.db.enter_transaction();
        Ok(Transaction {
            db: self.db,
            depth,
            closed: false,
        })
    }

    /// Commit the transaction, or release its savepoint when nested
    ///
    /// # Errors
    ///
    /// Returns `TideError::TransactionClosed` if already closed, or the backend error.
    pub fn commit(mut self) -> Result<(), TideError> {
        self.ensure_open()?;

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::commit_transaction_span(self.depth).entered();

        if self.depth == 0 {
            self.db.control("COMMIT")?;
        } else {
            self.db.control(&format!("RELEASE SAVEPOINT sp_{}", self.depth))?;
        }
        self.close();
        Ok(())
    }

    /// Discard the transaction's changes, or roll back to its savepoint when nested
    ///
    /// # Errors
    ///
    /// Returns `TideError::TransactionClosed` if already closed, or the backend error.
    pub fn rollback(mut self) -> Result<(), TideError> {
        self.ensure_open()?;
        let result = self.rollback_inner();
        self.close();
        result
    }

    fn rollback_inner(&self) -> Result<(), TideError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::rollback_transaction_span(self.depth).entered();

        if self.depth == 0 {
            self.db.control("ROLLBACK")
        } else {
            let savepoint = format!("sp_{}", self.depth);
            self.db.control(&format!(
                "ROLLBACK TO SAVEPOINT {savepoint}; RELEASE SAVEPOINT {savepoint}"
            ))
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.db.leave_transaction();
    }

    fn ensure_open(&self) -> Result<(), TideError> {
        if self.closed {
            Err(TideError::TransactionClosed)
        } else {
            Ok(())
        }
    }

    /// Nesting depth; `0` for a top-level transaction
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The database this transaction runs on
    pub fn database(&self) -> &'a Database {
        self.db
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.rollback_inner() {
            log::warn!("rollback of dropped transaction failed: {e}");
        }
        self.close();
    }
}

impl TideExecutor for Transaction<'_> {
    fn grammar(&self) -> Grammar {
        self.db.grammar()
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, TideError> {
        self.ensure_open()?;
        self.db.run_query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, TideError> {
        self.ensure_open()?;
        self.db.run_statement(sql, params, false)
    }

    fn insert_get_id(&self, sql: &str, params: &[Value]) -> Result<Value, TideError> {
        self.ensure_open()?;
        self.db.run_insert(sql, params, false)
    }

    fn supports_insert_get_id(&self) -> bool {
        self.db.supports_insert_get_id()
    }
}
