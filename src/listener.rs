//! Query listeners
//!
//! Listeners are registered on a [`Database`](crate::Database) and called around every
//! statement it runs. A listener that panics propagates to the caller.

use crate::value::Row;

/// Hooks invoked around statement execution
///
/// Every method has an empty default, so implementors override only what they need.
pub trait QueryListener: Send + Sync {
    /// Called before a statement is sent to the backend
    fn on_query(&self, _sql: &str) {}

    /// Called after a query produced `rows`
    fn on_rows(&self, _sql: &str, _rows: &[Row]) {}

    /// Called after a mutating statement affected `count` rows
    fn on_affected(&self, _sql: &str, _count: u64) {}
}

/// Listener forwarding every hook to the `log` facade at `debug` level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogListener;

impl QueryListener for LogListener {
    fn on_query(&self, sql: &str) {
        log::debug!("query: {sql}");
    }

    fn on_rows(&self, sql: &str, rows: &[Row]) {
        log::debug!("{} row(s) from: {sql}", rows.len());
    }

    fn on_affected(&self, sql: &str, count: u64) {
        log::debug!("{count} row(s) affected by: {sql}");
    }
}
