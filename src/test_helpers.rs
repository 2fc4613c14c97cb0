//! Fixtures shared by unit and integration tests

use crate::connection::Database;
use crate::error::TideError;
use crate::listener::QueryListener;
use crate::value::Row;
use parking_lot::Mutex;
use std::ops::Deref;
use std::sync::Arc;

/// In-memory database created from a schema script, with a [`RecordingListener`]
/// attached
#[derive(Debug)]
pub struct TestDatabase {
    db: Database,
    listener: Arc<RecordingListener>,
}

impl TestDatabase {
    /// # Errors
    ///
    /// Returns `TideError` if the database cannot be opened or the schema fails.
    pub fn new(schema: &str) -> Result<Self, TideError> {
        Self::from_database(Database::open_in_memory()?, schema)
    }

    /// Wrap an already configured database and apply `schema` to it
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the schema fails.
    pub fn from_database(db: Database, schema: &str) -> Result<Self, TideError> {
        db.execute_batch(schema)?;
        let listener = Arc::new(RecordingListener::default());
        db.add_listener(listener.clone());
        Ok(Self { db, listener })
    }

    pub fn listener(&self) -> &RecordingListener {
        &self.listener
    }
}

impl Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Database {
        &self.db
    }
}

/// Listener that keeps every hook invocation
#[derive(Debug, Default)]
pub struct RecordingListener {
    queries: Mutex<Vec<String>>,
    row_counts: Mutex<Vec<usize>>,
    affected: Mutex<Vec<u64>>,
}

impl RecordingListener {
    /// Statements seen by `on_query`, oldest first
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    pub fn row_counts(&self) -> Vec<usize> {
        self.row_counts.lock().clone()
    }

    pub fn affected(&self) -> Vec<u64> {
        self.affected.lock().clone()
    }

    /// Statements seen so far whose text starts with `prefix`
    pub fn queries_starting_with(&self, prefix: &str) -> Vec<String> {
        self.queries
            .lock()
            .iter()
            .filter(|sql| sql.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.queries.lock().clear();
        self.row_counts.lock().clear();
        self.affected.lock().clear();
    }
}

impl QueryListener for RecordingListener {
    fn on_query(&self, sql: &str) {
        self.queries.lock().push(sql.to_string());
    }

    fn on_rows(&self, _sql: &str, rows: &[Row]) {
        self.row_counts.lock().push(rows.len());
    }

    fn on_affected(&self, _sql: &str, count: u64) {
        self.affected.lock().push(count);
    }
}
