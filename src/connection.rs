//! SQLite-backed [`TideExecutor`]
//!
//! [`Database`] owns a single `rusqlite` connection. Every statement runs under one
//! lock acquisition, wrapped (for mutating statements) in an implicit transaction
//! unless that is disabled or an explicit [`Transaction`] is open.
//!
//! A process-wide connection is available through [`connection`], initialised once
//! from [`DatabaseConfig::load`], or explicitly through [`init`].

use crate::config::DatabaseConfig;
use crate::error::TideError;
use crate::executor::TideExecutor;
use crate::listener::{LogListener, QueryListener};
use crate::query::Grammar;
use crate::transaction::Transaction;
use crate::value::{Row, Value};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

static CONNECTION: OnceCell<Database> = OnceCell::new();

/// The process-wide database, opened from [`DatabaseConfig::load`] on first use
///
/// Concurrent first calls are serialised; exactly one connection is opened.
///
/// # Errors
///
/// Returns `TideError` if the configuration cannot be loaded or the database cannot
/// be opened.
pub fn connection() -> Result<&'static Database, TideError> {
    CONNECTION.get_or_try_init(|| {
        let config = DatabaseConfig::load()?;
        Database::from_config(&config)
    })
}

/// Initialise the process-wide database from an explicit configuration
///
/// # Errors
///
/// Returns `TideError::Configuration` if the process-wide database was already
/// initialised, or the open error.
pub fn init(config: &DatabaseConfig) -> Result<&'static Database, TideError> {
    let mut opened = false;
    let db = CONNECTION.get_or_try_init(|| {
        opened = true;
        Database::from_config(config)
    })?;
    if opened {
        Ok(db)
    } else {
        Err(TideError::Configuration(
            "the process-wide connection is already initialised".to_string(),
        ))
    }
}

/// A SQLite database
pub struct Database {
    // Mutex is necessary since rusqlite::Connection isn't `Sync`
    conn: Mutex<Connection>,
    transactional: bool,
    insert_get_id: bool,
    listeners: RwLock<Vec<Arc<dyn QueryListener>>>,
    tx_depth: AtomicU32,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("transactional", &self.transactional)
            .field("insert_get_id", &self.insert_get_id)
            .field("listeners", &self.listeners.read().len())
            .field("tx_depth", &self.tx_depth.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Database {
    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            transactional: true,
            insert_get_id: true,
            listeners: RwLock::new(Vec::new()),
            tx_depth: AtomicU32::new(0),
        }
    }

    /// Open (or create) a database file
    ///
    /// # Errors
    ///
    /// Returns `TideError::Sqlite` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TideError> {
        let path = path.as_ref();
        log::info!("opening SQLite database at {}", path.display());
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// Open a private in-memory database
    ///
    /// # Errors
    ///
    /// Returns `TideError::Sqlite` if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, TideError> {
        log::info!("opening in-memory SQLite database");
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    /// Open the database described by `config`
    ///
    /// # Errors
    ///
    /// Returns `TideError::Sqlite` if the database cannot be opened.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, TideError> {
        let db = if config.path == ":memory:" {
            Self::open_in_memory()?
        } else {
            Self::open(&config.path)?
        }
        .with_transactions(config.transactional)
        .with_insert_get_id(config.insert_get_id);

        if config.log_queries {
            db.add_listener(Arc::new(LogListener));
        }
        Ok(db)
    }

    /// Enable or disable the implicit per-statement transaction
    #[must_use]
    pub fn with_transactions(mut self, enabled: bool) -> Self {
        self.transactional = enabled;
        self
    }

    /// Enable or disable generated-key retrieval on insert
    #[must_use]
    pub fn with_insert_get_id(mut self, enabled: bool) -> Self {
        self.insert_get_id = enabled;
        self
    }

    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    /// Register a listener called around every statement
    pub fn add_listener(&self, listener: Arc<dyn QueryListener>) {
        self.listeners.write().push(listener);
    }

    /// Run one or more `;`-separated statements without parameters, listeners or an
    /// implicit transaction. Meant for schema setup.
    ///
    /// # Errors
    ///
    /// Returns `TideError::Sqlite` if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<(), TideError> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Start an explicit transaction
    ///
    /// While it is open, statements on this database run inside it instead of in their
    /// own implicit transactions. Dropping it without committing rolls it back.
    ///
    /// # Errors
    ///
    /// Returns `TideError` if `BEGIN` fails, e.g. because another explicit
    /// transaction is already open.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tidewater::{Database, QueryBuilder, Row, TideError};
    ///
    /// # fn main() -> Result<(), TideError> {
    /// let db = Database::open_in_memory()?;
    /// let tx = db.begin()?;
    /// QueryBuilder::table("users").insert(&tx, &Row::new().with("name", "Ada"))?;
    /// tx.commit()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn begin(&self) -> Result<Transaction<'_>, TideError> {
        Transaction::new(self)
    }

    /// Run `f` inside an explicit transaction, committing on `Ok` and rolling back on
    /// `Err`
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or from `BEGIN` / `COMMIT`.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, TideError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, TideError>,
    {
        let tx = self.begin()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    log::warn!("rollback failed after error: {rollback_err}");
                }
                Err(err)
            }
        }
    }

    // ----- shared with Transaction -----

    pub(crate) fn control(&self, sql: &str) -> Result<(), TideError> {
        log::debug!("{sql}");
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    pub(crate) fn enter_transaction(&self) {
        self.tx_depth.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn leave_transaction(&self) {
        self.tx_depth.fetch_sub(1, Ordering::SeqCst);
    }

    fn in_transaction(&self) -> bool {
        self.tx_depth.load(Ordering::SeqCst) > 0
    }

    fn implicit(&self) -> bool {
        self.transactional && !self.in_transaction()
    }

    fn listeners(&self) -> Vec<Arc<dyn QueryListener>> {
        self.listeners.read().clone()
    }

    fn instrumented<T>(&self, sql: &str, run: impl FnOnce() -> Result<T, TideError>) -> Result<T, TideError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        let start = Instant::now();
        let result = run().map_err(|e| {
            #[cfg(feature = "metrics")]
            METRICS.record_query_error();
            log::debug!("statement failed: {sql}: {e}");
            e
        });

        let duration = start.elapsed();
        #[cfg(feature = "metrics")]
        METRICS.record_query_duration(duration);
        log::debug!("{sql} ({duration:?})");

        result
    }

    /// Run `f` under the connection lock, inside an implicit transaction when asked
    fn locked<T>(&self, implicit: bool, f: impl FnOnce(&Connection) -> Result<T, TideError>) -> Result<T, TideError> {
        let conn = self.conn.lock();
        if !implicit {
            return f(&conn);
        }

        conn.execute_batch("BEGIN")?;
        let result = f(&conn).and_then(|value| {
            conn.execute_batch("COMMIT")?;
            Ok(value)
        });
        if result.is_err() && !conn.is_autocommit() {
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                log::warn!("rollback failed: {e}");
            }
        }
        result
    }

    pub(crate) fn run_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, TideError> {
        let listeners = self.listeners();
        for listener in &listeners {
            listener.on_query(sql);
        }

        let rows = self.instrumented(sql, || {
            self.locked(false, |conn| {
                let mut stmt = conn.prepare(sql)?;
                let columns: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();
                let mut rows = stmt.query(params_from_iter(params.iter()))?;

                let mut result = Vec::new();
                while let Some(row) = rows.next()? {
                    let mut cells = Row::new();
                    for (index, name) in columns.iter().enumerate() {
                        cells.insert(name.clone(), Value::from_sql_ref(row.get_ref(index)?));
                    }
                    result.push(cells);
                }
                Ok(result)
            })
        })?;

        for listener in &listeners {
            listener.on_rows(sql, &rows);
        }
        Ok(rows)
    }

    pub(crate) fn run_statement(&self, sql: &str, params: &[Value], implicit: bool) -> Result<u64, TideError> {
        let listeners = self.listeners();
        for listener in &listeners {
            listener.on_query(sql);
        }

        let count = self.instrumented(sql, || {
            self.locked(implicit, |conn| {
                let affected = conn.execute(sql, params_from_iter(params.iter()))?;
                Ok(affected as u64)
            })
        })?;

        for listener in &listeners {
            listener.on_affected(sql, count);
        }
        Ok(count)
    }

    pub(crate) fn run_insert(&self, sql: &str, params: &[Value], implicit: bool) -> Result<Value, TideError> {
        let listeners = self.listeners();
        for listener in &listeners {
            listener.on_query(sql);
        }

        let id = self.instrumented(sql, || {
            self.locked(implicit, |conn| {
                let affected = conn.execute(sql, params_from_iter(params.iter()))?;
                if affected == 0 {
                    return Err(TideError::Execution(
                        "Insertion failed: no row was inserted".to_string(),
                    ));
                }
                Ok(Value::Integer(conn.last_insert_rowid()))
            })
        })?;

        for listener in &listeners {
            listener.on_affected(sql, 1);
        }
        Ok(id)
    }
}

impl TideExecutor for Database {
    fn grammar(&self) -> Grammar {
        Grammar::Sqlite
    }

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, TideError> {
        self.run_query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, TideError> {
        self.run_statement(sql, params, self.implicit())
    }

    fn insert_get_id(&self, sql: &str, params: &[Value]) -> Result<Value, TideError> {
        self.run_insert(sql, params, self.implicit())
    }

    fn supports_insert_get_id(&self) -> bool {
        self.insert_get_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::RecordingListener;

    fn database() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.execute_batch("create table notes (id integer primary key autoincrement, body text not null unique)")
            .unwrap();
        db
    }

    #[test]
    fn test_execute_and_query() {
        let db = database();
        let affected = db
            .execute("insert into notes (body) values (?)", &[Value::from("hello")])
            .unwrap();
        assert_eq!(affected, 1);

        let rows = db.query_all("select id, body from notes", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("body"), Some(&Value::from("hello")));
        assert_eq!(rows[0].get("id"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_failed_statement_is_rolled_back() {
        let db = database();
        db.execute("insert into notes (body) values (?)", &[Value::from("a")]).unwrap();

        // EDGE CASE: unique violation inside the implicit transaction
        let err = db
            .execute("insert into notes (body) values (?)", &[Value::from("a")])
            .unwrap_err();
        assert!(matches!(err, TideError::Sqlite(_)));

        // connection is usable again and not stuck inside a transaction
        db.execute("insert into notes (body) values (?)", &[Value::from("b")]).unwrap();
        assert_eq!(db.query_all("select * from notes", &[]).unwrap().len(), 2);
    }

    #[test]
    fn test_insert_get_id() {
        let db = database();
        let id = db
            .insert_get_id("insert into notes (body) values (?)", &[Value::from("x")])
            .unwrap();
        assert_eq!(id, Value::Integer(1));

        let id = db
            .insert_get_id("insert into notes (body) values (?)", &[Value::from("y")])
            .unwrap();
        assert_eq!(id, Value::Integer(2));
    }

    #[test]
    fn test_insert_get_id_without_inserted_row() {
        let db = database();
        let err = db
            .insert_get_id("insert or ignore into notes (body) select body from notes", &[])
            .unwrap_err();
        assert!(matches!(err, TideError::Execution(_)));
    }

    #[test]
    fn test_run_classifies_statement() {
        let db = database();
        let outcome = db
            .run("INSERT INTO notes (body) VALUES (?)", &[Value::from("z")])
            .unwrap();
        assert_eq!(outcome, crate::Outcome::Affected(1));

        match db.run("select body from notes", &[]).unwrap() {
            crate::Outcome::Rows(rows) => assert_eq!(rows.len(), 1),
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn test_listeners_are_notified() {
        let db = database();
        let listener = Arc::new(RecordingListener::default());
        db.add_listener(listener.clone());

        db.execute("insert into notes (body) values (?)", &[Value::from("a")]).unwrap();
        db.query_all("select * from notes", &[]).unwrap();

        assert_eq!(
            listener.queries(),
            vec![
                "insert into notes (body) values (?)".to_string(),
                "select * from notes".to_string()
            ]
        );
        assert_eq!(listener.affected(), vec![1]);
        assert_eq!(listener.row_counts(), vec![1]);
    }

    #[test]
    fn test_from_config_flags() {
        let config = DatabaseConfig {
            path: ":memory:".to_string(),
            transactional: false,
            insert_get_id: false,
            log_queries: true,
        };
        let db = Database::from_config(&config).unwrap();
        assert!(!db.is_transactional());
        assert!(!db.supports_insert_get_id());
        assert_eq!(db.listeners().len(), 1);
    }

    #[test]
    fn test_file_backed_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");
        {
            let db = Database::open(&path).unwrap();
            db.execute_batch("create table notes (body text)").unwrap();
            db.execute("insert into notes (body) values (?)", &[Value::from("kept")]).unwrap();
        }
        let db = Database::open(&path).unwrap();
        let rows = db.query_all("select body from notes", &[]).unwrap();
        assert_eq!(rows[0].get("body"), Some(&Value::from("kept")));
    }

    #[test]
    fn test_process_wide_connection_initialises_once() {
        let config = DatabaseConfig {
            path: ":memory:".to_string(),
            ..DatabaseConfig::default()
        };
        let first = init(&config).unwrap();
        let second = connection().unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(matches!(init(&config), Err(TideError::Configuration(_))));
    }
}
