//! # Tidewater
//!
//! Synchronous SQL query builder and ActiveRecord-style record mapper over SQLite.
//!
//! - [`QueryBuilder`] compiles fluent query descriptions into parameterised SQL and
//!   runs them on any [`TideExecutor`]
//! - [`Model`] describes how a struct maps to a table; [`ActiveRecord`] and
//!   [`Relations`] add persistence and relationship accessors to every model
//! - [`Database`] is the SQLite executor, [`Transaction`] an explicit transaction on it
//!
//! ```no_run
//! use tidewater::{Order, QueryBuilder, TideError};
//!
//! # fn main() -> Result<(), TideError> {
//! let db = tidewater::connection()?;
//! let adults = QueryBuilder::table("users")
//!     .where_op("age", ">", 18)
//!     .order_by("name", Order::Asc)
//!     .get(db)?;
//! # Ok(())
//! # }
//! ```

pub mod active_model;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod listener;
pub mod metrics;
pub mod model;
pub mod query;
pub mod relation;
pub mod transaction;
pub mod value;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use active_model::ActiveRecord;
pub use config::DatabaseConfig;
pub use connection::{connection, init, Database};
pub use error::{ErrorKind, TideError};
pub use executor::{Outcome, StatementKind, TideExecutor};
pub use listener::{LogListener, QueryListener};
pub use model::{map_record, map_row, Attribute, Model};
pub use query::{Grammar, ModelQuery, Numeric, Order, QueryBuilder};
pub use relation::Relations;
pub use transaction::Transaction;
pub use value::{Row, Value, ValueType, ValueTypeError};
