//! Record lifecycle
//!
//! [`ActiveRecord`] is implemented for every [`Model`]. It persists records through
//! any [`TideExecutor`]: a [`Database`](crate::Database), the process-wide
//! [`connection()`](crate::connection()), or an open [`Transaction`](crate::Transaction).
//!
//! # Example
//!
//! ```no_run
//! use tidewater::{attribute, ActiveRecord, Attribute, Database, Model, TideError};
//!
//! #[derive(Debug, Clone, Default)]
//! struct User {
//!     id: Option<i64>,
//!     name: String,
//! }
//!
//! impl Model for User {
//!     fn attributes() -> Vec<Attribute<Self>> {
//!         vec![attribute!(User, id), attribute!(User, name)]
//!     }
//! }
//!
//! # fn main() -> Result<(), TideError> {
//! let db = Database::open_in_memory()?;
//! let mut user = User { id: None, name: "Alice".into() };
//! user.save(&db)?; // insert, `user.id` now holds the generated key
//!
//! user.name = "Alicia".into();
//! user.save(&db)?; // update
//!
//! let found = User::find_or_fail(&db, user.id)?;
//! assert_eq!(found.name, "Alicia");
//! # Ok(())
//! # }
//! ```

use crate::error::TideError;
use crate::executor::TideExecutor;
use crate::model::{map_record, primary_attribute, Model};
use crate::query::{ModelQuery, QueryBuilder};
use crate::value::{Row, Value};

/// Persistence operations available on every model
pub trait ActiveRecord: Model {
    /// Typed query over this model's table
    fn query() -> ModelQuery<Self> {
        ModelQuery::new()
    }

    /// Insert the record if no row holds its primary key, otherwise update that row
    ///
    /// After an insert the generated primary key is copied back into `self`. An
    /// update never touches the primary key column.
    ///
    /// # Errors
    ///
    /// Returns `TideError::Configuration` if the primary key column is not mapped, or
    /// the execution error.
    fn save<E: TideExecutor + ?Sized>(&mut self, exec: &E) -> Result<(), TideError> {
        let pk = Self::primary_key();
        let mut row = map_record(self);
        let pk_value = take_column(&mut row, pk).ok_or_else(|| {
            TideError::Configuration(format!(
                "Primary key column {pk} is not mapped on {}",
                Self::type_name()
            ))
        })?;

        let exists = !pk_value.is_null()
            && QueryBuilder::table(Self::table())
                .where_eq(pk, pk_value.clone())
                .exists(exec)?;

        if exists {
            if row.is_empty() {
                return Ok(());
            }
            log::debug!("updating {} {pk_value}", Self::type_name());
            QueryBuilder::table(Self::table())
                .where_eq(pk, pk_value)
                .update(exec, &row)?;
        } else {
            let created = Self::create(exec, self)?;
            let attribute = primary_attribute::<Self>()?;
            attribute.set(self, attribute.get(&created))?;
        }
        Ok(())
    }

    /// [`save`](ActiveRecord::save) returning the record
    ///
    /// # Errors
    ///
    /// See [`save`](ActiveRecord::save).
    fn update_or_create<E: TideExecutor + ?Sized>(&mut self, exec: &E) -> Result<&Self, TideError> {
        self.save(exec)?;
        Ok(self)
    }

    /// Insert `record` and return it as stored
    ///
    /// With a null primary key and an executor reporting generated keys, the key
    /// column is left out of the insert and the row is read back by the generated
    /// key. Otherwise the row is located by its primary key when one was given, or
    /// by every other inserted column, newest primary key first. That last lookup can
    /// pick up a concurrent insert of identical data.
    ///
    /// # Errors
    ///
    /// Returns `TideError::NotFound` if the inserted row cannot be located again, or
    /// the execution error.
    fn create<E: TideExecutor + ?Sized>(exec: &E, record: &Self) -> Result<Self, TideError> {
        let pk = Self::primary_key();
        let mut row = map_record(record);
        let pk_value = row.get(pk).cloned().unwrap_or(Value::Null);
        let builder = QueryBuilder::table(Self::table());

        if pk_value.is_null() && exec.supports_insert_get_id() {
            take_column(&mut row, pk);
            let id = builder.insert_get_id(exec, &row)?;
            log::debug!("created {} {id}", Self::type_name());
            return Self::find_or_fail(exec, id);
        }

        builder.insert(exec, &row)?;

        let located = if pk_value.is_null() {
            let mut query = Self::query();
            for (column, value) in row.iter() {
                if column.eq_ignore_ascii_case(pk) {
                    continue;
                }
                query = if value.is_null() {
                    query.where_null(column)
                } else {
                    query.where_eq(column, value)
                };
            }
            query.order_by_desc(pk).first(exec)?
        } else {
            Self::find(exec, pk_value.clone())?
        };

        located.ok_or_else(|| TideError::not_found(Self::table(), pk_value))
    }

    /// Record whose primary key is `id`
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails or the row cannot be mapped.
    fn find<E: TideExecutor + ?Sized>(exec: &E, id: impl Into<Value>) -> Result<Option<Self>, TideError> {
        Self::query().where_id(id).first(exec)
    }

    /// Records for each of `ids` that exist, in the order given
    ///
    /// # Errors
    ///
    /// Returns `TideError` if a query fails.
    fn find_many<E, I, V>(exec: &E, ids: I) -> Result<Vec<Self>, TideError>
    where
        E: TideExecutor + ?Sized,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut found = Vec::new();
        for id in ids {
            if let Some(record) = Self::find(exec, id)? {
                found.push(record);
            }
        }
        Ok(found)
    }

    /// # Errors
    ///
    /// Returns `TideError::NotFound` when no row holds `id`.
    fn find_or_fail<E: TideExecutor + ?Sized>(exec: &E, id: impl Into<Value>) -> Result<Self, TideError> {
        let id = id.into();
        Self::find(exec, id.clone())?.ok_or_else(|| TideError::not_found(Self::table(), id))
    }

    /// # Errors
    ///
    /// Returns `TideError::NotFound` for the first id without a row.
    fn find_many_or_fail<E, I, V>(exec: &E, ids: I) -> Result<Vec<Self>, TideError>
    where
        E: TideExecutor + ?Sized,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        ids.into_iter().map(|id| Self::find_or_fail(exec, id)).collect()
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    fn all<E: TideExecutor + ?Sized>(exec: &E) -> Result<Vec<Self>, TideError> {
        Self::query().get(exec)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    fn first<E: TideExecutor + ?Sized>(exec: &E) -> Result<Option<Self>, TideError> {
        Self::query().first(exec)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    fn count<E: TideExecutor + ?Sized>(exec: &E) -> Result<i64, TideError> {
        Self::query().count(exec)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    fn max<E: TideExecutor + ?Sized>(exec: &E, column: &str) -> Result<Option<f64>, TideError> {
        Self::query().max(exec, column)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    fn min<E: TideExecutor + ?Sized>(exec: &E, column: &str) -> Result<Option<f64>, TideError> {
        Self::query().min(exec, column)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    fn avg<E: TideExecutor + ?Sized>(exec: &E, column: &str) -> Result<Option<f64>, TideError> {
        Self::query().avg(exec, column)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    fn sum<E: TideExecutor + ?Sized>(exec: &E, column: &str) -> Result<f64, TideError> {
        Self::query().sum(exec, column)
    }

    /// Delete the rows holding each of `ids`; returns the total deleted
    ///
    /// # Errors
    ///
    /// Returns `TideError` if a delete fails.
    fn destroy<E, I, V>(exec: &E, ids: I) -> Result<u64, TideError>
    where
        E: TideExecutor + ?Sized,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut deleted = 0;
        for id in ids {
            deleted += Self::query().where_id(id).delete(exec)?;
        }
        Ok(deleted)
    }

    /// Delete this record's row
    ///
    /// # Errors
    ///
    /// Returns `TideError::Configuration` if the primary key column is not mapped,
    /// `TideError::NullPrimaryKey` if the key is null, or the execution error.
    fn delete<E: TideExecutor + ?Sized>(&self, exec: &E) -> Result<u64, TideError> {
        let pk = Self::primary_key();
        let mut row = map_record(self);
        let pk_value = take_column(&mut row, pk).ok_or_else(|| {
            TideError::Configuration(format!(
                "Primary key column {pk} is not mapped on {}",
                Self::type_name()
            ))
        })?;
        if pk_value.is_null() {
            return Err(TideError::NullPrimaryKey(pk.to_string()));
        }
        Self::query().where_id(pk_value).delete(exec)
    }
}

impl<M: Model> ActiveRecord for M {}

/// Remove `column` from `row`, matching its name case-insensitively
fn take_column(row: &mut Row, column: &str) -> Option<Value> {
    let key = row
        .columns()
        .find(|c| c.eq_ignore_ascii_case(column))?
        .to_string();
    row.remove(&key)
}
