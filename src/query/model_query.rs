//! Builder bound to one record type
//!
//! [`ModelQuery`] wraps a [`QueryBuilder`] over `M::table()` and returns records
//! instead of rows. Raw `select`, joins, union and `insert` are left to
//! [`QueryBuilder`]; records are inserted through [`ActiveRecord`](crate::ActiveRecord).

use super::builder::{Numeric, Order, QueryBuilder};
use super::grammar::Grammar;
use crate::error::TideError;
use crate::executor::TideExecutor;
use crate::model::{map_row, Model};
use crate::value::{Row, Value};
use chrono::NaiveDate;
use std::fmt;
use std::marker::PhantomData;

/// Query over the table of `M`
///
/// # Examples
///
/// ```no_run
/// use tidewater::{attribute, ActiveRecord, Attribute, Database, Model, TideError};
///
/// #[derive(Debug, Clone, Default)]
/// struct Game {
///     id: Option<i64>,
///     score: i64,
/// }
///
/// impl Model for Game {
///     fn attributes() -> Vec<Attribute<Self>> {
///         vec![attribute!(Game, id), attribute!(Game, score)]
///     }
/// }
///
/// # fn main() -> Result<(), TideError> {
/// let db = Database::open_in_memory()?;
/// let best: Vec<Game> = Game::query().where_op("score", ">", 100).latest("score").take(3).get(&db)?;
/// # Ok(())
/// # }
/// ```
pub struct ModelQuery<M: Model> {
    builder: QueryBuilder,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Clone for ModelQuery<M> {
    fn clone(&self) -> Self {
        Self {
            builder: self.builder.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for ModelQuery<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelQuery")
            .field("model", &M::type_name())
            .field("builder", &self.builder)
            .finish()
    }
}

impl<M: Model> Default for ModelQuery<M> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! forward {
    ($($(#[$meta:meta])* $name:ident($($arg:ident: $ty:ty),*);)*) => {
        $(
            $(#[$meta])*
            #[must_use]
            pub fn $name(self, $($arg: $ty),*) -> Self {
                self.map(|b| b.$name($($arg),*))
            }
        )*
    };
}

impl<M: Model> ModelQuery<M> {
    pub fn new() -> Self {
        Self {
            builder: QueryBuilder::table(M::table()),
            _model: PhantomData,
        }
    }

    fn map(self, f: impl FnOnce(QueryBuilder) -> QueryBuilder) -> Self {
        Self {
            builder: f(self.builder),
            _model: PhantomData,
        }
    }

    /// Restrict to the record whose primary key is `id`
    #[must_use]
    pub fn where_id(self, id: impl Into<Value>) -> Self {
        self.map(|b| b.where_eq(M::primary_key(), id))
    }

    /// `column in (...)`; an empty set never matches
    #[must_use]
    pub fn where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.map(|b| b.where_in(column, values))
    }

    /// `column not in (...)`; an empty set always matches
    #[must_use]
    pub fn where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.map(|b| b.where_not_in(column, values))
    }

    forward! {
        distinct();
        where_op(column: &str, operator: &str, value: impl Into<Value>);
        where_eq(column: &str, value: impl Into<Value>);
        or_where_op(column: &str, operator: &str, value: impl Into<Value>);
        or_where_eq(column: &str, value: impl Into<Value>);
        where_like(column: &str, pattern: impl Into<Value>);
        where_between(column: &str, min: impl Numeric, max: impl Numeric);
        where_not_between(column: &str, min: impl Numeric, max: impl Numeric);
        where_null(column: &str);
        where_not_null(column: &str);
        where_date(column: &str, date: NaiveDate);
        where_date_op(column: &str, operator: &str, date: NaiveDate);
        where_year(column: &str, year: i32);
        where_year_op(column: &str, operator: &str, year: i32);
        where_month(column: &str, month: u32);
        where_month_op(column: &str, operator: &str, month: u32);
        where_day(column: &str, day: u32);
        where_day_op(column: &str, operator: &str, day: u32);
        where_column(first: &str, second: &str);
        where_column_op(first: &str, operator: &str, second: &str);
        where_has(column: &str);
        where_has_count(column: &str, count: i64);
        where_doesnt_have(column: &str);
        group_by(columns: &[&str]);
        having(column: &str, operator: &str, value: impl Into<Value>);
        having_raw(expression: &str);
        order_by(column: &str, order: Order);
        order_by_desc(column: &str);
        latest(column: &str);
        oldest(column: &str);
        in_random_order();
        skip(count: u64);
        offset(count: u64);
        take(count: u64);
        limit(count: u64);
        shared_lock();
        lock_for_update();
    }

    /// Compiled SQL and parameters under the default grammar
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        self.builder.to_sql()
    }

    pub fn to_sql_with(&self, grammar: Grammar) -> (String, Vec<Value>) {
        self.builder.to_sql_with(grammar)
    }

    /// Every matching record
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails or a row cannot be mapped.
    pub fn get<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<Vec<M>, TideError> {
        self.builder.get(exec)?.iter().map(map_row::<M>).collect()
    }

    /// First matching record
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails or the row cannot be mapped.
    pub fn first<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<Option<M>, TideError> {
        self.builder.first(exec)?.as_ref().map(map_row::<M>).transpose()
    }

    /// First matching record, or `TideError::NotFound`
    ///
    /// # Errors
    ///
    /// Returns `TideError::NotFound` when nothing matches.
    pub fn first_or_fail<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<M, TideError> {
        let table = self.builder.table_name().to_string();
        self.first(exec)?
            .ok_or_else(|| TideError::not_found(table, "query"))
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn count<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<i64, TideError> {
        self.builder.count(exec)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn max<E: TideExecutor + ?Sized>(self, exec: &E, column: &str) -> Result<Option<f64>, TideError> {
        self.builder.max(exec, column)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn min<E: TideExecutor + ?Sized>(self, exec: &E, column: &str) -> Result<Option<f64>, TideError> {
        self.builder.min(exec, column)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn avg<E: TideExecutor + ?Sized>(self, exec: &E, column: &str) -> Result<Option<f64>, TideError> {
        self.builder.avg(exec, column)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn sum<E: TideExecutor + ?Sized>(self, exec: &E, column: &str) -> Result<f64, TideError> {
        self.builder.sum(exec, column)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn exists<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<bool, TideError> {
        self.builder.exists(exec)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn doesnt_exist<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<bool, TideError> {
        self.builder.doesnt_exist(exec)
    }

    /// The values of `column`, one per matching record
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn pluck_list<E: TideExecutor + ?Sized>(self, exec: &E, column: &str) -> Result<Vec<Value>, TideError> {
        self.builder.pluck_list(exec, column)
    }

    /// `column` of the first matching record
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn value<E: TideExecutor + ?Sized>(self, exec: &E, column: &str) -> Result<Option<Value>, TideError> {
        self.builder.value(exec, column)
    }

    /// Apply `row` to every matching record
    ///
    /// # Errors
    ///
    /// Returns `TideError::InvalidQuery` for an empty row, or the execution error.
    pub fn update<E: TideExecutor + ?Sized>(self, exec: &E, row: &Row) -> Result<u64, TideError> {
        self.builder.update(exec, row)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the statement fails.
    pub fn increment<E: TideExecutor + ?Sized>(self, exec: &E, column: &str, amount: impl Numeric) -> Result<u64, TideError> {
        self.builder.increment(exec, column, amount)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the statement fails.
    pub fn decrement<E: TideExecutor + ?Sized>(self, exec: &E, column: &str, amount: impl Numeric) -> Result<u64, TideError> {
        self.builder.decrement(exec, column, amount)
    }

    /// Delete every matching row
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the statement fails.
    pub fn delete<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<u64, TideError> {
        self.builder.delete(exec)
    }

    /// Remove every row of the model's table, ignoring predicates
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the statement fails.
    pub fn truncate<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<u64, TideError> {
        self.builder.truncate(exec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute;
    use crate::model::Attribute;

    #[derive(Debug, Clone, Default)]
    struct Category {
        id: Option<i64>,
        title: String,
    }

    impl Model for Category {
        fn attributes() -> Vec<Attribute<Self>> {
            vec![attribute!(Category, id), attribute!(Category, title)]
        }
    }

    #[test]
    fn test_bound_to_model_table() {
        let (sql, params) = ModelQuery::<Category>::new()
            .where_like("title", "a%")
            .order_by("title", Order::Asc)
            .take(5)
            .to_sql();
        assert_eq!(
            sql,
            "select * from `categories` where `title` like ? order by `title` asc limit 5"
        );
        assert_eq!(params, vec![Value::from("a%")]);
    }

    #[test]
    fn test_where_id_uses_primary_key() {
        let (sql, params) = ModelQuery::<Category>::new().where_id(9).to_sql();
        assert_eq!(sql, "select * from `categories` where `id` = ?");
        assert_eq!(params, vec![Value::Integer(9)]);
    }

    #[test]
    fn test_get_maps_records() {
        let db = crate::Database::open_in_memory().unwrap();
        db.execute_batch(
            "create table categories (id integer primary key, title text);
             insert into categories (title) values ('books'), ('games'), ('music');",
        )
        .unwrap();

        let titles: Vec<String> = ModelQuery::<Category>::new()
            .where_in("title", ["games", "music"])
            .order_by_desc("title")
            .get(&db)
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["music", "games"]);

        let first = ModelQuery::<Category>::new().oldest("id").first(&db).unwrap().unwrap();
        assert_eq!(first.id, Some(1));

        // EDGE CASE: empty in-set matches nothing
        let none = ModelQuery::<Category>::new()
            .where_in("id", Vec::<i64>::new())
            .get(&db)
            .unwrap();
        assert!(none.is_empty());

        let err = ModelQuery::<Category>::new()
            .where_eq("title", "films")
            .first_or_fail(&db)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }
}
