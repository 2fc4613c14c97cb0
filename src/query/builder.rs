//! Fluent SQL query builder
//!
//! A [`QueryBuilder`] accumulates a query description and compiles it on demand.
//! Fluent methods take `self` and return it; terminal methods consume the builder and
//! run the compiled statement on a [`TideExecutor`].
//!
//! # Examples
//!
//! ```
//! use tidewater::{Order, QueryBuilder, Value};
//!
//! let (sql, params) = QueryBuilder::table("users")
//!     .where_op("age", ">", 18)
//!     .order_by("name", Order::Asc)
//!     .limit(10)
//!     .to_sql();
//!
//! assert_eq!(sql, "select * from `users` where `age` > ? order by `name` asc limit 10");
//! assert_eq!(params, vec![Value::Integer(18)]);
//! ```

use super::disambiguate::disambiguate;
use super::grammar::{DatePart, Grammar, Lock};
use crate::error::TideError;
use crate::executor::TideExecutor;
use crate::value::{Row, Value};
use chrono::NaiveDate;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

/// Numbers accepted by range predicates and increments
///
/// Every accepted type is rendered as an `f64` literal.
pub trait Numeric: Copy {
    fn to_f64(self) -> f64;
}

macro_rules! numeric {
    ($($t:ty),*) => {
        $(
            impl Numeric for $t {
                #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

numeric!(i32, i64, u32, f32, f64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boolean {
    And,
    Or,
}

#[derive(Debug, Clone)]
enum Predicate {
    Compare { column: String, operator: String },
    Between { column: String, min: f64, max: f64, negated: bool },
    In { column: String, count: usize, negated: bool },
    Constant(bool),
    Null { column: String, negated: bool },
    Date { column: String, operator: String },
    DatePart { part: DatePart, column: String, operator: String, value: i64 },
    Columns { first: String, operator: String, second: String },
}

impl Predicate {
    fn to_sql(&self, grammar: Grammar) -> String {
        match self {
            Predicate::Compare { column, operator } => format!("{} {operator} ?", quote(column)),
            Predicate::Between {
                column,
                min,
                max,
                negated,
            } => {
                let not = if *negated { "not " } else { "" };
                format!("{} {not}between {min} and {max}", quote(column))
            }
            Predicate::In {
                column,
                count,
                negated,
            } => {
                let not = if *negated { "not " } else { "" };
                let placeholders = vec!["?"; *count].join(", ");
                format!("{} {not}in ({placeholders})", quote(column))
            }
            Predicate::Constant(true) => "1 = 1".to_string(),
            Predicate::Constant(false) => "0 = 1".to_string(),
            Predicate::Null { column, negated } => {
                let not = if *negated { "not " } else { "" };
                format!("{} is {not}null", quote(column))
            }
            Predicate::Date { column, operator } => {
                format!("date({}) {operator} ?", quote(column))
            }
            Predicate::DatePart {
                part,
                column,
                operator,
                value,
            } => format!("{} {operator} {value}", grammar.date_part(*part, &quote(column))),
            Predicate::Columns {
                first,
                operator,
                second,
            } => format!("{} {operator} {}", quote(first), quote(second)),
        }
    }
}

#[derive(Debug, Clone)]
enum HavingPart {
    Compare { column: String, operator: String },
    Raw(String),
}

#[derive(Debug, Clone)]
enum OrderTerm {
    Column(String, Order),
    Expression(String, Order),
    Random,
}

#[derive(Debug, Clone, Copy)]
enum JoinKind {
    Inner,
    Left,
    Cross,
}

#[derive(Debug, Clone)]
struct Join {
    kind: JoinKind,
    table: String,
    on: Option<(String, String, String)>,
}

impl Join {
    fn to_sql(&self) -> String {
        let keyword = match self.kind {
            JoinKind::Inner => "inner join",
            JoinKind::Left => "left join",
            JoinKind::Cross => "cross join",
        };
        match &self.on {
            Some((first, operator, second)) => format!(
                "{keyword} {} on {} {operator} {}",
                quote(&self.table),
                quote(first),
                quote(second)
            ),
            None => format!("{keyword} {}", quote(&self.table)),
        }
    }
}

fn quote(identifier: &str) -> String {
    format!("`{identifier}`")
}

/// Fluent builder for one query against one table
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    columns: Vec<String>,
    distinct: bool,
    join: Option<Join>,
    wheres: Vec<(Boolean, Predicate)>,
    where_params: Vec<Value>,
    groups: Vec<String>,
    havings: Vec<HavingPart>,
    having_params: Vec<Value>,
    orders: Vec<OrderTerm>,
    limit: Option<u64>,
    offset: Option<u64>,
    lock: Option<Lock>,
    union: Option<Box<QueryBuilder>>,
}

impl QueryBuilder {
    /// Start a query against `table`
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: vec!["*".to_string()],
            distinct: false,
            join: None,
            wheres: Vec::new(),
            where_params: Vec::new(),
            groups: Vec::new(),
            havings: Vec::new(),
            having_params: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            lock: None,
            union: None,
        }
    }

    /// Target table
    pub fn table_name(&self) -> &str {
        &self.table
    }

    // ----- selection -----

    /// Replace the selected columns; `distinct` is kept
    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = if columns.is_empty() {
            vec!["*".to_string()]
        } else {
            columns.iter().map(ToString::to_string).collect()
        };
        self
    }

    /// Append a column to the selection
    #[must_use]
    pub fn add_select(mut self, column: &str) -> Self {
        self.columns.push(column.to_string());
        self
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    // ----- where -----

    fn push_where(mut self, boolean: Boolean, predicate: Predicate) -> Self {
        self.wheres.push((boolean, predicate));
        self
    }

    fn push_compare(mut self, boolean: Boolean, column: &str, operator: &str, value: Value) -> Self {
        self.where_params.push(value);
        self.push_where(
            boolean,
            Predicate::Compare {
                column: column.to_string(),
                operator: operator.to_string(),
            },
        )
    }

    /// `and`-joined `column operator ?`
    #[must_use]
    pub fn where_op(self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.push_compare(Boolean::And, column, operator, value.into())
    }

    /// `and`-joined `column = ?`
    #[must_use]
    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.where_op(column, "=", value)
    }

    /// `or`-joined `column operator ?`
    ///
    /// Called before any `and` predicate this does not emit the `where` keyword, so the
    /// compiled SQL is invalid. Start a chain with a `where_*` method.
    #[must_use]
    pub fn or_where_op(self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.push_compare(Boolean::Or, column, operator, value.into())
    }

    /// `or`-joined `column = ?`
    #[must_use]
    pub fn or_where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.or_where_op(column, "=", value)
    }

    /// Shorthand for `where_eq("id", id)`
    ///
    /// The column is always `id`; [`ModelQuery::where_id`](crate::ModelQuery::where_id)
    /// uses the model's primary key instead.
    #[must_use]
    pub fn where_id(self, id: impl Into<Value>) -> Self {
        self.where_eq("id", id)
    }

    #[must_use]
    pub fn where_like(self, column: &str, pattern: impl Into<Value>) -> Self {
        self.where_op(column, "like", pattern)
    }

    /// Inclusive range; the bounds are written into the SQL, not bound
    #[must_use]
    pub fn where_between(self, column: &str, min: impl Numeric, max: impl Numeric) -> Self {
        self.push_where(
            Boolean::And,
            Predicate::Between {
                column: column.to_string(),
                min: min.to_f64(),
                max: max.to_f64(),
                negated: false,
            },
        )
    }

    #[must_use]
    pub fn where_not_between(self, column: &str, min: impl Numeric, max: impl Numeric) -> Self {
        self.push_where(
            Boolean::And,
            Predicate::Between {
                column: column.to_string(),
                min: min.to_f64(),
                max: max.to_f64(),
                negated: true,
            },
        )
    }

    fn push_in<I, V>(mut self, column: &str, values: I, negated: bool) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            // `in ()` is not valid SQL
            return self.push_where(Boolean::And, Predicate::Constant(negated));
        }
        let count = values.len();
        self.where_params.extend(values);
        self.push_where(
            Boolean::And,
            Predicate::In {
                column: column.to_string(),
                count,
                negated,
            },
        )
    }

    /// `column in (?, ...)`; an empty set never matches
    #[must_use]
    pub fn where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(column, values, false)
    }

    /// `column not in (?, ...)`; an empty set always matches
    #[must_use]
    pub fn where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_in(column, values, true)
    }

    #[must_use]
    pub fn where_null(self, column: &str) -> Self {
        self.push_where(
            Boolean::And,
            Predicate::Null {
                column: column.to_string(),
                negated: false,
            },
        )
    }

    #[must_use]
    pub fn where_not_null(self, column: &str) -> Self {
        self.push_where(
            Boolean::And,
            Predicate::Null {
                column: column.to_string(),
                negated: true,
            },
        )
    }

    #[must_use]
    pub fn where_date(self, column: &str, date: NaiveDate) -> Self {
        self.where_date_op(column, "=", date)
    }

    /// `date(column) operator ?`, binding the ISO date string
    #[must_use]
    pub fn where_date_op(mut self, column: &str, operator: &str, date: NaiveDate) -> Self {
        self.where_params.push(Value::Text(date.to_string()));
        self.push_where(
            Boolean::And,
            Predicate::Date {
                column: column.to_string(),
                operator: operator.to_string(),
            },
        )
    }

    fn push_date_part(self, part: DatePart, column: &str, operator: &str, value: i64) -> Self {
        self.push_where(
            Boolean::And,
            Predicate::DatePart {
                part,
                column: column.to_string(),
                operator: operator.to_string(),
                value,
            },
        )
    }

    #[must_use]
    pub fn where_year(self, column: &str, year: i32) -> Self {
        self.where_year_op(column, "=", year)
    }

    #[must_use]
    pub fn where_year_op(self, column: &str, operator: &str, year: i32) -> Self {
        self.push_date_part(DatePart::Year, column, operator, i64::from(year))
    }

    #[must_use]
    pub fn where_month(self, column: &str, month: u32) -> Self {
        self.where_month_op(column, "=", month)
    }

    #[must_use]
    pub fn where_month_op(self, column: &str, operator: &str, month: u32) -> Self {
        self.push_date_part(DatePart::Month, column, operator, i64::from(month))
    }

    #[must_use]
    pub fn where_day(self, column: &str, day: u32) -> Self {
        self.where_day_op(column, "=", day)
    }

    #[must_use]
    pub fn where_day_op(self, column: &str, operator: &str, day: u32) -> Self {
        self.push_date_part(DatePart::Day, column, operator, i64::from(day))
    }

    /// Compare two columns for equality
    #[must_use]
    pub fn where_column(self, first: &str, second: &str) -> Self {
        self.where_column_op(first, "=", second)
    }

    #[must_use]
    pub fn where_column_op(self, first: &str, operator: &str, second: &str) -> Self {
        self.push_where(
            Boolean::And,
            Predicate::Columns {
                first: first.to_string(),
                operator: operator.to_string(),
                second: second.to_string(),
            },
        )
    }

    /// `column >= 1`, for count-like columns
    #[must_use]
    pub fn where_has(self, column: &str) -> Self {
        self.where_op(column, ">=", 1)
    }

    /// `column = count`
    #[must_use]
    pub fn where_has_count(self, column: &str, count: i64) -> Self {
        self.where_op(column, "=", count)
    }

    /// `column = 0`
    #[must_use]
    pub fn where_doesnt_have(self, column: &str) -> Self {
        self.where_op(column, "=", 0)
    }

    // ----- grouping and ordering -----

    /// Replace the group-by column list
    #[must_use]
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.groups = columns.iter().map(ToString::to_string).collect();
        self
    }

    /// `and`-joined `column operator ?` in the having clause
    #[must_use]
    pub fn having(mut self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.having_params.push(value.into());
        self.havings.push(HavingPart::Compare {
            column: column.to_string(),
            operator: operator.to_string(),
        });
        self
    }

    /// Replace the having clause, and its bound values, with a raw expression
    #[must_use]
    pub fn having_raw(mut self, expression: &str) -> Self {
        self.having_params.clear();
        self.havings = vec![HavingPart::Raw(expression.to_string())];
        self
    }

    /// Append an ordering; expressions containing `(` are written unquoted
    #[must_use]
    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        let term = if column.contains('(') {
            OrderTerm::Expression(column.to_string(), order)
        } else {
            OrderTerm::Column(column.to_string(), order)
        };
        self.orders.push(term);
        self
    }

    #[must_use]
    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(column, Order::Desc)
    }

    #[must_use]
    pub fn latest(self, column: &str) -> Self {
        self.order_by(column, Order::Desc)
    }

    #[must_use]
    pub fn oldest(self, column: &str) -> Self {
        self.order_by(column, Order::Asc)
    }

    #[must_use]
    pub fn in_random_order(mut self) -> Self {
        self.orders.push(OrderTerm::Random);
        self
    }

    // ----- paging and locking -----

    #[must_use]
    pub fn skip(self, count: u64) -> Self {
        self.offset(count)
    }

    #[must_use]
    pub fn offset(mut self, count: u64) -> Self {
        self.offset = Some(count);
        self
    }

    #[must_use]
    pub fn take(self, count: u64) -> Self {
        self.limit(count)
    }

    #[must_use]
    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(count);
        self
    }

    #[must_use]
    pub fn shared_lock(mut self) -> Self {
        self.lock = Some(Lock::Shared);
        self
    }

    #[must_use]
    pub fn lock_for_update(mut self) -> Self {
        self.lock = Some(Lock::Update);
        self
    }

    // ----- joins and unions -----

    /// Inner join; replaces any previous join
    #[must_use]
    pub fn join(mut self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join = Some(Join {
            kind: JoinKind::Inner,
            table: table.to_string(),
            on: Some((first.to_string(), operator.to_string(), second.to_string())),
        });
        self
    }

    /// Left join; replaces any previous join
    #[must_use]
    pub fn left_join(mut self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join = Some(Join {
            kind: JoinKind::Left,
            table: table.to_string(),
            on: Some((first.to_string(), operator.to_string(), second.to_string())),
        });
        self
    }

    /// Cross join; replaces any previous join
    #[must_use]
    pub fn cross_join(mut self, table: &str) -> Self {
        self.join = Some(Join {
            kind: JoinKind::Cross,
            table: table.to_string(),
            on: None,
        });
        self
    }

    /// Combine with another query; its bound values follow this query's
    #[must_use]
    pub fn union(mut self, other: QueryBuilder) -> Self {
        self.union = Some(Box::new(other));
        self
    }

    // ----- compilation -----

    /// Compile for the default grammar without executing
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        self.to_sql_with(Grammar::default())
    }

    /// Compile for `grammar` without executing
    pub fn to_sql_with(&self, grammar: Grammar) -> (String, Vec<Value>) {
        self.compile_query(grammar, None, false)
    }

    fn params(&self) -> Vec<Value> {
        self.where_params
            .iter()
            .chain(&self.having_params)
            .cloned()
            .collect()
    }

    fn where_sql(&self, grammar: Grammar) -> String {
        let mut sql = String::new();
        for (index, (boolean, predicate)) in self.wheres.iter().enumerate() {
            let keyword = match (index, boolean) {
                (0, Boolean::And) => "where",
                (_, Boolean::And) => "and",
                (_, Boolean::Or) => "or",
            };
            sql.push(' ');
            sql.push_str(keyword);
            sql.push(' ');
            sql.push_str(&predicate.to_sql(grammar));
        }
        sql
    }

    fn select_sql(&self, grammar: Grammar, selection: Option<&str>, limit: Option<u64>) -> String {
        let mut parts: Vec<String> = vec!["select".to_string()];
        match selection {
            Some(selection) => parts.push(selection.to_string()),
            None => {
                if self.distinct {
                    parts.push("distinct".to_string());
                }
                let columns: Vec<String> = self
                    .columns
                    .iter()
                    .map(|c| if c == "*" { c.clone() } else { quote(c) })
                    .collect();
                parts.push(columns.join(", "));
            }
        }
        parts.push(format!("from {}", quote(&self.table)));
        if let Some(join) = &self.join {
            parts.push(join.to_sql());
        }
        parts.push(self.where_sql(grammar));
        if !self.groups.is_empty() {
            let groups: Vec<String> = self.groups.iter().map(|g| quote(g)).collect();
            parts.push(format!("group by {}", groups.join(", ")));
        }
        if !self.havings.is_empty() {
            let havings: Vec<String> = self
                .havings
                .iter()
                .map(|part| match part {
                    HavingPart::Compare { column, operator } => {
                        format!("{} {operator} ?", quote(column))
                    }
                    HavingPart::Raw(expression) => expression.clone(),
                })
                .collect();
            parts.push(format!("having {}", havings.join(" and ")));
        }
        if !self.orders.is_empty() {
            let orders: Vec<String> = self
                .orders
                .iter()
                .map(|term| match term {
                    OrderTerm::Column(column, order) => format!("{} {}", quote(column), order.as_sql()),
                    OrderTerm::Expression(expression, order) => {
                        format!("{expression} {}", order.as_sql())
                    }
                    OrderTerm::Random => grammar.random_function().to_string(),
                })
                .collect();
            parts.push(format!("order by {}", orders.join(", ")));
        }
        parts.push(grammar.limit_offset(limit, self.offset));
        if let Some(lock) = self.lock {
            parts.push(grammar.lock_clause(lock).to_string());
        }
        parts.join(" ")
    }

    fn compile_query(&self, grammar: Grammar, selection: Option<&str>, first: bool) -> (String, Vec<Value>) {
        let limit = if first && self.union.is_none() {
            Some(1)
        } else {
            self.limit
        };
        let mut sql = disambiguate(&self.select_sql(grammar, selection, limit));
        let mut params = self.params();

        if let Some(other) = &self.union {
            let (other_sql, other_params) = other.compile_query(grammar, None, false);
            sql = grammar.union(&sql, &other_sql);
            if first {
                sql.push_str(" limit 1");
            }
            params.extend(other_params);
        }

        (sql, params)
    }

    /// Compile an insert of `row`; the parameters are the row's values in order
    ///
    /// # Errors
    ///
    /// Returns `TideError::InvalidQuery` for an empty row.
    pub fn insert_sql(&self, row: &Row) -> Result<(String, Vec<Value>), TideError> {
        if row.is_empty() {
            return Err(TideError::InvalidQuery(format!(
                "cannot insert an empty row into {}",
                self.table
            )));
        }
        let columns: Vec<String> = row.columns().map(quote).collect();
        let placeholders = vec!["?"; row.len()].join(", ");
        let sql = format!(
            "insert into {} ({}) values ({placeholders})",
            quote(&self.table),
            columns.join(", ")
        );
        Ok((disambiguate(&sql), row.values().cloned().collect()))
    }

    /// Compile an update; assignment values come before the predicate values
    ///
    /// # Errors
    ///
    /// Returns `TideError::InvalidQuery` for an empty row.
    pub fn update_sql(&self, grammar: Grammar, row: &Row) -> Result<(String, Vec<Value>), TideError> {
        if row.is_empty() {
            return Err(TideError::InvalidQuery(format!(
                "cannot update {} with an empty row",
                self.table
            )));
        }
        let assignments: Vec<String> = row.columns().map(|c| format!("{} = ?", quote(c))).collect();
        let sql = format!(
            "update {} set {}{}",
            quote(&self.table),
            assignments.join(", "),
            self.where_sql(grammar)
        );
        let mut params: Vec<Value> = row.values().cloned().collect();
        params.extend(self.where_params.iter().cloned());
        Ok((disambiguate(&sql), params))
    }

    /// Compile a delete of every row matching the predicates
    pub fn delete_sql(&self, grammar: Grammar) -> (String, Vec<Value>) {
        let sql = format!("delete from {}{}", quote(&self.table), self.where_sql(grammar));
        (disambiguate(&sql), self.where_params.clone())
    }

    fn step_sql(&self, grammar: Grammar, column: &str, sign: char, amount: f64) -> (String, Vec<Value>) {
        let column = quote(column);
        let sql = format!(
            "update {} set {column} = {column} {sign} {amount}{}",
            quote(&self.table),
            self.where_sql(grammar)
        );
        (disambiguate(&sql), self.where_params.clone())
    }

    // ----- terminals -----

    /// Run the query and return every row
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn get<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<Vec<Row>, TideError> {
        let (sql, params) = self.compile_query(exec.grammar(), None, false);
        exec.query_all(&sql, &params)
    }

    /// Run the query limited to one row
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn first<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<Option<Row>, TideError> {
        let (sql, params) = self.compile_query(exec.grammar(), None, true);
        exec.query_one(&sql, &params)
    }

    /// Rows holding only `column`
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn pluck<E: TideExecutor + ?Sized>(self, exec: &E, column: &str) -> Result<Vec<Row>, TideError> {
        let (sql, params) = self.compile_query(exec.grammar(), Some(quote(column).as_str()), false);
        exec.query_all(&sql, &params)
    }

    /// The values of `column`, one per row
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn pluck_list<E: TideExecutor + ?Sized>(self, exec: &E, column: &str) -> Result<Vec<Value>, TideError> {
        Ok(self
            .pluck(exec, column)?
            .into_iter()
            .filter_map(|row| row.into_iter().next().map(|(_, value)| value))
            .collect())
    }

    /// `column` of the first row; `None` when no row matches
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn value<E: TideExecutor + ?Sized>(self, exec: &E, column: &str) -> Result<Option<Value>, TideError> {
        let (sql, params) = self.compile_query(exec.grammar(), Some(quote(column).as_str()), true);
        Ok(exec
            .query_one(&sql, &params)?
            .and_then(|row| row.get_index(0).cloned()))
    }

    fn aggregate<E: TideExecutor + ?Sized>(self, exec: &E, expression: &str) -> Result<Value, TideError> {
        let selection = format!("{expression} as aggregate");
        let (sql, params) = self.compile_query(exec.grammar(), Some(selection.as_str()), false);
        Ok(exec
            .query_one(&sql, &params)?
            .and_then(|row| row.get("aggregate").cloned())
            .unwrap_or(Value::Null))
    }

    /// Number of matching rows; replaces the selection
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn count<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<i64, TideError> {
        Ok(self.aggregate(exec, "count(*)")?.as_i64().unwrap_or(0))
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn max<E: TideExecutor + ?Sized>(self, exec: &E, column: &str) -> Result<Option<f64>, TideError> {
        Ok(self.aggregate(exec, &format!("max({})", quote(column)))?.as_f64())
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn min<E: TideExecutor + ?Sized>(self, exec: &E, column: &str) -> Result<Option<f64>, TideError> {
        Ok(self.aggregate(exec, &format!("min({})", quote(column)))?.as_f64())
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn avg<E: TideExecutor + ?Sized>(self, exec: &E, column: &str) -> Result<Option<f64>, TideError> {
        Ok(self.aggregate(exec, &format!("avg({})", quote(column)))?.as_f64())
    }

    /// Sum of `column`; `0.0` when no row matches
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn sum<E: TideExecutor + ?Sized>(self, exec: &E, column: &str) -> Result<f64, TideError> {
        Ok(self
            .aggregate(exec, &format!("sum({})", quote(column)))?
            .as_f64()
            .unwrap_or(0.0))
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn exists<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<bool, TideError> {
        Ok(self.count(exec)? > 0)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    pub fn doesnt_exist<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<bool, TideError> {
        Ok(!self.exists(exec)?)
    }

    /// Insert `row` and return the number of rows inserted
    ///
    /// # Errors
    ///
    /// Returns `TideError::InvalidQuery` for an empty row, or the execution error.
    pub fn insert<E: TideExecutor + ?Sized>(self, exec: &E, row: &Row) -> Result<u64, TideError> {
        let (sql, params) = self.insert_sql(row)?;
        exec.execute(&sql, &params)
    }

    /// Insert `row` and return the key the backend generated for it
    ///
    /// # Errors
    ///
    /// Returns `TideError::Unsupported` when the executor cannot report generated keys,
    /// `TideError::InvalidQuery` for an empty row, or the execution error.
    pub fn insert_get_id<E: TideExecutor + ?Sized>(self, exec: &E, row: &Row) -> Result<Value, TideError> {
        if !exec.supports_insert_get_id() {
            return Err(TideError::Unsupported(
                "insert_get_id is disabled for this executor".to_string(),
            ));
        }
        let (sql, params) = self.insert_sql(row)?;
        exec.insert_get_id(&sql, &params)
    }

    /// Apply `row` to every matching row
    ///
    /// # Errors
    ///
    /// Returns `TideError::InvalidQuery` for an empty row, or the execution error.
    pub fn update<E: TideExecutor + ?Sized>(self, exec: &E, row: &Row) -> Result<u64, TideError> {
        let (sql, params) = self.update_sql(exec.grammar(), row)?;
        exec.execute(&sql, &params)
    }

    /// # Errors
    ///
    /// Returns `TideError` if the statement fails.
    pub fn delete<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<u64, TideError> {
        let (sql, params) = self.delete_sql(exec.grammar());
        exec.execute(&sql, &params)
    }

    /// `column = column + amount` on every matching row
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the statement fails.
    pub fn increment<E: TideExecutor + ?Sized>(self, exec: &E, column: &str, amount: impl Numeric) -> Result<u64, TideError> {
        let (sql, params) = self.step_sql(exec.grammar(), column, '+', amount.to_f64());
        exec.execute(&sql, &params)
    }

    /// `column = column - amount` on every matching row
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the statement fails.
    pub fn decrement<E: TideExecutor + ?Sized>(self, exec: &E, column: &str, amount: impl Numeric) -> Result<u64, TideError> {
        let (sql, params) = self.step_sql(exec.grammar(), column, '-', amount.to_f64());
        exec.execute(&sql, &params)
    }

    /// Remove every row of the table
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the statement fails.
    pub fn truncate<E: TideExecutor + ?Sized>(self, exec: &E) -> Result<u64, TideError> {
        let sql = exec.grammar().truncate(&self.table);
        exec.execute(&sql, &[])
    }
}
