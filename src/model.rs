//! Record mapping
//!
//! A record is a plain struct implementing [`Model`]. Instead of discovering fields at
//! run time, each model lists its persisted fields once as [`Attribute`]s, usually
//! through the [`attribute!`](crate::attribute) macro:
//!
//! ```
//! use tidewater::{attribute, Attribute, Model};
//!
//! #[derive(Debug, Clone, Default)]
//! struct User {
//!     id: Option<i64>,
//!     name: String,
//!     cache: String,
//! }
//!
//! impl Model for User {
//!     fn attributes() -> Vec<Attribute<Self>> {
//!         vec![
//!             attribute!(User, id => "ID"),
//!             attribute!(User, name),
//!             attribute!(User, cache).ignored(),
//!         ]
//!     }
//!
//!     fn primary_key() -> &'static str {
//!         "ID"
//!     }
//! }
//!
//! assert_eq!(User::table(), "users");
//! ```
//!
//! Persistence operations live on [`ActiveRecord`](crate::ActiveRecord) and
//! [`Relations`](crate::Relations), both implemented for every `Model`.

use crate::error::TideError;
use crate::value::{Row, Value, ValueTypeError};
use std::fmt;

/// One persisted field of a model
pub struct Attribute<M> {
    name: &'static str,
    column: Option<&'static str>,
    ignored: bool,
    get: fn(&M) -> Value,
    set: fn(&mut M, Value) -> Result<(), ValueTypeError>,
}

impl<M> Clone for Attribute<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Attribute<M> {}

impl<M> fmt::Debug for Attribute<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("ignored", &self.ignored)
            .finish()
    }
}

impl<M> Attribute<M> {
    /// Describe the field `name` through its accessor pair
    pub fn new(
        name: &'static str,
        get: fn(&M) -> Value,
        set: fn(&mut M, Value) -> Result<(), ValueTypeError>,
    ) -> Self {
        Self {
            name,
            column: None,
            ignored: false,
            get,
            set,
        }
    }

    /// Store the field under a column name different from the field name
    #[must_use]
    pub fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    /// Exclude the field from mapping in both directions
    #[must_use]
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Field name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Column the field maps to
    pub fn column_name(&self) -> &'static str {
        self.column.unwrap_or(self.name)
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// `true` if `key` is this field's name or its column override
    pub fn matches(&self, key: &str) -> bool {
        self.name == key || self.column == Some(key)
    }

    /// Read the field from `record`
    pub fn get(&self, record: &M) -> Value {
        (self.get)(record)
    }

    /// Coerce `value` and write it into `record`
    ///
    /// # Errors
    ///
    /// Returns `TideError::InvalidValueType` if the value does not fit the field.
    pub fn set(&self, record: &mut M, value: Value) -> Result<(), TideError> {
        (self.set)(record, value).map_err(|e| TideError::InvalidValueType {
            column: self.column_name().to_string(),
            expected: e.expected.to_string(),
            actual: e.actual,
        })
    }
}

/// Build an [`Attribute`] for a field whose type implements
/// [`ValueType`](crate::ValueType)
///
/// `attribute!(User, name)` maps `name` to the `name` column;
/// `attribute!(User, id => "ID")` maps `id` to the `ID` column.
#[macro_export]
macro_rules! attribute {
    ($model:ty, $field:ident) => {
        $crate::Attribute::<$model>::new(
            stringify!($field),
            |record: &$model| {
                $crate::ValueType::into_value(::std::clone::Clone::clone(&record.$field))
            },
            |record: &mut $model, value: $crate::Value| {
                record.$field = $crate::ValueType::from_value(value)?;
                Ok(())
            },
        )
    };
    ($model:ty, $field:ident => $column:expr) => {
        $crate::attribute!($model, $field).column($column)
    };
}

/// A record type persisted in one table
pub trait Model: Default + Clone + fmt::Debug + 'static {
    /// Every field of the model, in column order
    fn attributes() -> Vec<Attribute<Self>>;

    /// Table name; defaults to the pluralised, lower-cased type name
    fn table() -> String {
        make_plural(&Self::type_name().to_lowercase())
    }

    /// Primary key column; defaults to `id`
    fn primary_key() -> &'static str {
        "id"
    }

    /// Short type name, without module path or generics
    fn type_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }
}

/// Non-ignored attributes of `M`
pub fn mapped_attributes<M: Model>() -> Vec<Attribute<M>> {
    M::attributes().into_iter().filter(|a| !a.is_ignored()).collect()
}

/// Non-ignored attribute whose field name or column override is `key`
pub fn find_attribute<M: Model>(key: &str) -> Option<Attribute<M>> {
    mapped_attributes::<M>().into_iter().find(|a| a.matches(key))
}

/// The attribute holding `M`'s primary key
///
/// The field literally named like the primary key column wins; otherwise the field
/// whose column override equals it.
///
/// # Errors
///
/// Returns `TideError::Configuration` if no attribute resolves.
pub fn primary_attribute<M: Model>() -> Result<Attribute<M>, TideError> {
    let key = M::primary_key();
    let attributes = mapped_attributes::<M>();
    attributes
        .iter()
        .find(|a| a.name() == key)
        .or_else(|| attributes.iter().find(|a| a.column == Some(key)))
        .copied()
        .ok_or_else(|| {
            TideError::Configuration(format!(
                "Can't find field linked with primary key column {key} on {}",
                M::type_name()
            ))
        })
}

/// Primary key value of `record`
///
/// # Errors
///
/// Returns `TideError::Configuration` if the model has no primary key attribute.
pub fn primary_value<M: Model>(record: &M) -> Result<Value, TideError> {
    Ok(primary_attribute::<M>()?.get(record))
}

/// Build a record from a result row
///
/// Null cells leave the field at its default.
///
/// # Errors
///
/// Returns `TideError::ColumnNotFound` if a mapped column is absent from `row`, or
/// `TideError::InvalidValueType` if a value cannot be coerced.
pub fn map_row<M: Model>(row: &Row) -> Result<M, TideError> {
    let mut record = M::default();
    for attribute in mapped_attributes::<M>() {
        let column = attribute.column_name();
        let value = row
            .get(column)
            .ok_or_else(|| TideError::ColumnNotFound(column.to_string()))?;
        if value.is_null() {
            continue;
        }
        attribute.set(&mut record, value.clone())?;
    }
    Ok(record)
}

/// Column → value row for every non-ignored attribute of `record`, in attribute order
pub fn map_record<M: Model>(record: &M) -> Row {
    mapped_attributes::<M>()
        .into_iter()
        .map(|a| (a.column_name(), a.get(record)))
        .collect()
}

/// English plural of a lower-case noun, used for default table names
pub fn make_plural(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    if chars.len() <= 1 {
        return word.to_string();
    }
    let last = chars[chars.len() - 1];
    let before = chars[chars.len() - 2];
    let stem: String = chars[..chars.len() - 1].iter().collect();

    match last {
        's' | 'x' | 'z' => format!("{word}es"),
        'h' if before == 'c' || before == 's' => format!("{word}es"),
        'f' if is_consonant(before) => format!("{stem}ves"),
        'y' if is_consonant(before) => format!("{stem}ies"),
        _ => format!("{word}s"),
    }
}

fn is_consonant(c: char) -> bool {
    c.is_ascii_alphabetic() && !matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}
