//! Ordered column-name → value map
//!
//! [`Row`] is both what queries return and what `insert`/`update` consume. Column
//! order is the order columns were inserted (or the order the statement projected
//! them), which keeps generated column lists and parameter arrays aligned.

use super::types::{ValueType, ValueTypeError};
use super::Value;

/// One result row, or one set of column assignments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `column` to `value`, replacing an existing cell with the same name in place
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    /// Builder form of [`Row::insert`]
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Look up a cell by column name
    ///
    /// An exact match wins; otherwise the first ASCII case-insensitive match is
    /// returned, since SQLite preserves the case the query used rather than the
    /// case the table was declared with.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .or_else(|| {
                self.cells
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(column))
            })
            .map(|(_, value)| value)
    }

    /// Look up a cell by position
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.cells.get(index).map(|(_, value)| value)
    }

    /// Read a cell and coerce it into `T`
    ///
    /// # Errors
    ///
    /// Returns `Ok(None)` when the column is absent, or [`ValueTypeError`] when the
    /// value cannot be coerced.
    pub fn try_get<T: ValueType>(&self, column: &str) -> Result<Option<T>, ValueTypeError> {
        self.get(column).cloned().map(T::from_value).transpose()
    }

    /// Remove a cell, returning its value
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let index = self.cells.iter().position(|(name, _)| name == column)?;
        Some(self.cells.remove(index).1)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    /// Values in column order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.cells.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Render the row as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.cells
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.into_iter()
    }
}
