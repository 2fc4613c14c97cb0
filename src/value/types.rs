//! ValueType trait for coercing between Rust field types and [`Value`]
//!
//! Reading a row back into a record is lenient in the way SQL drivers are: numbers
//! widen and narrow (with overflow checks), anything can be stringified, and
//! temporal fields accept dates, timestamps, epoch milliseconds or text.
//!
//! ## Usage
//!
//! ```rust
//! use tidewater::{Value, ValueType};
//!
//! let value = 42i32.into_value();
//! assert_eq!(value, Value::Integer(42));
//!
//! let parsed = i16::from_value(Value::Text("12".into())).unwrap();
//! assert_eq!(parsed, 12);
//! ```

use super::{Value, DATE_FORMAT};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::fmt;

/// Error returned when a [`Value`] cannot be coerced into a Rust type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueTypeError {
    /// The Rust type that was requested
    pub expected: &'static str,
    /// Debug rendering of the value that was supplied
    pub actual: String,
}

impl ValueTypeError {
    pub(crate) fn new(expected: &'static str, actual: &Value) -> Self {
        Self {
            expected,
            actual: format!("{actual:?}"),
        }
    }
}

impl fmt::Display for ValueTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type mismatch: expected {}, got {}", self.expected, self.actual)
    }
}

impl std::error::Error for ValueTypeError {}

/// Trait for mapping Rust types to and from [`Value`].
///
/// Every attribute type a [`Model`](crate::Model) exposes must implement this trait.
/// `Option<T>` maps `None` to [`Value::Null`] and back.
pub trait ValueType: Sized {
    /// Convert this value into a [`Value`].
    fn into_value(self) -> Value;

    /// Coerce a [`Value`] into this type.
    ///
    /// # Errors
    ///
    /// Returns [`ValueTypeError`] if the value's variant cannot represent this type,
    /// or a numeric conversion would overflow.
    fn from_value(value: Value) -> Result<Self, ValueTypeError>;
}

macro_rules! integer_value_type {
    ($($t:ty),*) => {
        $(
            impl ValueType for $t {
                fn into_value(self) -> Value {
                    Value::from(self)
                }

                fn from_value(value: Value) -> Result<Self, ValueTypeError> {
                    let err = || ValueTypeError::new(stringify!($t), &value);
                    match &value {
                        Value::Integer(_) | Value::Bool(_) | Value::Real(_) => value
                            .as_i64()
                            .and_then(|i| <$t>::try_from(i).ok())
                            .ok_or_else(err),
                        Value::Text(s) => s.trim().parse::<$t>().map_err(|_| err()),
                        _ => Err(err()),
                    }
                }
            }
        )*
    };
}

integer_value_type!(i8, i16, i32, i64, u8, u16, u32, u64);

impl ValueType for f64 {
    fn into_value(self) -> Value {
        Value::Real(self)
    }

    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        value
            .as_f64()
            .ok_or_else(|| ValueTypeError::new("f64", &value))
    }
}

impl ValueType for f32 {
    fn into_value(self) -> Value {
        Value::Real(f64::from(self))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        value
            .as_f64()
            .map(|f| f as f32)
            .ok_or_else(|| ValueTypeError::new("f32", &value))
    }
}

impl ValueType for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        match &value {
            Value::Bool(b) => Ok(*b),
            Value::Integer(i) => Ok(*i != 0),
            Value::Real(f) => Ok(*f != 0.0),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => Ok(true),
                "false" | "f" | "0" | "no" => Ok(false),
                _ => Err(ValueTypeError::new("bool", &value)),
            },
            _ => Err(ValueTypeError::new("bool", &value)),
        }
    }
}

impl ValueType for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Blob(b) => String::from_utf8(b)
                .map_err(|e| ValueTypeError::new("String", &Value::Blob(e.into_bytes()))),
            Value::Null => Err(ValueTypeError::new("String", &Value::Null)),
            other => Ok(other.to_string()),
        }
    }
}

impl ValueType for Vec<u8> {
    fn into_value(self) -> Value {
        Value::Blob(self)
    }

    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        match value {
            Value::Blob(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(ValueTypeError::new("Vec<u8>", &other)),
        }
    }
}

fn timestamp_from_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

impl ValueType for NaiveDateTime {
    fn into_value(self) -> Value {
        Value::Timestamp(self)
    }

    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        let converted = match &value {
            Value::Timestamp(t) => Some(*t),
            Value::Date(d) => Some(d.and_time(NaiveTime::MIN)),
            Value::Integer(ms) => timestamp_from_millis(*ms),
            Value::Text(s) => parse_timestamp(s),
            _ => None,
        };
        converted.ok_or_else(|| ValueTypeError::new("NaiveDateTime", &value))
    }
}

impl ValueType for NaiveDate {
    fn into_value(self) -> Value {
        Value::Date(self)
    }

    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        let converted = match &value {
            Value::Date(d) => Some(*d),
            Value::Timestamp(t) => Some(t.date()),
            Value::Integer(ms) => timestamp_from_millis(*ms).map(|t| t.date()),
            Value::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .ok()
                .or_else(|| parse_timestamp(s).map(|t| t.date())),
            _ => None,
        };
        converted.ok_or_else(|| ValueTypeError::new("NaiveDate", &value))
    }
}

impl ValueType for DateTime<Utc> {
    fn into_value(self) -> Value {
        Value::Timestamp(self.naive_utc())
    }

    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        NaiveDateTime::from_value(value)
            .map(|t| t.and_utc())
            .map_err(|e| ValueTypeError {
                expected: "DateTime<Utc>",
                actual: e.actual,
            })
    }
}

impl ValueType for serde_json::Value {
    fn into_value(self) -> Value {
        match self {
            serde_json::Value::Null => Value::Null,
            other => Value::Text(other.to_string()),
        }
    }

    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        match &value {
            Value::Text(s) => {
                serde_json::from_str(s).map_err(|_| ValueTypeError::new("serde_json::Value", &value))
            }
            other => Ok(other.to_json()),
        }
    }
}

impl ValueType for Value {
    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        Ok(value)
    }
}

impl<T: ValueType> ValueType for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, ValueType::into_value)
    }

    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}
