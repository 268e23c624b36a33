//! Null-aware column wrappers.
//!
//! The catalog schema has nullable columns almost everywhere, and clients expect
//! every attribute in the JSON projection to be a plain scalar. The wrappers here
//! record whether the column was NULL and serialize the type's zero value in
//! that case, so the output never contains `null`.
//!
//! ```rust
//! use bitrix_query::value::{NullInt64, NullString, PlatformBool};
//!
//! let order_id = NullInt64::decode(0, true);
//! assert_eq!(serde_json::to_string(&order_id).unwrap(), "0");
//!
//! let code = NullString::new("chairs".to_string());
//! assert_eq!(serde_json::to_string(&code).unwrap(), "\"chairs\"");
//!
//! let active = PlatformBool::decode("N".to_string(), false);
//! assert_eq!(serde_json::to_string(&active).unwrap(), "false");
//! ```

use serde::{Serialize, Serializer};

use crate::row::{FromSqlValue, SqlValue};

/// A scalar read from a column that may be SQL NULL.
///
/// Immutable once decoded. When the column was NULL the JSON projection is
/// `T::default()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NullableValue<T> {
    value: T,
    present: bool,
}

/// Nullable signed integer column.
pub type NullInt64 = NullableValue<i64>;
/// Nullable unsigned integer column.
pub type NullUInt64 = NullableValue<u64>;
/// Nullable floating point column.
pub type NullFloat64 = NullableValue<f64>;
/// Nullable text column.
pub type NullString = NullableValue<String>;

impl<T: Default> NullableValue<T> {
    /// Build from a raw driver value and its nullability flag.
    ///
    /// When `was_null` is set the raw value is discarded.
    pub fn decode(raw: T, was_null: bool) -> Self {
        if was_null {
            Self::null()
        } else {
            Self::new(raw)
        }
    }

    /// A NULL column.
    pub fn null() -> Self {
        Self {
            value: T::default(),
            present: false,
        }
    }

    /// A non-NULL column.
    pub fn new(value: T) -> Self {
        Self {
            value,
            present: true,
        }
    }

    /// Whether the column held a value.
    pub fn is_present(&self) -> bool {
        self.present
    }

    /// The value, if the column was not NULL.
    pub fn get(&self) -> Option<&T> {
        self.present.then_some(&self.value)
    }

    /// The value, or the zero value for NULL.
    pub fn value_or_default(&self) -> T
    where
        T: Clone,
    {
        if self.present {
            self.value.clone()
        } else {
            T::default()
        }
    }

    /// Consume into an `Option`.
    pub fn into_option(self) -> Option<T> {
        self.present.then_some(self.value)
    }
}

impl<T: Default> From<Option<T>> for NullableValue<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::new(v),
            None => Self::null(),
        }
    }
}

impl<T: Serialize + Default> Serialize for NullableValue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.present {
            self.value.serialize(serializer)
        } else {
            T::default().serialize(serializer)
        }
    }
}

impl<T: FromSqlValue + Default> FromSqlValue for NullableValue<T> {
    fn from_sql_value(column: &str, value: &SqlValue) -> crate::QueryResult<Self> {
        match value {
            SqlValue::Null => Ok(Self::null()),
            other => T::from_sql_value(column, other).map(Self::new),
        }
    }
}

/// The platform's `"Y"`/`"N"` flag column.
///
/// Serializes to `false` only when the stored string is exactly `"N"`. Any other
/// string, and NULL, serializes to `true`. This is how the platform itself reads
/// these flags, so the mapping is one-way and intentionally lossy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlatformBool(NullString);

impl PlatformBool {
    /// Build from a raw string and its nullability flag.
    pub fn decode(raw: String, was_null: bool) -> Self {
        Self(NullString::decode(raw, was_null))
    }

    /// The boolean the platform would read from this flag.
    pub fn as_bool(&self) -> bool {
        self.0.get().map_or(true, |s| s != "N")
    }

    /// The stored flag, if the column was not NULL.
    pub fn raw(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }
}

impl From<&str> for PlatformBool {
    fn from(value: &str) -> Self {
        Self(NullString::new(value.to_string()))
    }
}

impl Serialize for PlatformBool {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(self.as_bool())
    }
}

impl FromSqlValue for PlatformBool {
    fn from_sql_value(column: &str, value: &SqlValue) -> crate::QueryResult<Self> {
        NullString::from_sql_value(column, value).map(Self)
    }
}
