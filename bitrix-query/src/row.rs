//! Driver-neutral result rows and typed column decoding.
//!
//! Engines convert whatever their driver returns into [`Row`]s of
//! [`SqlValue`]s. Records then pull typed columns out with [`Row::get`], which
//! goes through [`FromSqlValue`]. A missing column or a value that does not fit
//! the requested type is a decode error naming the column.
//!
//! ```rust
//! use bitrix_query::row::{Row, SqlValue};
//! use bitrix_query::value::NullInt64;
//!
//! let row = Row::new()
//!     .with("ID", 17i64)
//!     .with("PRICE", "10.50")
//!     .with("ORDER_ID", SqlValue::Null);
//!
//! assert_eq!(row.get::<u64>("ID").unwrap(), 17);
//! assert_eq!(row.get::<f64>("PRICE").unwrap(), 10.5);
//! assert!(!row.get::<NullInt64>("ORDER_ID").unwrap().is_present());
//! assert!(row.get::<u64>("SORT").is_err());
//! ```

use indexmap::IndexMap;

use crate::error::{QueryError, QueryResult};

/// A single column value as reported by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating point.
    Float(f64),
    /// Text, including DECIMAL and DATETIME values rendered by the driver.
    Text(String),
    /// Raw bytes that were not valid UTF-8.
    Bytes(Vec<u8>),
}

impl SqlValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Int(_) => "integer",
            Self::UInt(_) => "unsigned integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Conversion from a column value into a Rust type.
pub trait FromSqlValue: Sized {
    /// Convert the value of `column`.
    fn from_sql_value(column: &str, value: &SqlValue) -> QueryResult<Self>;
}

fn mismatch(column: &str, expected: &str, value: &SqlValue) -> QueryError {
    QueryError::type_mismatch(
        column,
        format!("expected {}, found {}", expected, value.type_name()),
    )
}

fn text_of<'a>(column: &str, value: &'a SqlValue) -> QueryResult<Option<&'a str>> {
    match value {
        SqlValue::Text(s) => Ok(Some(s.trim())),
        SqlValue::Bytes(b) => std::str::from_utf8(b)
            .map(|s| Some(s.trim()))
            .map_err(|_| QueryError::type_mismatch(column, "bytes are not valid UTF-8")),
        _ => Ok(None),
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(column: &str, value: &SqlValue) -> QueryResult<Self> {
        match value {
            SqlValue::Int(i) => Ok(*i),
            SqlValue::UInt(u) => {
                i64::try_from(*u).map_err(|_| mismatch(column, "signed integer", value))
            }
            _ => match text_of(column, value)? {
                Some(s) => s.parse().map_err(|_| mismatch(column, "integer", value)),
                None => Err(mismatch(column, "integer", value)),
            },
        }
    }
}

impl FromSqlValue for u64 {
    fn from_sql_value(column: &str, value: &SqlValue) -> QueryResult<Self> {
        match value {
            SqlValue::UInt(u) => Ok(*u),
            SqlValue::Int(i) => {
                u64::try_from(*i).map_err(|_| mismatch(column, "unsigned integer", value))
            }
            _ => match text_of(column, value)? {
                Some(s) => s.parse().map_err(|_| mismatch(column, "unsigned integer", value)),
                None => Err(mismatch(column, "unsigned integer", value)),
            },
        }
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(column: &str, value: &SqlValue) -> QueryResult<Self> {
        match value {
            SqlValue::Float(f) => Ok(*f),
            SqlValue::Int(i) => Ok(*i as f64),
            SqlValue::UInt(u) => Ok(*u as f64),
            _ => match text_of(column, value)? {
                Some(s) => s.parse().map_err(|_| mismatch(column, "number", value)),
                None => Err(mismatch(column, "number", value)),
            },
        }
    }
}

impl FromSqlValue for String {
    fn from_sql_value(column: &str, value: &SqlValue) -> QueryResult<Self> {
        match value {
            SqlValue::Text(s) => Ok(s.clone()),
            SqlValue::Bytes(b) => String::from_utf8(b.clone())
                .map_err(|_| QueryError::type_mismatch(column, "bytes are not valid UTF-8")),
            SqlValue::Int(i) => Ok(i.to_string()),
            SqlValue::UInt(u) => Ok(u.to_string()),
            SqlValue::Float(f) => Ok(f.to_string()),
            SqlValue::Null => Err(mismatch(column, "text", value)),
        }
    }
}

/// A result row: column names in select order, each with its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: IndexMap<String, SqlValue>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column append.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, value);
        self
    }

    /// Append a column. A repeated name replaces the earlier value.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.insert(column.into(), value.into());
    }

    /// Decode a column by name.
    pub fn get<T: FromSqlValue>(&self, column: &str) -> QueryResult<T> {
        let value = self
            .columns
            .get(column)
            .ok_or_else(|| QueryError::missing_column(column))?;
        T::from_sql_value(column, value)
    }

    /// Decode the first column, for single-column result sets.
    pub fn first<T: FromSqlValue>(&self) -> QueryResult<T> {
        let (column, value) = self
            .columns
            .get_index(0)
            .ok_or_else(|| QueryError::missing_column("#0"))?;
        T::from_sql_value(column, value)
    }

    /// The raw value of a column.
    pub fn raw(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate over columns in select order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Conversion from a result row into a record.
pub trait FromRow: Sized {
    /// Decode the record.
    fn from_row(row: &Row) -> QueryResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_integer_decoding() {
        assert_eq!(i64::from_sql_value("A", &SqlValue::Int(-3)).unwrap(), -3);
        assert_eq!(i64::from_sql_value("A", &SqlValue::UInt(3)).unwrap(), 3);
        assert_eq!(i64::from_sql_value("A", &SqlValue::Text(" 12 ".into())).unwrap(), 12);
        assert!(i64::from_sql_value("A", &SqlValue::UInt(u64::MAX)).is_err());
        assert!(u64::from_sql_value("A", &SqlValue::Int(-1)).is_err());
        assert!(u64::from_sql_value("A", &SqlValue::Float(1.0)).is_err());
    }

    #[test]
    fn test_decimal_text_decodes_as_float() {
        assert_eq!(f64::from_sql_value("PRICE", &SqlValue::Text("10.50".into())).unwrap(), 10.5);
        assert_eq!(f64::from_sql_value("PRICE", &SqlValue::Bytes(b"3.25".to_vec())).unwrap(), 3.25);
        assert_eq!(f64::from_sql_value("PRICE", &SqlValue::Int(4)).unwrap(), 4.0);
    }

    #[test]
    fn test_null_into_plain_scalar_is_decode_error() {
        let err = u64::from_sql_value("ID", &SqlValue::Null).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().contains("ID"));

        let err = String::from_sql_value("NAME", &SqlValue::Null).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_string_accepts_numbers() {
        assert_eq!(String::from_sql_value("X", &SqlValue::Int(5)).unwrap(), "5");
        assert!(String::from_sql_value("X", &SqlValue::Bytes(vec![0xff, 0xfe])).is_err());
    }

    #[test]
    fn test_row_lookup() {
        let row = Row::new().with("ID", 1i64).with("NAME", "Chair");
        assert_eq!(row.len(), 2);
        assert_eq!(row.get::<String>("NAME").unwrap(), "Chair");
        assert_eq!(row.first::<u64>().unwrap(), 1);

        let err = row.get::<String>("CODE").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(err.context.field.as_deref(), Some("CODE"));
    }

    #[test]
    fn test_row_preserves_select_order() {
        let row: Row = vec![("B", 2i64), ("A", 1i64)].into_iter().collect();
        let names: Vec<_> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_empty_row_first_fails() {
        assert!(Row::new().first::<u64>().is_err());
    }
}
