//! Type conversion between `mysql_async` values and the driver-neutral row model.

use mysql_async::{Params, Value};

use bitrix_query::filter::FilterValue;
use bitrix_query::row::{Row, SqlValue};

/// Convert a FilterValue to a MySQL Value.
pub fn filter_value_to_mysql(value: &FilterValue) -> Value {
    match value {
        FilterValue::UInt(u) => Value::from(*u),
        FilterValue::String(s) => Value::from(s.as_str()),
    }
}

/// Positional statement parameters.
pub fn to_params(values: &[FilterValue]) -> Params {
    if values.is_empty() {
        Params::Empty
    } else {
        Params::Positional(values.iter().map(filter_value_to_mysql).collect())
    }
}

/// Convert a MySQL Value to a column value.
///
/// Temporal values are rendered the way the server prints them in text
/// results (`YYYY-MM-DD HH:MM:SS`), so records see the same strings either
/// protocol would produce.
pub fn mysql_value_to_sql(value: Value) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => SqlValue::Text(s),
            Err(e) => SqlValue::Bytes(e.into_bytes()),
        },
        Value::Int(i) => SqlValue::Int(i),
        Value::UInt(u) => SqlValue::UInt(u),
        Value::Float(f) => SqlValue::Float(f64::from(f)),
        Value::Double(d) => SqlValue::Float(d),
        Value::Date(year, month, day, hour, minute, second, micro) => {
            let mut text = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            );
            if micro != 0 {
                text.push_str(&format!(".{:06}", micro));
            }
            SqlValue::Text(text)
        }
        Value::Time(is_neg, days, hours, minutes, seconds, micro) => {
            let sign = if is_neg { "-" } else { "" };
            let mut text = format!(
                "{}{:02}:{:02}:{:02}",
                sign,
                days * 24 + u32::from(hours),
                minutes,
                seconds
            );
            if micro != 0 {
                text.push_str(&format!(".{:06}", micro));
            }
            SqlValue::Text(text)
        }
    }
}

/// Build a row from column names and driver values.
pub fn row_from_parts<I, S>(columns: I, values: Vec<Value>) -> Row
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    columns
        .into_iter()
        .zip(values)
        .map(|(name, value)| (Into::<String>::into(name), mysql_value_to_sql(value)))
        .collect()
}

/// Convert a driver row.
pub fn from_mysql_row(row: mysql_async::Row) -> Row {
    let columns = row.columns();
    let names: Vec<String> = columns.iter().map(|c| c.name_str().into_owned()).collect();
    row_from_parts(names, row.unwrap())
}
