//! Ordering and paging types used by compiled queries.

use std::fmt;

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Parse a direction keyword, ignoring ASCII case.
    pub fn parse(keyword: &str) -> Option<Self> {
        if keyword.eq_ignore_ascii_case("ASC") {
            Some(Self::Asc)
        } else if keyword.eq_ignore_ascii_case("DESC") {
            Some(Self::Desc)
        } else {
            None
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Order by specification for a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByField {
    /// The column name to order by.
    pub column: String,
    /// The sort order.
    pub order: SortOrder,
}

impl OrderByField {
    /// Create a new order by field.
    pub fn new(column: impl Into<String>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }

    /// Create an ascending order.
    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Asc)
    }

    /// Create a descending order.
    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Desc)
    }

    /// Write the SQL directly to a buffer.
    ///
    /// ```rust
    /// use bitrix_query::types::OrderByField;
    ///
    /// let field = OrderByField::desc("SORT");
    /// let mut buffer = String::from("ORDER BY ");
    /// field.write_sql(&mut buffer);
    /// assert_eq!(buffer, "ORDER BY SORT DESC");
    /// ```
    #[inline]
    pub fn write_sql(&self, buffer: &mut String) {
        buffer.push_str(&self.column);
        buffer.push(' ');
        buffer.push_str(self.order.as_sql());
    }
}

/// A validated LIMIT clause: `LIMIT count` or `LIMIT offset, count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    /// Rows to skip.
    pub offset: Option<u64>,
    /// Rows to return.
    pub count: u64,
}

impl Limit {
    /// A plain row cap.
    pub const fn new(count: u64) -> Self {
        Self {
            offset: None,
            count,
        }
    }

    /// A row cap after skipping `offset` rows.
    pub const fn with_offset(offset: u64, count: u64) -> Self {
        Self {
            offset: Some(offset),
            count,
        }
    }

    /// Generate the SQL for this clause.
    pub fn to_sql(&self) -> String {
        match self.offset {
            Some(offset) => format!("LIMIT {}, {}", offset, self.count),
            None => format!("LIMIT {}", self.count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("asc"), Some(SortOrder::Asc));
        assert_eq!(SortOrder::parse("DESC"), Some(SortOrder::Desc));
        assert_eq!(SortOrder::parse("DESC;"), None);
    }

    #[test]
    fn test_limit_sql() {
        assert_eq!(Limit::new(100).to_sql(), "LIMIT 100");
        assert_eq!(Limit::with_offset(20, 10).to_sql(), "LIMIT 20, 10");
    }
}
