//! Error types for query compilation, execution and row decoding.
//!
//! Every failure in the core carries an [`ErrorCode`]. Codes are grouped so that
//! callers can branch on the coarse [`ErrorKind`] without caring about the
//! specific cause:
//!
//! - 1xxx: filter errors (malformed document, rejected fragment)
//! - 2xxx: lookup errors (record not found)
//! - 3xxx: connection errors (connect, pool, timeout)
//! - 5xxx: execution errors (driver, statement timeout)
//! - 6xxx: decode errors (row does not fit the record shape)
//! - 9xxx: internal errors
//!
//! ```rust
//! use bitrix_query::{ErrorCode, ErrorKind, QueryError};
//!
//! let err = QueryError::not_found("ContentElement");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//!
//! let err = QueryError::invalid_filter("LIMIT", "expected digits");
//! assert_eq!(err.kind(), ErrorKind::InvalidFilter);
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Filter errors (1xxx)
    /// The filter document is not the expected shape (B1001).
    MalformedFilter = 1001,
    /// A LIMIT/ORDER/GROUP fragment failed its allow-list (B1002).
    InvalidFilter = 1002,

    // Lookup errors (2xxx)
    /// Record not found (B2001).
    RecordNotFound = 2001,

    // Connection errors (3xxx)
    /// Database connection failed (B3001).
    ConnectionFailed = 3001,
    /// Connection timeout (B3002).
    ConnectionTimeout = 3002,

    // Execution errors (5xxx)
    /// Statement exceeded its deadline (B5001).
    QueryTimeout = 5001,
    /// General database error (B5002).
    DatabaseError = 5002,

    // Decode errors (6xxx)
    /// Column missing from the result set (B6001).
    MissingColumn = 6001,
    /// Column value does not fit the declared type (B6002).
    TypeMismatch = 6002,

    // Internal errors (9xxx)
    /// Internal error (B9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "B2001").
    pub fn code(&self) -> String {
        format!("B{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MalformedFilter => "Malformed filter document",
            Self::InvalidFilter => "Invalid filter fragment",
            Self::RecordNotFound => "Record not found",
            Self::ConnectionFailed => "Database connection failed",
            Self::ConnectionTimeout => "Connection timeout",
            Self::QueryTimeout => "Query timeout",
            Self::DatabaseError => "Database error",
            Self::MissingColumn => "Missing column",
            Self::TypeMismatch => "Column type mismatch",
            Self::Internal => "Internal error",
        }
    }

    /// The coarse kind this code belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedFilter | Self::InvalidFilter => ErrorKind::InvalidFilter,
            Self::RecordNotFound => ErrorKind::NotFound,
            Self::MissingColumn | Self::TypeMismatch => ErrorKind::Decode,
            Self::ConnectionFailed
            | Self::ConnectionTimeout
            | Self::QueryTimeout
            | Self::DatabaseError
            | Self::Internal => ErrorKind::Query,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The four error kinds surfaced to callers of the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed filter document or a fragment rejected by its allow-list.
    InvalidFilter,
    /// Driver, connection or statement failure, including enrichment queries.
    Query,
    /// A single-record lookup matched zero rows.
    NotFound,
    /// A row did not fit the record shape. Schema/mapping mismatch.
    Decode,
}

impl ErrorKind {
    /// Name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidFilter => "invalid_filter",
            Self::Query => "query",
            Self::NotFound => "not_found",
            Self::Decode => "decode",
        }
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The resource involved.
    pub resource: Option<String>,
    /// The field or column involved.
    pub field: Option<String>,
    /// The SQL statement (if available).
    pub sql: Option<String>,
}

/// Errors that can occur during query operations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// The coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Set the resource.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.context.resource = Some(resource.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// The request body is not a valid filter document.
    pub fn malformed_filter(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::MalformedFilter,
            format!("malformed filter document: {}", message.into()),
        )
    }

    /// A LIMIT/ORDER/GROUP fragment was rejected.
    pub fn invalid_filter(fragment: impl Into<String>, message: impl Into<String>) -> Self {
        let fragment = fragment.into();
        Self::new(
            ErrorCode::InvalidFilter,
            format!("invalid {}: {}", fragment, message.into()),
        )
        .with_field(fragment)
    }

    /// A single-record lookup matched nothing.
    pub fn not_found(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("no {} record found matching the query", resource),
        )
        .with_resource(resource)
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConnectionFailed,
            format!("connection error: {}", message.into()),
        )
    }

    /// Create a connection timeout error.
    pub fn connection_timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::ConnectionTimeout,
            format!("connection timed out after {}ms", duration_ms),
        )
    }

    /// Create a statement timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::QueryTimeout,
            format!("query timed out after {}ms", duration_ms),
        )
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// A column expected by the record shape is absent from the row.
    pub fn missing_column(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::new(
            ErrorCode::MissingColumn,
            format!("column '{}' not found in result set", column),
        )
        .with_field(column)
    }

    /// A column value does not fit the declared type.
    pub fn type_mismatch(column: impl Into<String>, message: impl Into<String>) -> Self {
        let column = column.into();
        Self::new(
            ErrorCode::TypeMismatch,
            format!("cannot decode column '{}': {}", column, message.into()),
        )
        .with_field(column)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::Internal,
            format!("internal error: {}", message.into()),
        )
    }

    // ============== Error Checks ==============

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self.code, ErrorCode::QueryTimeout | ErrorCode::ConnectionTimeout)
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConnectionFailed | ErrorCode::ConnectionTimeout
        )
    }

    /// Display the error with its code and context, for logs.
    pub fn display_full(&self) -> String {
        let mut output = format!("Error [{}]: {}", self.code.code(), self.message);
        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("\n  while: {}", op));
        }
        if let Some(ref resource) = self.context.resource {
            output.push_str(&format!("\n  resource: {}", resource));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("\n  field: {}", field));
        }
        if let Some(ref sql) = self.context.sql {
            let sql_display = if sql.len() > 200 {
                let cut = sql
                    .char_indices()
                    .map(|(i, _)| i)
                    .take_while(|i| *i <= 200)
                    .last()
                    .unwrap_or(0);
                format!("{}...", &sql[..cut])
            } else {
                sql.clone()
            };
            output.push_str(&format!("\n  sql: {}", sql_display));
        }
        output
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed_filter(err.to_string()).with_source(err)
    }
}
