//! Error types for MySQL operations.

use std::time::Duration;

use bitrix_query::error::QueryError;
use thiserror::Error;

/// Result type for MySQL operations.
pub type MysqlResult<T> = Result<T, MysqlError>;

/// Error type for MySQL operations.
#[derive(Debug, Error)]
pub enum MysqlError {
    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql_async::Error),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
    /// Pool error.
    #[error("pool error: {0}")]
    Pool(String),
    /// No connection became available in time.
    #[error("no connection available within {}ms", .0.as_millis())]
    AcquireTimeout(Duration),
    /// A statement ran past its deadline.
    #[error("statement timed out after {}ms", .0.as_millis())]
    QueryTimeout(Duration),
}

impl MysqlError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a pool error.
    pub fn pool(msg: impl Into<String>) -> Self {
        Self::Pool(msg.into())
    }
}

impl From<MysqlError> for QueryError {
    fn from(err: MysqlError) -> Self {
        match err {
            MysqlError::Mysql(e) => match e {
                mysql_async::Error::Io(_) => QueryError::connection(e.to_string()),
                other => QueryError::database(other.to_string()),
            },
            MysqlError::Config(msg) => QueryError::internal(format!("config: {}", msg)),
            MysqlError::Pool(msg) => QueryError::connection(msg),
            MysqlError::AcquireTimeout(d) => QueryError::connection_timeout(d.as_millis() as u64),
            MysqlError::QueryTimeout(d) => QueryError::timeout(d.as_millis() as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitrix_query::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = MysqlError::config("invalid url");
        assert_eq!(err.to_string(), "configuration error: invalid url");
        assert_eq!(
            MysqlError::QueryTimeout(Duration::from_millis(1500)).to_string(),
            "statement timed out after 1500ms"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: QueryError = MysqlError::QueryTimeout(Duration::from_secs(2)).into();
        assert!(err.is_timeout());
        assert_eq!(err.kind(), ErrorKind::Query);
        assert!(err.to_string().contains("2000ms"));

        let err: QueryError = MysqlError::AcquireTimeout(Duration::from_secs(1)).into();
        assert!(err.is_connection_error());

        let err: QueryError = MysqlError::pool("exhausted").into();
        assert_eq!(err.kind(), ErrorKind::Query);
    }
}
