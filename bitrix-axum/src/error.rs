//! HTTP error mapping.

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;
use tracing::{debug, error};

use bitrix_query::{ErrorKind, QueryError};

/// Errors returned by the route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An accessor failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A numeric path segment did not parse as an id.
    #[error("'{0}' is not a valid id")]
    InvalidId(String),

    /// A path segment does not address a resource on this route.
    #[error("no resource at '{0}'")]
    UnknownKey(String),
}

impl ApiError {
    /// The status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Query(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::InvalidFilter => StatusCode::BAD_REQUEST,
                ErrorKind::Query | ErrorKind::Decode => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownKey(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Query(e) if status.is_server_error() => {
                error!(
                    code = %e.code,
                    kind = e.kind().as_str(),
                    error = %e.display_full(),
                    "request failed"
                );
            }
            _ => debug!(status = status.as_u16(), error = %self, "request rejected"),
        }
        (status, self.to_string()).into_response()
    }
}

/// Result type for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(QueryError::not_found("ContentElement")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(QueryError::invalid_filter("LIMIT", "bad")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(QueryError::malformed_filter("expected value")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(QueryError::timeout(10_000)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(QueryError::missing_column("PRICE")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::InvalidId("1x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::UnknownKey("a b".into()).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_body_is_message() {
        let err = ApiError::from(QueryError::not_found("BasketItem"));
        let message = err.to_string();
        assert_eq!(message, QueryError::not_found("BasketItem").message);
    }
}
