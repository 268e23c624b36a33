//! Axum routes for the Bitrix catalog REST service.
//!
//! Maps the resource accessors of `bitrix-resources` onto the service's URL
//! scheme and maps accessor errors onto HTTP statuses:
//!
//! | error kind | status |
//! |---|---|
//! | `NotFound` | 404 |
//! | `InvalidFilter` | 400 |
//! | `Query`, `Decode` | 500 |
//!
//! Error bodies are the error message as `text/plain`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//!
//! use bitrix_resources::{ResourceSettings, Resources};
//!
//! let resources = Resources::new(engine, ResourceSettings::default());
//! let app = bitrix_axum::app(resources, Duration::from_secs(30));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:9000").await?;
//! axum::serve(listener, app).await?;
//! ```

use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use http::StatusCode;
use tower::timeout::error::Elapsed;
use tower::{BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use bitrix_query::QueryEngine;
use bitrix_resources::Resources;

pub mod error;
pub mod key;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use key::ResourceKey;
pub use routes::routes;

/// The complete application: routes, state, request tracing and a request
/// deadline.
///
/// A request still running after `request_timeout` is answered with
/// `504 Gateway Timeout`; its in-flight statement is dropped with it.
pub fn app<E: QueryEngine>(resources: Resources<E>, request_timeout: Duration) -> Router {
    routes::<E>()
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(request_timeout),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(resources)
}

async fn handle_middleware_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<Elapsed>() {
        warn!("request timed out");
        (StatusCode::GATEWAY_TIMEOUT, "request timed out".to_string())
    } else {
        error!(error = %err, "unhandled middleware error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("unhandled internal error: {}", err),
        )
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{ApiError, ApiResult, ResourceKey, app, routes};
    pub use bitrix_query::prelude::*;
    pub use bitrix_resources::{ResourceSettings, Resources};
}
