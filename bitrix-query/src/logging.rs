//! Logging setup for the catalog service.
//!
//! Output is structured JSON by default and is controlled by environment
//! variables:
//!
//! - `BITRIX_DEBUG=true|1|yes` - enable debug logging
//! - `BITRIX_LOG_LEVEL=trace|debug|info|warn|error` - set the level explicitly
//! - `BITRIX_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! ```rust,no_run
//! use bitrix_query::logging;
//!
//! // Once, at startup.
//! logging::init();
//! ```
//!
//! Library code uses the plain `tracing` macros; SQL text and argument counts
//! go out at `debug`, lifecycle events at `info`.

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Crates whose events pass the level filter.
const TARGETS: &[&str] = &[
    "bitrix_rest",
    "bitrix_query",
    "bitrix_mysql",
    "bitrix_resources",
    "bitrix_axum",
    "tower_http",
];

/// Whether `BITRIX_DEBUG` asks for debug output.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("BITRIX_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// The level from `BITRIX_LOG_LEVEL`.
///
/// Falls back to `debug` when `BITRIX_DEBUG` is on and `info` otherwise.
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "info" };
    match env::var("BITRIX_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// The format from `BITRIX_LOG_FORMAT`, `json` unless set otherwise.
pub fn get_log_format() -> &'static str {
    env::var("BITRIX_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// The `EnvFilter` directive string for `level`.
pub fn filter_directives(level: &str) -> String {
    TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. Later calls are no-ops.
///
/// Without the `tracing-subscriber` feature this does nothing and events go to
/// whatever subscriber the embedding program installed.
pub fn init() {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(filter_directives(level))
                .unwrap_or_else(|_| EnvFilter::new("info"));

            match get_log_format() {
                "json" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .init();
                }
                "compact" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().compact())
                        .init();
                }
                _ => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().pretty())
                        .init();
                }
            }

            tracing::info!(
                level = level,
                format = get_log_format(),
                "logging initialized"
            );
        }
    });
}
