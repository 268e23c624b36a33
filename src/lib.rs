//! # bitrix-rest
//!
//! Read-only REST service over a Bitrix catalog database.
//!
//! The work is split across the workspace:
//!
//! - `bitrix-query`: null-aware values, the filter compiler and SQL rendering
//! - `bitrix-mysql`: the pooled MySQL engine
//! - `bitrix-resources`: basket, catalog, element and section accessors
//! - `bitrix-axum`: routes and HTTP error mapping
//!
//! This crate ties them together: it loads [`Config`], builds the pool and
//! serves the router.
//!
//! ```rust,ignore
//! let config = bitrix_rest::Config::from_file("bitrix.toml")?;
//! bitrix_rest::server::run(config).await?;
//! ```

pub mod config;
pub mod error;
pub mod server;

pub use config::{Config, DatabaseConfig, ServerConfig};
pub use error::{ConfigError, ServeError, ServeResult};
