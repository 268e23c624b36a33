//! Startup errors.
//!
//! Everything here is fatal: the binary renders it with `miette` and exits.

use std::net::SocketAddr;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use bitrix_mysql::MysqlError;
use bitrix_resources::SettingsError;

/// Result type for process startup.
pub type ServeResult<T> = Result<T, ServeError>;

/// The configuration file could not be used.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read configuration file {}", .path.display())]
    #[diagnostic(
        code(bitrix::config::io),
        help("pass --config <PATH> or set BITRIX_CONFIG")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    #[diagnostic(code(bitrix::config::toml))]
    Toml(#[from] toml::de::Error),

    #[error("environment variable '{name}' is not set")]
    #[diagnostic(
        code(bitrix::config::env),
        help("export the variable, or give the placeholder a fallback after ':-'")
    )]
    MissingVar { name: String },

    #[error(transparent)]
    #[diagnostic(code(bitrix::config::settings))]
    Settings(#[from] SettingsError),

    #[error("invalid configuration: {0}")]
    #[diagnostic(code(bitrix::config::invalid))]
    Invalid(String),
}

impl ConfigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// The service could not start or stopped abnormally.
#[derive(Debug, Error, Diagnostic)]
pub enum ServeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to set up the database pool")]
    #[diagnostic(code(bitrix::database))]
    Database(#[from] MysqlError),

    #[error("failed to bind {addr}")]
    #[diagnostic(code(bitrix::bind), help("is another process listening there?"))]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error")]
    #[diagnostic(code(bitrix::serve))]
    Serve(#[source] std::io::Error),
}
