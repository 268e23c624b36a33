//! Process bootstrap: pool, accessors, router and listener.

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use bitrix_mysql::{MysqlEngine, MysqlPool};
use bitrix_query::QueryEngine;
use bitrix_resources::Resources;

use crate::config::Config;
use crate::error::{ServeError, ServeResult};

/// The HTTP application over `engine`, configured from `config`.
pub fn app<E: QueryEngine>(engine: E, config: &Config) -> Router {
    let resources = Resources::new(engine, config.resource_settings());
    bitrix_axum::app(resources, config.request_timeout())
}

/// Serve until Ctrl+C, then close the pool.
pub async fn run(config: Config) -> ServeResult<()> {
    let pool = MysqlPool::with_pool_config(config.mysql_config()?, config.pool_config())?;
    if !pool.is_healthy().await {
        warn!(
            host = %pool.config().host,
            database = %pool.config().database,
            "database is not reachable yet; requests will fail until it is"
        );
    }

    let engine = MysqlEngine::new(pool);
    let router = app(engine.clone(), &config);

    let addr = config.server.bind;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;
    info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServeError::Serve)?;

    info!("shutting down");
    engine.pool().clone().disconnect().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
