//! Connection pool for MySQL.

use std::sync::Arc;
use std::time::Duration;

use mysql_async::{Opts, Pool, PoolConstraints, PoolOpts};
use tracing::{debug, info};

use crate::config::MysqlConfig;
use crate::connection::MysqlConnection;
use crate::error::{MysqlError, MysqlResult};

/// A connection pool for MySQL.
#[derive(Clone)]
pub struct MysqlPool {
    inner: Pool,
    config: Arc<MysqlConfig>,
}

impl std::fmt::Debug for MysqlPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MysqlPool")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("database", &self.config.database)
            .finish()
    }
}

impl MysqlPool {
    /// Create a new connection pool from configuration.
    pub fn new(config: MysqlConfig) -> MysqlResult<Self> {
        Self::with_pool_config(config, PoolConfig::default())
    }

    /// Create a new connection pool with custom pool configuration.
    ///
    /// No connection is opened here; the first one is made on demand.
    pub fn with_pool_config(config: MysqlConfig, pool_config: PoolConfig) -> MysqlResult<Self> {
        let constraints =
            PoolConstraints::new(pool_config.min_connections, pool_config.max_connections)
                .ok_or_else(|| {
                    MysqlError::pool(format!(
                        "min_connections ({}) must not exceed max_connections ({})",
                        pool_config.min_connections, pool_config.max_connections
                    ))
                })?;

        let mut pool_opts = PoolOpts::new().with_constraints(constraints);
        if let Some(ttl) = pool_config.idle_timeout {
            pool_opts = pool_opts.with_inactive_connection_ttl(ttl);
        }

        let opts = config.to_opts_builder().pool_opts(pool_opts);
        let pool = Pool::new(Opts::from(opts));

        info!(
            host = %config.host,
            port = %config.port,
            database = %config.database,
            max_connections = %pool_config.max_connections,
            "MySQL connection pool created"
        );

        Ok(Self {
            inner: pool,
            config: Arc::new(config),
        })
    }

    /// Get a connection from the pool.
    ///
    /// Waits at most `connect_timeout`. The connection returns to the pool when
    /// dropped.
    pub async fn get(&self) -> MysqlResult<MysqlConnection> {
        debug!("Acquiring connection from pool");
        let conn = match self.config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, self.inner.get_conn())
                .await
                .map_err(|_| MysqlError::AcquireTimeout(limit))??,
            None => self.inner.get_conn().await?,
        };
        Ok(MysqlConnection::new(conn, self.config.query_timeout))
    }

    /// Get the pool configuration.
    pub fn config(&self) -> &MysqlConfig {
        &self.config
    }

    /// Check if the pool is healthy by attempting to get a connection.
    pub async fn is_healthy(&self) -> bool {
        match self.get().await {
            Ok(mut conn) => conn.fetch("SELECT 1", &[]).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Disconnect all connections and close the pool.
    pub async fn disconnect(self) -> MysqlResult<()> {
        self.inner.disconnect().await?;
        info!("MySQL connection pool closed");
        Ok(())
    }
}

/// Configuration for the connection pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_connections: usize,
    /// Minimum number of connections to keep alive.
    pub min_connections: usize,
    /// Idle time after which connections above the minimum are closed.
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(600)));
    }

    #[tokio::test]
    async fn test_inverted_constraints_rejected() {
        let pool_config = PoolConfig {
            max_connections: 2,
            min_connections: 5,
            idle_timeout: None,
        };
        let err = MysqlPool::with_pool_config(MysqlConfig::new("bitrix"), pool_config).unwrap_err();
        assert!(matches!(err, MysqlError::Pool(_)));
    }

    #[tokio::test]
    async fn test_pool_keeps_config() {
        let pool = MysqlPool::new(MysqlConfig::new("bitrix").host("db.internal")).unwrap();
        assert_eq!(pool.config().host, "db.internal");
        assert_eq!(pool.config().database, "bitrix");
    }
}
