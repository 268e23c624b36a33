//! MySQL query engine implementation.

use bitrix_query::error::{QueryError, QueryResult};
use bitrix_query::traits::{BoxFuture, QueryEngine};

use crate::connection::MysqlConnection;
use crate::pool::MysqlPool;

/// MySQL query engine.
///
/// Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct MysqlEngine {
    pool: MysqlPool,
}

impl MysqlEngine {
    /// Create a new MySQL engine with the given pool.
    pub fn new(pool: MysqlPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &MysqlPool {
        &self.pool
    }
}

impl QueryEngine for MysqlEngine {
    type Connection = MysqlConnection;

    fn acquire(&self) -> BoxFuture<'_, QueryResult<Self::Connection>> {
        Box::pin(async move { self.pool.get().await.map_err(QueryError::from) })
    }
}
