//! MySQL connection wrapper.

use std::time::Duration;

use mysql_async::Conn;
use mysql_async::prelude::*;
use tracing::{debug, warn};

use bitrix_query::error::{QueryError, QueryResult};
use bitrix_query::filter::FilterValue;
use bitrix_query::row::Row;
use bitrix_query::traits::{BoxFuture, EngineConnection};

use crate::error::{MysqlError, MysqlResult};
use crate::types::{from_mysql_row, to_params};

/// A pooled MySQL connection with a per-statement deadline.
///
/// Dropping the wrapper returns the connection to its pool.
pub struct MysqlConnection {
    conn: Conn,
    query_timeout: Option<Duration>,
}

impl MysqlConnection {
    /// Create a new connection wrapper.
    pub fn new(conn: Conn, query_timeout: Option<Duration>) -> Self {
        Self {
            conn,
            query_timeout,
        }
    }

    /// Run a parameterized statement and return all rows.
    pub async fn fetch(&mut self, sql: &str, params: &[FilterValue]) -> MysqlResult<Vec<Row>> {
        debug!(sql = %sql, args = params.len(), "Executing parameterized query");
        let statement = self.conn.exec::<mysql_async::Row, _, _>(sql, to_params(params));
        let rows = match self.query_timeout {
            Some(limit) => tokio::time::timeout(limit, statement).await.map_err(|_| {
                warn!(sql = %sql, timeout_ms = limit.as_millis() as u64, "Statement timed out");
                MysqlError::QueryTimeout(limit)
            })??,
            None => statement.await?,
        };
        Ok(rows.into_iter().map(from_mysql_row).collect())
    }
}

impl EngineConnection for MysqlConnection {
    fn query<'a>(
        &'a mut self,
        sql: &'a str,
        params: Vec<FilterValue>,
    ) -> BoxFuture<'a, QueryResult<Vec<Row>>> {
        Box::pin(async move {
            self.fetch(sql, &params)
                .await
                .map_err(|e| QueryError::from(e).with_sql(sql))
        })
    }
}
