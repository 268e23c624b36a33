//! In-memory engine for exercising accessors without a database.
//!
//! [`MockEngine`] answers each statement with the rows scripted for the first
//! registered SQL fragment it contains, and records every statement it ran.
//! Statements matching no script return no rows.
//!
//! ```rust,ignore
//! use bitrix_query::testing::MockEngine;
//! use bitrix_query::{EngineConnection, QueryEngine, Row};
//!
//! let engine = MockEngine::new().on("FROM b_sale_basket", vec![Row::new().with("ID", 1u64)]);
//! let mut conn = engine.acquire().await?;
//! let rows = conn.query("SELECT b.ID FROM b_sale_basket b", vec![]).await?;
//! assert_eq!(rows.len(), 1);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::{ErrorCode, QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::row::Row;
use crate::traits::{BoxFuture, EngineConnection, QueryEngine};

/// A statement the mock engine ran.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedQuery {
    /// Statement text.
    pub sql: String,
    /// Bound arguments.
    pub params: Vec<FilterValue>,
}

#[derive(Debug, Clone)]
enum Script {
    Rows(Vec<Row>),
    Fail(ErrorCode, String),
}

#[derive(Debug, Default)]
struct MockState {
    scripts: Mutex<Vec<(String, Script)>>,
    executed: Mutex<Vec<ExecutedQuery>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
    fail_acquire: Mutex<Option<String>>,
}

/// A scripted [`QueryEngine`].
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    state: Arc<MockState>,
}

impl MockEngine {
    /// An engine with no scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer statements containing `fragment` with `rows`.
    pub fn on(self, fragment: impl Into<String>, rows: Vec<Row>) -> Self {
        self.state
            .scripts
            .lock()
            .push((fragment.into(), Script::Rows(rows)));
        self
    }

    /// Fail statements containing `fragment` with a database error.
    pub fn fail(self, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        self.fail_with(fragment, ErrorCode::DatabaseError, message)
    }

    /// Fail statements containing `fragment` with the given code.
    pub fn fail_with(
        self,
        fragment: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        self.state
            .scripts
            .lock()
            .push((fragment.into(), Script::Fail(code, message.into())));
        self
    }

    /// Make every `acquire` fail with a connection error.
    pub fn refuse_connections(self, message: impl Into<String>) -> Self {
        *self.state.fail_acquire.lock() = Some(message.into());
        self
    }

    /// Every statement run so far, in order.
    pub fn executed(&self) -> Vec<ExecutedQuery> {
        self.state.executed.lock().clone()
    }

    /// Connections handed out.
    pub fn acquired(&self) -> usize {
        self.state.acquired.load(Ordering::SeqCst)
    }

    /// Connections dropped.
    pub fn released(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }

    fn respond(&self, sql: &str, params: Vec<FilterValue>) -> QueryResult<Vec<Row>> {
        self.state.executed.lock().push(ExecutedQuery {
            sql: sql.to_string(),
            params,
        });
        let scripts = self.state.scripts.lock();
        match scripts.iter().find(|(fragment, _)| sql.contains(fragment.as_str())) {
            Some((_, Script::Rows(rows))) => Ok(rows.clone()),
            Some((_, Script::Fail(code, message))) => {
                Err(QueryError::new(*code, message.clone()).with_sql(sql))
            }
            None => Ok(Vec::new()),
        }
    }
}

impl QueryEngine for MockEngine {
    type Connection = MockConnection;

    fn acquire(&self) -> BoxFuture<'_, QueryResult<Self::Connection>> {
        Box::pin(async move {
            if let Some(ref message) = *self.state.fail_acquire.lock() {
                return Err(QueryError::connection(message.clone()));
            }
            self.state.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(MockConnection {
                engine: self.clone(),
            })
        })
    }
}

/// A connection handed out by [`MockEngine`].
#[derive(Debug)]
pub struct MockConnection {
    engine: MockEngine,
}

impl EngineConnection for MockConnection {
    fn query<'a>(
        &'a mut self,
        sql: &'a str,
        params: Vec<FilterValue>,
    ) -> BoxFuture<'a, QueryResult<Vec<Row>>> {
        Box::pin(async move { self.engine.respond(sql, params) })
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.engine.state.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_matching_script_wins() {
        let engine = MockEngine::new()
            .on("b_catalog_price", vec![Row::new().with("PRICE", 1.5)])
            .on("b_catalog", vec![Row::new().with("ID", 1u64)]);
        let mut conn = engine.acquire().await.unwrap();

        let rows = conn.query("SELECT PRICE FROM b_catalog_price", vec![]).await.unwrap();
        assert_eq!(rows[0].get::<f64>("PRICE").unwrap(), 1.5);

        let rows = conn.query("SELECT ID FROM b_catalog_product", vec![]).await.unwrap();
        assert_eq!(rows[0].get::<u64>("ID").unwrap(), 1);

        assert!(conn.query("SELECT 1", vec![]).await.unwrap().is_empty());
        assert_eq!(engine.executed().len(), 3);
    }

    #[tokio::test]
    async fn test_failures_and_release() {
        let engine = MockEngine::new().fail("b_uts", "table does not exist");
        {
            let mut conn = engine.acquire().await.unwrap();
            let err = conn.query("SELECT * FROM `b_uts_iblock_9_section`", vec![]).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::DatabaseError);
            assert!(err.context.sql.is_some());
        }
        assert_eq!(engine.acquired(), 1);
        assert_eq!(engine.released(), 1);
    }

    #[tokio::test]
    async fn test_refused_connections() {
        let engine = MockEngine::new().refuse_connections("refused");
        let err = engine.acquire().await.unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(engine.acquired(), 0);
    }

    #[tokio::test]
    async fn test_query_row_takes_first() {
        let engine = MockEngine::new().on(
            "FROM t",
            vec![Row::new().with("ID", 1u64), Row::new().with("ID", 2u64)],
        );
        let mut conn = engine.acquire().await.unwrap();
        let row = conn.query_row("SELECT ID FROM t", vec![]).await.unwrap().unwrap();
        assert_eq!(row.get::<u64>("ID").unwrap(), 1);
    }
}
