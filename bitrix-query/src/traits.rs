//! The seams between the query core, the database driver and the resources.

use std::future::Future;
use std::pin::Pin;

use crate::error::QueryResult;
use crate::filter::FilterValue;
use crate::row::{FromRow, Row};

/// A boxed future, used where trait methods return futures.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A source of database connections.
///
/// Each public accessor call acquires one connection and holds it for the
/// duration of the call. Implementations return the connection to their pool
/// when it is dropped, so early returns and errors release it too.
pub trait QueryEngine: Send + Sync + Clone + 'static {
    /// The scoped connection type.
    type Connection: EngineConnection;

    /// Acquire a connection.
    fn acquire(&self) -> BoxFuture<'_, QueryResult<Self::Connection>>;
}

/// A connection able to run parameterized read statements.
pub trait EngineConnection: Send {
    /// Run `sql` with one argument per `?` placeholder and return every row.
    fn query<'a>(
        &'a mut self,
        sql: &'a str,
        params: Vec<FilterValue>,
    ) -> BoxFuture<'a, QueryResult<Vec<Row>>>;

    /// Run `sql` and return the first row, if any.
    fn query_row<'a>(
        &'a mut self,
        sql: &'a str,
        params: Vec<FilterValue>,
    ) -> BoxFuture<'a, QueryResult<Option<Row>>> {
        Box::pin(async move { Ok(self.query(sql, params).await?.into_iter().next()) })
    }
}

/// Static description of a queryable platform table.
///
/// ```rust
/// use bitrix_query::{FromRow, QueryResult, Resource, Row};
///
/// struct Tag {
///     id: u64,
/// }
///
/// impl FromRow for Tag {
///     fn from_row(row: &Row) -> QueryResult<Self> {
///         Ok(Self { id: row.get("ID")? })
///     }
/// }
///
/// impl Resource for Tag {
///     const NAME: &'static str = "Tag";
///     const TABLE: &'static str = "b_tag";
///     const ALIAS: &'static str = "t";
///     const COLUMNS: &'static [&'static str] = &["ID", "SORT"];
///     const FILTERABLE: &'static [&'static str] = &["ID"];
/// }
///
/// assert_eq!(bitrix_query::select_sql::<Tag>(), "SELECT t.ID, t.SORT FROM b_tag t");
/// ```
pub trait Resource: FromRow + Send + 'static {
    /// Name used in errors and logs.
    const NAME: &'static str;

    /// Table name.
    const TABLE: &'static str;

    /// Table alias used to qualify columns.
    const ALIAS: &'static str;

    /// Plain selected columns.
    const COLUMNS: &'static [&'static str];

    /// Computed columns as `(alias, sub-select)`.
    const COMPUTED: &'static [(&'static str, &'static str)] = &[];

    /// Filter whitelist, in compilation order.
    const FILTERABLE: &'static [&'static str];

    /// Ordering when the request gives none.
    const DEFAULT_ORDER: &'static str = crate::filter::DEFAULT_ORDER;

    /// Row cap when the request gives none.
    const DEFAULT_LIMIT: Option<u64> = Some(crate::filter::DEFAULT_LIMIT);
}
