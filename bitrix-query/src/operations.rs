//! Generic read operations over a [`Resource`].
//!
//! These are the two statements every content resource is built from: a
//! filtered list, and a single-record lookup that fails with `NotFound` when
//! nothing matches. Derived collections are loaded by the resource accessors
//! afterwards on the same connection.

use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::{CompiledQuery, FilterCompiler, FilterDocument};
use crate::row::{FromRow, Row};
use crate::sql::SelectBuilder;
use crate::traits::{EngineConnection, Resource};

/// The `SELECT … FROM table alias` prefix for a resource.
pub fn select_sql<R: Resource>() -> String {
    let mut builder = SelectBuilder::new(R::TABLE, R::ALIAS).columns(R::COLUMNS);
    for (alias, subquery) in R::COMPUTED {
        builder = builder.computed(alias, subquery);
    }
    builder.build()
}

/// The full statement for a compiled document.
pub fn list_sql<R: Resource>(compiled: &CompiledQuery) -> String {
    let mut sql = select_sql::<R>();
    sql.push_str(&compiled.to_sql());
    sql
}

/// Decode rows into records, tagging failures with the resource name.
pub fn decode_rows<T: FromRow>(resource: &str, rows: &[Row]) -> QueryResult<Vec<T>> {
    rows.iter()
        .map(|row| T::from_row(row).map_err(|e| e.with_resource(resource)))
        .collect()
}

/// Compile `doc` against `R` and return every matching record.
pub async fn find_many<R, C>(conn: &mut C, doc: &FilterDocument) -> QueryResult<Vec<R>>
where
    R: Resource,
    C: EngineConnection,
{
    let compiled = FilterCompiler::for_resource::<R>().compile(doc)?;
    fetch_compiled::<R, C>(conn, compiled).await
}

/// Like [`find_many`], but without the resource's default row cap.
///
/// An explicit `LIMIT` in `doc` still applies.
pub async fn find_all<R, C>(conn: &mut C, doc: &FilterDocument) -> QueryResult<Vec<R>>
where
    R: Resource,
    C: EngineConnection,
{
    let compiled = FilterCompiler::for_resource::<R>()
        .default_limit(None)
        .compile(doc)?;
    fetch_compiled::<R, C>(conn, compiled).await
}

async fn fetch_compiled<R, C>(conn: &mut C, compiled: CompiledQuery) -> QueryResult<Vec<R>>
where
    R: Resource,
    C: EngineConnection,
{
    let sql = list_sql::<R>(&compiled);
    debug!(
        resource = R::NAME,
        sql = %sql,
        args = compiled.args.len(),
        "find_many"
    );

    let rows = conn.query(&sql, compiled.args).await?;
    decode_rows(R::NAME, &rows)
}

/// Look `R` up by a single whitelisted column.
///
/// The lookup is the one-entry document `{column: value}` with `LIMIT 1`.
pub async fn find_unique<R, C>(conn: &mut C, column: &str, value: impl Into<String>) -> QueryResult<R>
where
    R: Resource,
    C: EngineConnection,
{
    let doc = FilterDocument::new().filter(column, value).limit("1");
    let compiled = FilterCompiler::for_resource::<R>().compile(&doc)?;
    if compiled.predicates.is_empty() {
        return Err(QueryError::internal(format!(
            "'{}' is not a filterable column of {}",
            column,
            R::NAME
        )));
    }

    let sql = list_sql::<R>(&compiled);
    debug!(resource = R::NAME, sql = %sql, column = column, "find_unique");

    match conn.query_row(&sql, compiled.args).await? {
        Some(row) => R::from_row(&row).map_err(|e| e.with_resource(R::NAME)),
        None => Err(QueryError::not_found(R::NAME)),
    }
}
