//! # bitrix-query
//!
//! Read-side query core for the Bitrix catalog REST service.
//!
//! This crate holds everything that does not depend on a particular driver:
//! - the null-aware value model that keeps `null` out of JSON projections
//! - the filter compiler that turns client filter documents into
//!   parameterized WHERE predicates and validated LIMIT/ORDER/GROUP fragments
//! - the select builder and the generic `find_many` / `find_all` / `find_unique` operations
//! - the row model and the engine traits drivers implement
//! - the error type shared by every layer
//!
//! ## Filters
//!
//! ```rust
//! use bitrix_query::{FilterCompiler, FilterDocument, FilterValue};
//!
//! let doc = FilterDocument::from_json(
//!     br#"{"filter": {"%NAME%": "oak", "ACTIVE": "Y"}, "params": {"LIMIT": "20,10"}}"#,
//! ).unwrap();
//!
//! let compiled = FilterCompiler::new(&["ID", "ACTIVE", "NAME", "SORT"])
//!     .qualified("t")
//!     .compile(&doc)
//!     .unwrap();
//!
//! assert_eq!(
//!     compiled.to_sql(),
//!     " WHERE t.ACTIVE = ? AND t.NAME LIKE ? ORDER BY SORT ASC LIMIT 20, 10"
//! );
//! assert_eq!(compiled.args[1], FilterValue::String("%oak%".into()));
//! ```
//!
//! ## Null-aware values
//!
//! ```rust
//! use bitrix_query::{NullFloat64, PlatformBool};
//!
//! assert_eq!(serde_json::to_string(&NullFloat64::null()).unwrap(), "0.0");
//! assert_eq!(serde_json::to_string(&PlatformBool::from("Y")).unwrap(), "true");
//! ```

pub mod error;
pub mod filter;
pub mod logging;
pub mod operations;
pub mod row;
pub mod sql;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{ErrorCode, ErrorContext, ErrorKind, QueryError, QueryResult};
pub use filter::{
    CompiledQuery, FilterCompiler, FilterDocument, FilterValue, ListParams, Selector,
};
pub use operations::{decode_rows, find_all, find_many, find_unique, list_sql, select_sql};
pub use row::{FromRow, FromSqlValue, Row, SqlValue};
pub use sql::SelectBuilder;
pub use traits::{BoxFuture, EngineConnection, QueryEngine, Resource};
pub use types::{Limit, OrderByField, SortOrder};
pub use value::{NullFloat64, NullInt64, NullString, NullUInt64, NullableValue, PlatformBool};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{ErrorKind, QueryError, QueryResult};
    pub use crate::filter::{FilterDocument, FilterValue};
    pub use crate::operations::{find_all, find_many, find_unique};
    pub use crate::row::{FromRow, Row};
    pub use crate::traits::{EngineConnection, QueryEngine, Resource};
    pub use crate::value::{NullFloat64, NullInt64, NullString, NullUInt64, PlatformBool};
}
