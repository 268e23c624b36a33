//! Filter documents and their compilation into SQL fragments.
//!
//! A list request carries a [`FilterDocument`]: a `filter` mapping from
//! *selector* keys to string values, and `params` with `LIMIT`, `ORDER` and
//! `GROUP`. The [`FilterCompiler`] turns it into a [`CompiledQuery`]: WHERE
//! predicates with one `?` per bound argument, plus validated GROUP BY, ORDER BY
//! and LIMIT fragments.
//!
//! Selector grammar for a whitelisted field `F`:
//!
//! | key | predicate | bound argument |
//! |---|---|---|
//! | `F` | `F = ?` | value |
//! | `F%` | `F LIKE ?` | `value%` |
//! | `%F` | `F LIKE ?` | `%value` |
//! | `%F%` | `F LIKE ?` | `%value%` |
//! | `>F` | `F > ?` | value |
//! | `<F` | `F < ?` | value |
//!
//! Keys naming a field outside the whitelist are ignored. Predicates come out
//! in whitelist order, then selector order, so equal documents always compile
//! to identical SQL.
//!
//! `LIMIT`, `ORDER` and `GROUP` are spliced into the statement text, so they are
//! parsed against strict allow-lists and re-rendered; anything else is an
//! `InvalidFilter` error raised before SQL is ever executed.
//!
//! ```rust
//! use bitrix_query::filter::{FilterCompiler, FilterDocument, FilterValue};
//!
//! let doc = FilterDocument::new().filter("NAME%", "Chair");
//! let compiled = FilterCompiler::new(&["ID", "NAME", "SORT"]).compile(&doc).unwrap();
//!
//! assert_eq!(compiled.predicates, vec!["NAME LIKE ?".to_string()]);
//! assert_eq!(compiled.args, vec![FilterValue::String("Chair%".into())]);
//! assert_eq!(compiled.to_sql(), " WHERE NAME LIKE ? ORDER BY SORT ASC LIMIT 100");
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::traits::Resource;
use crate::types::{Limit, OrderByField, SortOrder};

/// Default row cap when a document carries no `LIMIT`.
pub const DEFAULT_LIMIT: u64 = 100;

/// Default ordering when a document carries no `ORDER`.
pub const DEFAULT_ORDER: &str = "SORT ASC";

static LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)(?:,([0-9]+))?$").expect("LIMIT pattern is valid")
});

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// Unsigned integer value.
    UInt(u64),
    /// String value.
    String(String),
}

impl From<u64> for FilterValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

/// The shape of a filter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Selector {
    /// `F`: equality.
    Equals,
    /// `F%`: value is a prefix.
    StartsWith,
    /// `%F`: value is a suffix.
    EndsWith,
    /// `%F%`: value is a substring.
    Contains,
    /// `>F`: strictly greater.
    GreaterThan,
    /// `<F`: strictly less.
    LessThan,
}

impl Selector {
    /// Split a filter key into its selector and field name.
    pub fn parse(key: &str) -> (Self, &str) {
        if let Some(field) = key.strip_prefix('>') {
            return (Self::GreaterThan, field);
        }
        if let Some(field) = key.strip_prefix('<') {
            return (Self::LessThan, field);
        }
        match (key.strip_prefix('%'), key.strip_suffix('%')) {
            (Some(rest), Some(_)) if key.len() >= 2 => {
                (Self::Contains, &rest[..rest.len() - 1])
            }
            (Some(field), _) => (Self::EndsWith, field),
            (None, Some(field)) => (Self::StartsWith, field),
            (None, None) => (Self::Equals, key),
        }
    }

    /// The SQL comparison operator.
    pub fn operator(&self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::StartsWith | Self::EndsWith | Self::Contains => "LIKE",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
        }
    }

    /// The argument bound for `value`, with LIKE wildcards applied.
    pub fn bind(&self, value: &str) -> FilterValue {
        match self {
            Self::StartsWith => FilterValue::String(format!("{}%", value)),
            Self::EndsWith => FilterValue::String(format!("%{}", value)),
            Self::Contains => FilterValue::String(format!("%{}%", value)),
            Self::Equals | Self::GreaterThan | Self::LessThan => {
                FilterValue::String(value.to_string())
            }
        }
    }
}

/// Listing parameters of a filter document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListParams {
    /// `count` or `offset,count`.
    #[serde(rename = "LIMIT", default)]
    pub limit: Option<String>,
    /// Comma-separated `column [ASC|DESC]` list.
    #[serde(rename = "ORDER", default)]
    pub order: Option<String>,
    /// A single column.
    #[serde(rename = "GROUP", default)]
    pub group: Option<String>,
}

/// A client-supplied list query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterDocument {
    /// Selector key to value.
    #[serde(default)]
    pub filter: BTreeMap<String, String>,
    /// Listing parameters.
    #[serde(default)]
    pub params: ListParams,
}

impl FilterDocument {
    /// An empty document: no predicates, default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON request body.
    ///
    /// Unknown top-level or `params` keys are rejected.
    pub fn from_json(body: &[u8]) -> QueryResult<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Add a selector.
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter.insert(key.into(), value.into());
        self
    }

    /// Set `LIMIT`.
    pub fn limit(mut self, limit: impl Into<String>) -> Self {
        self.params.limit = Some(limit.into());
        self
    }

    /// Set `ORDER`.
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.params.order = Some(order.into());
        self
    }

    /// Set `GROUP`.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.params.group = Some(group.into());
        self
    }
}

/// The output of compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// WHERE predicates, ANDed, each with exactly one placeholder.
    pub predicates: Vec<String>,
    /// Bound arguments in placeholder order.
    pub args: Vec<FilterValue>,
    /// GROUP BY column.
    pub group_by: Option<String>,
    /// ORDER BY terms.
    pub order_by: Vec<OrderByField>,
    /// LIMIT clause.
    pub limit: Option<Limit>,
}

impl CompiledQuery {
    /// ` WHERE a AND b`, or empty when there are no predicates.
    pub fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.predicates.join(" AND "))
        }
    }

    /// ` GROUP BY … ORDER BY … LIMIT …`, each part only when set.
    pub fn tail(&self) -> String {
        let mut sql = String::new();
        if let Some(ref group) = self.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(group);
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            for (i, field) in self.order_by.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                field.write_sql(&mut sql);
            }
        }
        if let Some(limit) = self.limit {
            sql.push(' ');
            sql.push_str(&limit.to_sql());
        }
        sql
    }

    /// Everything after the FROM clause.
    pub fn to_sql(&self) -> String {
        let mut sql = self.where_clause();
        sql.push_str(&self.tail());
        sql
    }

    /// Number of `?` placeholders in the predicates.
    pub fn placeholder_count(&self) -> usize {
        self.predicates
            .iter()
            .map(|p| p.matches('?').count())
            .sum()
    }
}

/// Compiles filter documents against a fixed field whitelist.
#[derive(Debug, Clone)]
pub struct FilterCompiler<'a> {
    fields: &'a [&'a str],
    known_columns: Vec<&'a str>,
    qualifier: Option<&'a str>,
    default_order: &'a str,
    default_limit: Option<u64>,
}

impl<'a> FilterCompiler<'a> {
    /// A compiler whose filterable fields are also its orderable columns.
    pub fn new(fields: &'a [&'a str]) -> Self {
        Self {
            fields,
            known_columns: fields.to_vec(),
            qualifier: None,
            default_order: DEFAULT_ORDER,
            default_limit: Some(DEFAULT_LIMIT),
        }
    }

    /// A compiler configured from a resource descriptor.
    pub fn for_resource<R: Resource>() -> FilterCompiler<'static> {
        let mut known_columns: Vec<&'static str> = R::COLUMNS.to_vec();
        known_columns.extend(R::COMPUTED.iter().map(|(alias, _)| *alias));
        FilterCompiler {
            fields: R::FILTERABLE,
            known_columns,
            qualifier: Some(R::ALIAS),
            default_order: R::DEFAULT_ORDER,
            default_limit: R::DEFAULT_LIMIT,
        }
    }

    /// Prefix predicate columns with a table alias.
    pub fn qualified(mut self, alias: &'a str) -> Self {
        self.qualifier = Some(alias);
        self
    }

    /// Ordering used when the document has no `ORDER`.
    pub fn default_order(mut self, order: &'a str) -> Self {
        self.default_order = order;
        self
    }

    /// Row cap used when the document has no `LIMIT`; `None` for no cap.
    pub fn default_limit(mut self, limit: Option<u64>) -> Self {
        self.default_limit = limit;
        self
    }

    /// Compile a document.
    pub fn compile(&self, doc: &FilterDocument) -> QueryResult<CompiledQuery> {
        let limit = match doc.params.limit {
            Some(ref text) => Some(parse_limit(text)?),
            None => self.default_limit.map(Limit::new),
        };
        let order_by = match doc.params.order {
            Some(ref text) => parse_order(text, Some(&self.known_columns))?,
            None => parse_order(self.default_order, None)?,
        };
        let group_by = match doc.params.group {
            Some(ref text) => Some(self.parse_group(text)?),
            None => None,
        };

        let mut matched: Vec<(usize, Selector, &str)> = doc
            .filter
            .iter()
            .filter_map(|(key, value)| {
                let (selector, field) = Selector::parse(key);
                match self.fields.iter().position(|f| *f == field) {
                    Some(index) => Some((index, selector, value.as_str())),
                    None => {
                        debug!(key = %key, "ignoring filter key outside the whitelist");
                        None
                    }
                }
            })
            .collect();
        matched.sort_by_key(|(index, selector, _)| (*index, *selector));

        let mut predicates = Vec::with_capacity(matched.len());
        let mut args = Vec::with_capacity(matched.len());
        for (index, selector, value) in matched {
            let field = self.fields[index];
            let column = match self.qualifier {
                Some(alias) => format!("{}.{}", alias, field),
                None => field.to_string(),
            };
            predicates.push(format!("{} {} ?", column, selector.operator()));
            args.push(selector.bind(value));
        }

        Ok(CompiledQuery {
            predicates,
            args,
            group_by,
            order_by,
            limit,
        })
    }

    fn parse_group(&self, text: &str) -> QueryResult<String> {
        let column = text.trim();
        if self.known_columns.contains(&column) {
            Ok(column.to_string())
        } else {
            Err(QueryError::invalid_filter(
                "GROUP",
                format!("'{}' is not a known column", text),
            ))
        }
    }
}

/// Compile `doc` against `fields` with default settings.
pub fn compile(fields: &[&str], doc: &FilterDocument) -> QueryResult<CompiledQuery> {
    FilterCompiler::new(fields).compile(doc)
}

fn parse_limit(text: &str) -> QueryResult<Limit> {
    let invalid = || {
        QueryError::invalid_filter(
            "LIMIT",
            format!("'{}' is not <count> or <offset>,<count>", text),
        )
    };
    let caps = LIMIT_RE.captures(text.trim()).ok_or_else(invalid)?;
    let first: u64 = caps[1].parse().map_err(|_| invalid())?;
    match caps.get(2) {
        Some(count) => {
            let count: u64 = count.as_str().parse().map_err(|_| invalid())?;
            Ok(Limit::with_offset(first, count))
        }
        None => Ok(Limit::new(first)),
    }
}

fn parse_order(text: &str, known_columns: Option<&[&str]>) -> QueryResult<Vec<OrderByField>> {
    let invalid = |message: String| QueryError::invalid_filter("ORDER", message);

    let mut fields = Vec::new();
    for term in text.split(',') {
        let mut tokens = term.split_whitespace();
        let column = tokens
            .next()
            .ok_or_else(|| invalid(format!("empty term in '{}'", text)))?;
        let order = match tokens.next() {
            Some(keyword) => SortOrder::parse(keyword)
                .ok_or_else(|| invalid(format!("'{}' is not ASC or DESC", keyword)))?,
            None => SortOrder::Asc,
        };
        if tokens.next().is_some() {
            return Err(invalid(format!("unexpected tokens in '{}'", term.trim())));
        }
        if let Some(known) = known_columns {
            if !known.contains(&column) {
                return Err(invalid(format!("'{}' is not a known column", column)));
            }
        }
        fields.push(OrderByField::new(column, order));
    }
    Ok(fields)
}
