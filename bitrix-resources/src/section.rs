//! Info-block sections (`b_iblock_section`).
//!
//! A section is returned with three derived collections, each loaded with its
//! own statement on the connection that fetched the section:
//!
//! - `elements`: ids of the elements bound to the section
//! - `meta`: inherited SEO values
//! - `props`: user fields from the info block's `b_uts_iblock_{IBLOCK_ID}_section`
//!   table, keyed by the lower-cased field name without `UF_`
//!
//! The first failing statement aborts the whole call.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use bitrix_query::sql::quote_identifier;
use bitrix_query::{
    EngineConnection, FilterDocument, FilterValue, FromRow, NullInt64, NullString, PlatformBool,
    QueryEngine, QueryResult, Resource, Row, find_many, find_unique,
};

use crate::meta::{SECTION_META, load_meta};
use crate::settings::{SectionSettings, user_field_key};

const ELEMENTS_SQL: &str =
    "SELECT IBLOCK_ELEMENT_ID FROM b_iblock_section_element WHERE IBLOCK_SECTION_ID = ?";

/// A content section with its derived collections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentSection {
    pub id: u64,
    pub code: NullString,
    pub name: String,
    pub picture: NullString,
    pub description: NullString,
    pub xml_id: NullString,
    pub iblock_id: u64,
    pub iblock_section_id: NullInt64,
    pub active: PlatformBool,
    pub sort: u64,
    pub depth_level: u64,
    pub searchable_content: NullString,
    pub date_create: NullString,
    pub created_by: NullInt64,
    pub timestamp_x: NullString,
    pub modified_by: NullInt64,
    pub elements: Vec<u64>,
    pub meta: BTreeMap<String, String>,
    pub props: BTreeMap<String, String>,
}

impl FromRow for ContentSection {
    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            id: row.get("ID")?,
            code: row.get("CODE")?,
            name: row.get("NAME")?,
            picture: row.get("PICTURE")?,
            description: row.get("DESCRIPTION")?,
            xml_id: row.get("XML_ID")?,
            iblock_id: row.get("IBLOCK_ID")?,
            iblock_section_id: row.get("IBLOCK_SECTION_ID")?,
            active: row.get("ACTIVE")?,
            sort: row.get("SORT")?,
            depth_level: row.get("DEPTH_LEVEL")?,
            searchable_content: row.get("SEARCHABLE_CONTENT")?,
            date_create: row.get("DATE_CREATE")?,
            created_by: row.get("CREATED_BY")?,
            timestamp_x: row.get("TIMESTAMP_X")?,
            modified_by: row.get("MODIFIED_BY")?,
            elements: Vec::new(),
            meta: BTreeMap::new(),
            props: BTreeMap::new(),
        })
    }
}

impl Resource for ContentSection {
    const NAME: &'static str = "ContentSection";
    const TABLE: &'static str = "b_iblock_section";
    const ALIAS: &'static str = "t";
    const COLUMNS: &'static [&'static str] = &[
        "ID",
        "CODE",
        "XML_ID",
        "NAME",
        "IBLOCK_ID",
        "IBLOCK_SECTION_ID",
        "ACTIVE",
        "SORT",
        "DEPTH_LEVEL",
        "PICTURE",
        "DESCRIPTION",
        "SEARCHABLE_CONTENT",
        "DATE_CREATE",
        "CREATED_BY",
        "TIMESTAMP_X",
        "MODIFIED_BY",
    ];
    const FILTERABLE: &'static [&'static str] = &[
        "ID",
        "CODE",
        "ACTIVE",
        "NAME",
        "XML_ID",
        "IBLOCK_ID",
        "IBLOCK_SECTION_ID",
        "DEPTH_LEVEL",
    ];
}

/// Reads content sections.
#[derive(Debug, Clone)]
pub struct SectionAccessor<E: QueryEngine> {
    engine: E,
    settings: Arc<SectionSettings>,
}

impl<E: QueryEngine> SectionAccessor<E> {
    /// Create an accessor; `settings` must already be validated.
    pub fn new(engine: E, settings: Arc<SectionSettings>) -> Self {
        Self { engine, settings }
    }

    /// One section by id.
    pub async fn by_id(&self, id: u64) -> QueryResult<ContentSection> {
        self.unique("ID", id.to_string()).await
    }

    /// One section by symbolic code.
    pub async fn by_code(&self, code: &str) -> QueryResult<ContentSection> {
        self.unique("CODE", code).await
    }

    /// Sections matching a filter document, each fully enriched.
    pub async fn list(&self, doc: &FilterDocument) -> QueryResult<Vec<ContentSection>> {
        let mut conn = self.engine.acquire().await?;
        let mut sections = find_many::<ContentSection, _>(&mut conn, doc).await?;
        for section in &mut sections {
            self.enrich(&mut conn, section).await?;
        }
        debug!(sections = sections.len(), "sections enriched");
        Ok(sections)
    }

    async fn unique(&self, column: &str, value: impl Into<String>) -> QueryResult<ContentSection> {
        let mut conn = self.engine.acquire().await?;
        let mut section = find_unique::<ContentSection, _>(&mut conn, column, value).await?;
        self.enrich(&mut conn, &mut section).await?;
        Ok(section)
    }

    async fn enrich<C: EngineConnection>(
        &self,
        conn: &mut C,
        section: &mut ContentSection,
    ) -> QueryResult<()> {
        section.elements = load_elements(conn, section.id)
            .await
            .map_err(|e| e.with_context("section elements"))?;
        section.meta = load_meta(conn, SECTION_META, section.id)
            .await
            .map_err(|e| e.with_context("section meta"))?;
        section.props = self
            .load_props(conn, section.id, section.iblock_id)
            .await
            .map_err(|e| e.with_context("section props"))?;
        Ok(())
    }

    async fn load_props<C: EngineConnection>(
        &self,
        conn: &mut C,
        section_id: u64,
        iblock_id: u64,
    ) -> QueryResult<BTreeMap<String, String>> {
        let fields = &self.settings.user_fields;
        if fields.is_empty() {
            return Ok(BTreeMap::new());
        }

        let sql = props_sql(fields, iblock_id);
        let rows = conn.query(&sql, vec![FilterValue::UInt(section_id)]).await?;

        let mut props = BTreeMap::new();
        for row in &rows {
            for field in fields {
                let value: NullString = row
                    .get(field)
                    .map_err(|e| e.with_resource(ContentSection::NAME))?;
                props.insert(user_field_key(field), value.value_or_default());
            }
        }
        Ok(props)
    }
}

async fn load_elements<C: EngineConnection>(conn: &mut C, section_id: u64) -> QueryResult<Vec<u64>> {
    let rows = conn
        .query(ELEMENTS_SQL, vec![FilterValue::UInt(section_id)])
        .await?;
    rows.iter()
        .map(|row| row.first::<u64>())
        .collect::<QueryResult<Vec<_>>>()
        .map_err(|e| e.with_resource(ContentSection::NAME))
}

fn props_sql(fields: &[String], iblock_id: u64) -> String {
    let columns: Vec<String> = fields.iter().map(|f| quote_identifier(f)).collect();
    let table = format!("b_uts_iblock_{}_section", iblock_id);
    format!(
        "SELECT {} FROM {} WHERE VALUE_ID = ?",
        columns.join(", "),
        quote_identifier(&table)
    )
}
