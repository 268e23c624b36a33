//! Info-block elements (`b_iblock_element`).

use std::collections::BTreeMap;

use serde::Serialize;

use bitrix_query::{
    EngineConnection, FilterDocument, FilterValue, FromRow, NullInt64, NullString, PlatformBool,
    QueryEngine, QueryError, QueryResult, Resource, Row, decode_rows, find_many, find_unique,
};

use crate::meta::{ELEMENT_META, load_meta};

/// Property values of one element. File properties resolve to `SUBDIR/FILE_NAME`
/// and list properties to the enum value.
const PROPERTIES_SQL: &str = "SELECT prop.NAME AS PROP_NAME, prop.CODE AS PROP_CODE, \
     IF(prop.PROPERTY_TYPE = 'F', IFNULL(CONCAT(file.SUBDIR, '/', file.FILE_NAME), ''), \
     IFNULL(prop_enum.VALUE, el_prop.VALUE)) AS PROP_VALUE \
     FROM b_iblock_element el \
     LEFT JOIN b_iblock_element_property el_prop ON el_prop.IBLOCK_ELEMENT_ID = el.ID \
     LEFT JOIN b_iblock_property prop ON prop.ID = el_prop.IBLOCK_PROPERTY_ID \
     LEFT JOIN b_iblock_property_enum prop_enum ON prop_enum.ID = el_prop.VALUE \
     LEFT JOIN b_file file ON file.ID = el_prop.VALUE \
     WHERE el.ID = ?";

/// A content element with its SEO meta.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentElement {
    pub id: u64,
    pub code: NullString,
    pub name: String,
    pub preview_picture: NullString,
    pub detail_picture: NullString,
    pub preview_text: NullString,
    pub detail_text: NullString,
    pub xml_id: NullString,
    pub iblock_id: u64,
    pub iblock_section_id: NullInt64,
    pub active: PlatformBool,
    pub active_from: NullString,
    pub active_to: NullString,
    pub sort: u64,
    pub searchable_content: NullString,
    pub date_create: NullString,
    pub created_by: NullInt64,
    pub timestamp_x: NullString,
    pub modified_by: NullInt64,
    pub show_counter: NullInt64,
    pub meta: BTreeMap<String, String>,
}

impl FromRow for ContentElement {
    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            id: row.get("ID")?,
            code: row.get("CODE")?,
            name: row.get("NAME")?,
            preview_picture: row.get("PREVIEW_PICTURE")?,
            detail_picture: row.get("DETAIL_PICTURE")?,
            preview_text: row.get("PREVIEW_TEXT")?,
            detail_text: row.get("DETAIL_TEXT")?,
            xml_id: row.get("XML_ID")?,
            iblock_id: row.get("IBLOCK_ID")?,
            iblock_section_id: row.get("IBLOCK_SECTION_ID")?,
            active: row.get("ACTIVE")?,
            active_from: row.get("ACTIVE_FROM")?,
            active_to: row.get("ACTIVE_TO")?,
            sort: row.get("SORT")?,
            searchable_content: row.get("SEARCHABLE_CONTENT")?,
            date_create: row.get("DATE_CREATE")?,
            created_by: row.get("CREATED_BY")?,
            timestamp_x: row.get("TIMESTAMP_X")?,
            modified_by: row.get("MODIFIED_BY")?,
            show_counter: row.get("SHOW_COUNTER")?,
            meta: BTreeMap::new(),
        })
    }
}

impl Resource for ContentElement {
    const NAME: &'static str = "ContentElement";
    const TABLE: &'static str = "b_iblock_element";
    const ALIAS: &'static str = "t";
    const COLUMNS: &'static [&'static str] = &[
        "ID",
        "CODE",
        "XML_ID",
        "NAME",
        "IBLOCK_ID",
        "IBLOCK_SECTION_ID",
        "ACTIVE",
        "ACTIVE_FROM",
        "ACTIVE_TO",
        "SORT",
        "PREVIEW_PICTURE",
        "PREVIEW_TEXT",
        "DETAIL_PICTURE",
        "DETAIL_TEXT",
        "SEARCHABLE_CONTENT",
        "DATE_CREATE",
        "CREATED_BY",
        "TIMESTAMP_X",
        "MODIFIED_BY",
        "SHOW_COUNTER",
    ];
    const FILTERABLE: &'static [&'static str] = &[
        "ID",
        "CODE",
        "ACTIVE",
        "ACTIVE_FROM",
        "ACTIVE_TO",
        "NAME",
        "XML_ID",
        "IBLOCK_ID",
        "IBLOCK_SECTION_ID",
    ];
}

/// One property value of an element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementProperty {
    pub name: NullString,
    pub code: NullString,
    pub value: NullString,
}

impl FromRow for ElementProperty {
    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            name: row.get("PROP_NAME")?,
            code: row.get("PROP_CODE")?,
            value: row.get("PROP_VALUE")?,
        })
    }
}

/// Reads content elements.
#[derive(Debug, Clone)]
pub struct ElementAccessor<E: QueryEngine> {
    engine: E,
}

impl<E: QueryEngine> ElementAccessor<E> {
    /// Create an accessor over `engine`.
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// One element by id.
    pub async fn by_id(&self, id: u64) -> QueryResult<ContentElement> {
        self.unique("ID", id.to_string()).await
    }

    /// One element by symbolic code.
    pub async fn by_code(&self, code: &str) -> QueryResult<ContentElement> {
        self.unique("CODE", code).await
    }

    /// Elements matching a filter document, each with its meta.
    pub async fn list(&self, doc: &FilterDocument) -> QueryResult<Vec<ContentElement>> {
        let mut conn = self.engine.acquire().await?;
        let mut elements = find_many::<ContentElement, _>(&mut conn, doc).await?;
        for element in &mut elements {
            element.meta = load_meta(&mut conn, ELEMENT_META, element.id).await?;
        }
        Ok(elements)
    }

    /// Property values of one element.
    ///
    /// An element without properties yields an empty list; an unknown element
    /// is `NotFound`.
    pub async fn properties(&self, element_id: u64) -> QueryResult<Vec<ElementProperty>> {
        let mut conn = self.engine.acquire().await?;
        let rows = conn
            .query(PROPERTIES_SQL, vec![FilterValue::UInt(element_id)])
            .await?;
        if rows.is_empty() {
            return Err(QueryError::not_found(ContentElement::NAME));
        }
        let properties: Vec<ElementProperty> = decode_rows(ContentElement::NAME, &rows)?;
        Ok(properties
            .into_iter()
            .filter(|p| p.name.is_present() || p.code.is_present())
            .collect())
    }

    async fn unique(&self, column: &str, value: impl Into<String>) -> QueryResult<ContentElement> {
        let mut conn = self.engine.acquire().await?;
        let mut element = find_unique::<ContentElement, _>(&mut conn, column, value).await?;
        element.meta = load_meta(&mut conn, ELEMENT_META, element.id).await?;
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitrix_query::testing::MockEngine;
    use bitrix_query::{ErrorKind, SqlValue};
    use pretty_assertions::assert_eq;

    fn element_row(id: u64, code: &str) -> Row {
        Row::new()
            .with("ID", id)
            .with("CODE", code)
            .with("XML_ID", SqlValue::Null)
            .with("NAME", "Oak chair")
            .with("IBLOCK_ID", 4u64)
            .with("IBLOCK_SECTION_ID", 12i64)
            .with("ACTIVE", "Y")
            .with("ACTIVE_FROM", SqlValue::Null)
            .with("ACTIVE_TO", SqlValue::Null)
            .with("SORT", 500u64)
            .with("PREVIEW_PICTURE", SqlValue::Null)
            .with("PREVIEW_TEXT", "Solid oak")
            .with("DETAIL_PICTURE", SqlValue::Null)
            .with("DETAIL_TEXT", SqlValue::Null)
            .with("SEARCHABLE_CONTENT", SqlValue::Null)
            .with("DATE_CREATE", "2020-11-02 10:00:00")
            .with("CREATED_BY", SqlValue::Null)
            .with("TIMESTAMP_X", "2021-01-15 09:30:00")
            .with("MODIFIED_BY", 1i64)
            .with("SHOW_COUNTER", SqlValue::Null)
    }

    fn property_row(
        name: impl Into<SqlValue>,
        code: impl Into<SqlValue>,
        value: impl Into<SqlValue>,
    ) -> Row {
        Row::new()
            .with("PROP_NAME", name)
            .with("PROP_CODE", code)
            .with("PROP_VALUE", value)
    }

    #[tokio::test]
    async fn test_by_id_with_meta() {
        let engine = MockEngine::new()
            .on(
                "b_iblock_element_iprop",
                vec![Row::new()
                    .with("META_NAME", "ELEMENT_META_TITLE")
                    .with("META_VALUE", "Oak chair buy")],
            )
            .on("FROM b_iblock_element t", vec![element_row(7, "oak-chair")]);
        let element = ElementAccessor::new(engine.clone()).by_id(7).await.unwrap();

        assert_eq!(element.id, 7);
        assert_eq!(element.meta["ELEMENT_META_TITLE"], "Oak chair buy");

        let executed = engine.executed();
        assert!(executed[0].sql.starts_with("SELECT t.ID, t.CODE, t.XML_ID, t.NAME"));
        assert!(executed[0].sql.ends_with(" WHERE t.ID = ? ORDER BY SORT ASC LIMIT 1"));
        assert_eq!(executed[0].params, vec![FilterValue::from("7")]);
        assert_eq!(executed[1].params, vec![FilterValue::UInt(7)]);
        assert_eq!(engine.acquired(), 1);
        assert_eq!(engine.released(), 1);
    }

    #[tokio::test]
    async fn test_by_code() {
        let engine = MockEngine::new().on("FROM b_iblock_element t", vec![element_row(7, "oak-chair")]);
        let element = ElementAccessor::new(engine.clone())
            .by_code("oak-chair")
            .await
            .unwrap();
        assert_eq!(element.code.get().map(String::as_str), Some("oak-chair"));
        assert!(engine.executed()[0].sql.contains("WHERE t.CODE = ?"));
    }

    #[tokio::test]
    async fn test_by_id_not_found() {
        let engine = MockEngine::new();
        let err = ElementAccessor::new(engine.clone()).by_id(999999).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(engine.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_list_compiles_document() {
        let engine = MockEngine::new().on(
            "FROM b_iblock_element t",
            vec![element_row(1, "a"), element_row(2, "b")],
        );
        let doc = FilterDocument::from_json(
            br#"{"filter": {"NAME%": "Chair", "IBLOCK_ID": "4"}, "params": {"LIMIT": "10"}}"#,
        )
        .unwrap();
        let elements = ElementAccessor::new(engine.clone()).list(&doc).await.unwrap();
        assert_eq!(elements.len(), 2);

        let executed = engine.executed();
        assert_eq!(executed.len(), 3);
        assert!(executed[0].sql.ends_with(
            " WHERE t.NAME LIKE ? AND t.IBLOCK_ID = ? ORDER BY SORT ASC LIMIT 10"
        ));
        assert_eq!(
            executed[0].params,
            vec![FilterValue::from("Chair%"), FilterValue::from("4")]
        );
    }

    #[tokio::test]
    async fn test_invalid_limit_runs_nothing() {
        let engine = MockEngine::new();
        let doc = FilterDocument::new().limit("10; DROP TABLE b_user");
        let err = ElementAccessor::new(engine.clone()).list(&doc).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFilter);
        assert!(engine.executed().is_empty());
    }

    #[tokio::test]
    async fn test_meta_failure_aborts_list() {
        let engine = MockEngine::new()
            .fail("b_iblock_element_iprop", "Lock wait timeout exceeded")
            .on("FROM b_iblock_element t", vec![element_row(1, "a"), element_row(2, "b")]);
        let err = ElementAccessor::new(engine.clone())
            .list(&FilterDocument::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Query);
        assert_eq!(engine.executed().len(), 2);
        assert_eq!(engine.released(), 1);
    }

    #[tokio::test]
    async fn test_properties() {
        let engine = MockEngine::new().on(
            "FROM b_iblock_element el",
            vec![
                property_row("Material", "MATERIAL", "Oak"),
                property_row("Photo", "MORE_PHOTO", "iblock/1a2/chair.jpg"),
                property_row("Note", SqlValue::Null, SqlValue::Null),
            ],
        );
        let properties = ElementAccessor::new(engine.clone())
            .properties(7)
            .await
            .unwrap();

        assert_eq!(properties.len(), 3);
        assert_eq!(properties[1].value.get().map(String::as_str), Some("iblock/1a2/chair.jpg"));

        let json = serde_json::to_value(&properties[2]).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Note", "code": "", "value": ""}));
        assert_eq!(engine.executed()[0].params, vec![FilterValue::UInt(7)]);
    }

    #[tokio::test]
    async fn test_properties_of_bare_element() {
        let engine = MockEngine::new().on(
            "FROM b_iblock_element el",
            vec![property_row(SqlValue::Null, SqlValue::Null, SqlValue::Null)],
        );
        let properties = ElementAccessor::new(engine).properties(7).await.unwrap();
        assert!(properties.is_empty());
    }

    #[tokio::test]
    async fn test_properties_of_unknown_element() {
        let err = ElementAccessor::new(MockEngine::new())
            .properties(999999)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_json_projection() {
        let element = ContentElement::from_row(&element_row(7, "oak-chair")).unwrap();
        let json = serde_json::to_value(&element).unwrap();
        assert_eq!(json["created_by"], 0);
        assert_eq!(json["xml_id"], "");
        assert_eq!(json["active"], true);
        assert_eq!(json["iblock_section_id"], 12);
        assert_eq!(json["meta"], serde_json::json!({}));
    }
}
