//! Inherited SEO properties shared by elements and sections.

use std::collections::BTreeMap;

use bitrix_query::{EngineConnection, FilterValue, NullString, QueryResult, Row};

/// Where a record's computed SEO values live.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MetaSource {
    /// Resource name used in decode errors.
    pub resource: &'static str,
    /// Full statement, one `?` for the owner id.
    pub sql: &'static str,
}

pub(crate) const ELEMENT_META: MetaSource = MetaSource {
    resource: "ContentElement",
    sql: "SELECT (SELECT CODE FROM b_iblock_iproperty ip WHERE ip.ID = ei.IPROP_ID) AS META_NAME, \
          ei.VALUE AS META_VALUE FROM b_iblock_element_iprop ei WHERE ei.ELEMENT_ID = ?",
};

pub(crate) const SECTION_META: MetaSource = MetaSource {
    resource: "ContentSection",
    sql: "SELECT (SELECT CODE FROM b_iblock_iproperty ip WHERE ip.ID = si.IPROP_ID) AS META_NAME, \
          si.VALUE AS META_VALUE FROM b_iblock_section_iprop si WHERE si.SECTION_ID = ?",
};

/// Load `code -> value` for one owner.
///
/// Rows whose property code is NULL are skipped. A NULL value becomes `""`.
/// On duplicate codes the last row wins.
pub(crate) async fn load_meta<C: EngineConnection>(
    conn: &mut C,
    source: MetaSource,
    owner_id: u64,
) -> QueryResult<BTreeMap<String, String>> {
    let rows = conn
        .query(source.sql, vec![FilterValue::UInt(owner_id)])
        .await?;
    collect_meta(&rows).map_err(|e| e.with_resource(source.resource))
}

fn collect_meta(rows: &[Row]) -> QueryResult<BTreeMap<String, String>> {
    let mut meta = BTreeMap::new();
    for row in rows {
        let name: NullString = row.get("META_NAME")?;
        let value: NullString = row.get("META_VALUE")?;
        if let Some(name) = name.into_option() {
            meta.insert(name, value.value_or_default());
        }
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitrix_query::SqlValue;
    use bitrix_query::testing::MockEngine;
    use bitrix_query::{ErrorKind, QueryEngine};
    use pretty_assertions::assert_eq;

    fn meta_row(name: impl Into<SqlValue>, value: impl Into<SqlValue>) -> Row {
        Row::new().with("META_NAME", name).with("META_VALUE", value)
    }

    #[tokio::test]
    async fn test_load_meta() {
        let engine = MockEngine::new().on(
            "b_iblock_section_iprop",
            vec![
                meta_row("SECTION_META_TITLE", "Chairs"),
                meta_row("SECTION_META_KEYWORDS", SqlValue::Null),
                meta_row(SqlValue::Null, "orphan"),
            ],
        );
        let mut conn = engine.acquire().await.unwrap();
        let meta = load_meta(&mut conn, SECTION_META, 12).await.unwrap();

        assert_eq!(meta.len(), 2);
        assert_eq!(meta["SECTION_META_TITLE"], "Chairs");
        assert_eq!(meta["SECTION_META_KEYWORDS"], "");
        assert_eq!(engine.executed()[0].params, vec![FilterValue::UInt(12)]);
    }

    #[tokio::test]
    async fn test_element_meta_keyed_by_element() {
        let engine = MockEngine::new();
        let mut conn = engine.acquire().await.unwrap();
        assert!(load_meta(&mut conn, ELEMENT_META, 3).await.unwrap().is_empty());
        assert!(engine.executed()[0].sql.ends_with("WHERE ei.ELEMENT_ID = ?"));
    }

    #[tokio::test]
    async fn test_malformed_row_is_decode_error() {
        let engine = MockEngine::new().on(
            "b_iblock_element_iprop",
            vec![Row::new().with("META_NAME", "ELEMENT_META_TITLE")],
        );
        let mut conn = engine.acquire().await.unwrap();
        let err = load_meta(&mut conn, ELEMENT_META, 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(err.context.resource.as_deref(), Some("ContentElement"));
    }
}
