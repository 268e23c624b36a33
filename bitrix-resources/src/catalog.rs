//! Catalog products (`b_catalog_product`) and their trade offers.
//!
//! Offers are separate info-block elements whose link property points back at
//! the parent product. The table holding that property and the property id
//! differ between installs and are read from [`CatalogSettings`].

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use bitrix_query::sql::quote_identifier;
use bitrix_query::{
    EngineConnection, FilterDocument, FilterValue, FromRow, NullFloat64, NullInt64, PlatformBool,
    QueryEngine, QueryResult, Resource, Row, find_many, find_unique,
};

use crate::settings::CatalogSettings;

const PRICE_SQL: &str = "SELECT PRICE FROM b_catalog_price WHERE PRODUCT_ID = p.ID LIMIT 1";
const VAT_RATE_SQL: &str = "SELECT RATE FROM b_catalog_vat WHERE ID = p.VAT_ID";

/// A catalog product with its offer ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogProduct {
    pub id: u64,
    pub available: PlatformBool,
    pub quantity: f64,
    pub quantity_reserved: NullInt64,
    pub weight: NullFloat64,
    pub width: NullFloat64,
    pub length: NullFloat64,
    pub height: NullFloat64,
    pub measure: NullInt64,
    #[serde(rename = "type")]
    pub product_type: String,
    pub vat_included: PlatformBool,
    pub price_type: String,
    pub without_order: PlatformBool,
    pub select_best_price: PlatformBool,
    pub price: NullFloat64,
    #[serde(rename = "vat")]
    pub vat_rate: NullFloat64,
    pub offers: Vec<u64>,
}

impl CatalogProduct {
    /// Whether at least one offer links to this product.
    pub fn has_offers(&self) -> bool {
        !self.offers.is_empty()
    }
}

impl FromRow for CatalogProduct {
    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            id: row.get("ID")?,
            available: row.get("AVAILABLE")?,
            quantity: row.get("QUANTITY")?,
            quantity_reserved: row.get("QUANTITY_RESERVED")?,
            weight: row.get("WEIGHT")?,
            width: row.get("WIDTH")?,
            length: row.get("LENGTH")?,
            height: row.get("HEIGHT")?,
            measure: row.get("MEASURE")?,
            product_type: row.get("TYPE")?,
            vat_included: row.get("VAT_INCLUDED")?,
            price_type: row.get("PRICE_TYPE")?,
            without_order: row.get("WITHOUT_ORDER")?,
            select_best_price: row.get("SELECT_BEST_PRICE")?,
            price: row.get("PRICE")?,
            vat_rate: row.get("VAT_RATE")?,
            offers: Vec::new(),
        })
    }
}

impl Resource for CatalogProduct {
    const NAME: &'static str = "CatalogProduct";
    const TABLE: &'static str = "b_catalog_product";
    const ALIAS: &'static str = "p";
    const COLUMNS: &'static [&'static str] = &[
        "ID",
        "AVAILABLE",
        "QUANTITY",
        "QUANTITY_RESERVED",
        "WEIGHT",
        "WIDTH",
        "LENGTH",
        "HEIGHT",
        "MEASURE",
        "TYPE",
        "VAT_INCLUDED",
        "PRICE_TYPE",
        "WITHOUT_ORDER",
        "SELECT_BEST_PRICE",
    ];
    const COMPUTED: &'static [(&'static str, &'static str)] =
        &[("PRICE", PRICE_SQL), ("VAT_RATE", VAT_RATE_SQL)];
    const FILTERABLE: &'static [&'static str] = &["ID", "AVAILABLE", "TYPE", "QUANTITY"];
    const DEFAULT_ORDER: &'static str = "ID ASC";
}

/// Reads catalog products.
#[derive(Debug, Clone)]
pub struct CatalogAccessor<E: QueryEngine> {
    engine: E,
    offers_sql: Arc<str>,
}

impl<E: QueryEngine> CatalogAccessor<E> {
    /// Create an accessor; `settings` must already be validated.
    pub fn new(engine: E, settings: &CatalogSettings) -> Self {
        Self {
            engine,
            offers_sql: offers_sql(settings).into(),
        }
    }

    /// One product with its offers.
    pub async fn info(&self, product_id: u64) -> QueryResult<CatalogProduct> {
        let mut conn = self.engine.acquire().await?;
        let mut product =
            find_unique::<CatalogProduct, _>(&mut conn, "ID", product_id.to_string()).await?;
        product.offers = self.load_offers(&mut conn, product.id).await?;
        Ok(product)
    }

    /// Whether the product has any offers.
    pub async fn has_offers(&self, product_id: u64) -> QueryResult<bool> {
        Ok(self.info(product_id).await?.has_offers())
    }

    /// Products matching a filter document, each with its offers.
    pub async fn list(&self, doc: &FilterDocument) -> QueryResult<Vec<CatalogProduct>> {
        let mut conn = self.engine.acquire().await?;
        let mut products = find_many::<CatalogProduct, _>(&mut conn, doc).await?;
        for product in &mut products {
            product.offers = self.load_offers(&mut conn, product.id).await?;
        }
        Ok(products)
    }

    async fn load_offers<C: EngineConnection>(
        &self,
        conn: &mut C,
        product_id: u64,
    ) -> QueryResult<Vec<u64>> {
        let rows = conn
            .query(&self.offers_sql, vec![FilterValue::UInt(product_id)])
            .await?;
        let offers = rows
            .iter()
            .map(|row| row.first::<u64>())
            .collect::<QueryResult<Vec<_>>>()
            .map_err(|e| e.with_resource(CatalogProduct::NAME))?;
        debug!(product_id, offers = offers.len(), "loaded offers");
        Ok(offers)
    }
}

fn offers_sql(settings: &CatalogSettings) -> String {
    format!(
        "SELECT IBLOCK_ELEMENT_ID FROM {} WHERE PROPERTY_{} = ?",
        quote_identifier(&settings.offers_table),
        settings.offers_link_property
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitrix_query::testing::MockEngine;
    use bitrix_query::{ErrorKind, SqlValue};
    use pretty_assertions::assert_eq;

    fn product_row(id: u64) -> Row {
        Row::new()
            .with("ID", id)
            .with("AVAILABLE", "Y")
            .with("QUANTITY", "12.0000")
            .with("QUANTITY_RESERVED", SqlValue::Null)
            .with("WEIGHT", 1500.0)
            .with("WIDTH", SqlValue::Null)
            .with("LENGTH", SqlValue::Null)
            .with("HEIGHT", SqlValue::Null)
            .with("MEASURE", 5i64)
            .with("TYPE", "1")
            .with("VAT_INCLUDED", "N")
            .with("PRICE_TYPE", "S")
            .with("WITHOUT_ORDER", "N")
            .with("SELECT_BEST_PRICE", "Y")
            .with("PRICE", "2490.00")
            .with("VAT_RATE", SqlValue::Null)
    }

    fn offer(id: u64) -> Row {
        Row::new().with("IBLOCK_ELEMENT_ID", id)
    }

    fn accessor(engine: MockEngine) -> CatalogAccessor<MockEngine> {
        CatalogAccessor::new(engine, &CatalogSettings::default())
    }

    #[tokio::test]
    async fn test_info_loads_offers() {
        let engine = MockEngine::new()
            .on("b_iblock_element_prop_s4", vec![offer(9001), offer(9002)])
            .on("FROM b_catalog_product p", vec![product_row(77)]);
        let product = accessor(engine.clone()).info(77).await.unwrap();

        assert_eq!(product.id, 77);
        assert_eq!(product.offers, vec![9001, 9002]);
        assert!(product.has_offers());

        let executed = engine.executed();
        assert_eq!(executed.len(), 2);
        assert!(executed[0].sql.contains(
            "(SELECT PRICE FROM b_catalog_price WHERE PRODUCT_ID = p.ID LIMIT 1) AS PRICE"
        ));
        assert!(executed[0].sql.ends_with(" WHERE p.ID = ? ORDER BY ID ASC LIMIT 1"));
        assert_eq!(
            executed[1].sql,
            "SELECT IBLOCK_ELEMENT_ID FROM `b_iblock_element_prop_s4` WHERE PROPERTY_3451 = ?"
        );
        assert_eq!(executed[1].params, vec![FilterValue::UInt(77)]);
        assert_eq!(engine.acquired(), 1);
        assert_eq!(engine.released(), 1);
    }

    #[tokio::test]
    async fn test_has_offers_false_without_linkage_rows() {
        let engine = MockEngine::new().on("FROM b_catalog_product p", vec![product_row(5)]);
        assert!(!accessor(engine).has_offers(5).await.unwrap());
    }

    #[tokio::test]
    async fn test_has_offers_true_with_one_row() {
        let engine = MockEngine::new()
            .on("PROPERTY_3451", vec![offer(10)])
            .on("FROM b_catalog_product p", vec![product_row(5)]);
        assert!(accessor(engine).has_offers(5).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let err = accessor(MockEngine::new()).info(999999).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_configured_offer_table() {
        let engine = MockEngine::new().on("FROM b_catalog_product p", vec![product_row(5)]);
        let settings = CatalogSettings {
            offers_table: "b_iblock_element_prop_s12".into(),
            offers_link_property: 88,
        };
        CatalogAccessor::new(engine.clone(), &settings).info(5).await.unwrap();
        assert_eq!(
            engine.executed()[1].sql,
            "SELECT IBLOCK_ELEMENT_ID FROM `b_iblock_element_prop_s12` WHERE PROPERTY_88 = ?"
        );
    }

    #[tokio::test]
    async fn test_offer_query_failure_aborts_list() {
        let engine = MockEngine::new()
            .fail("PROPERTY_3451", "Table 'bitrix.b_iblock_element_prop_s4' doesn't exist")
            .on("FROM b_catalog_product p", vec![product_row(1), product_row(2)]);
        let err = accessor(engine.clone())
            .list(&FilterDocument::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Query);
        assert_eq!(engine.executed().len(), 2);
    }

    #[tokio::test]
    async fn test_json_projection() {
        let engine = MockEngine::new().on("FROM b_catalog_product p", vec![product_row(3)]);
        let product = accessor(engine).info(3).await.unwrap();
        let json = serde_json::to_value(&product).unwrap();

        assert_eq!(json["type"], "1");
        assert_eq!(json["vat"], 0.0);
        assert_eq!(json["price"], 2490.0);
        assert_eq!(json["vat_included"], false);
        assert_eq!(json["quantity_reserved"], 0);
        assert_eq!(json["offers"], serde_json::json!([]));
    }
}
