//! Shopping basket lines (`b_sale_basket`).
//!
//! A basket belongs to a fuser (the platform's anonymous-or-logged-in buyer
//! id). Ad-hoc lists follow the usual `SORT ASC` order and row cap; the
//! per-basket reads behind the aggregates fetch every line in `ID` order.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;
use tracing::debug;

use bitrix_query::{
    FilterDocument, FromRow, NullInt64, NullString, PlatformBool, QueryEngine, QueryError,
    QueryResult, Resource, Row, find_all, find_many,
};

const SECTION_NAME_SQL: &str = "SELECT s.NAME FROM b_iblock_section s WHERE s.ID = \
     (SELECT e.IBLOCK_SECTION_ID FROM b_iblock_element e WHERE e.ID = b.PRODUCT_ID)";

/// Grams per weight unit reported by the weight aggregate.
const GRAMS_PER_KILOGRAM: i64 = 1000;

/// One basket line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasketItem {
    pub base_price: f64,
    pub can_buy: PlatformBool,
    pub currency: String,
    pub custom_price: PlatformBool,
    pub date_insert: String,
    pub delay: PlatformBool,
    pub detail_page_url: NullString,
    #[serde(rename = "discont")]
    pub discount: f64,
    pub fuser_id: u64,
    pub id: u64,
    pub section_name: NullString,
    pub name: String,
    pub notes: NullString,
    pub order_id: NullInt64,
    pub price: f64,
    pub price_type_id: NullInt64,
    pub product_id: u64,
    pub quantity: f64,
    pub reserved: PlatformBool,
    #[serde(rename = "reserved_quantity")]
    pub reserve_quantity: NullInt64,
    pub sort: i64,
    #[serde(rename = "vat_include")]
    pub vat_included: PlatformBool,
    pub vat_rate: f64,
    pub weight: f64,
}

impl FromRow for BasketItem {
    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            base_price: row.get("BASE_PRICE")?,
            can_buy: row.get("CAN_BUY")?,
            currency: row.get("CURRENCY")?,
            custom_price: row.get("CUSTOM_PRICE")?,
            date_insert: row.get("DATE_INSERT")?,
            delay: row.get("DELAY")?,
            detail_page_url: row.get("DETAIL_PAGE_URL")?,
            discount: row.get("DISCOUNT_PRICE")?,
            fuser_id: row.get("FUSER_ID")?,
            id: row.get("ID")?,
            section_name: row.get("SECTION_NAME")?,
            name: row.get("NAME")?,
            notes: row.get("NOTES")?,
            order_id: row.get("ORDER_ID")?,
            price: row.get("PRICE")?,
            price_type_id: row.get("PRICE_TYPE_ID")?,
            product_id: row.get("PRODUCT_ID")?,
            quantity: row.get("QUANTITY")?,
            reserved: row.get("RESERVED")?,
            reserve_quantity: row.get("RESERVE_QUANTITY")?,
            sort: row.get("SORT")?,
            vat_included: row.get("VAT_INCLUDED")?,
            vat_rate: row.get("VAT_RATE")?,
            weight: row.get("WEIGHT")?,
        })
    }
}

impl Resource for BasketItem {
    const NAME: &'static str = "BasketItem";
    const TABLE: &'static str = "b_sale_basket";
    const ALIAS: &'static str = "b";
    const COLUMNS: &'static [&'static str] = &[
        "BASE_PRICE",
        "CAN_BUY",
        "CURRENCY",
        "CUSTOM_PRICE",
        "DATE_INSERT",
        "DELAY",
        "DETAIL_PAGE_URL",
        "DISCOUNT_PRICE",
        "FUSER_ID",
        "ID",
        "NAME",
        "NOTES",
        "ORDER_ID",
        "PRICE",
        "PRICE_TYPE_ID",
        "PRODUCT_ID",
        "QUANTITY",
        "RESERVED",
        "RESERVE_QUANTITY",
        "SORT",
        "VAT_INCLUDED",
        "VAT_RATE",
        "WEIGHT",
    ];
    const COMPUTED: &'static [(&'static str, &'static str)] = &[("SECTION_NAME", SECTION_NAME_SQL)];
    const FILTERABLE: &'static [&'static str] = &["FUSER_ID", "PRODUCT_ID", "ORDER_ID", "ID"];
}

/// Reads basket lines.
#[derive(Debug, Clone)]
pub struct BasketAccessor<E: QueryEngine> {
    engine: E,
}

impl<E: QueryEngine> BasketAccessor<E> {
    /// Create an accessor over `engine`.
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Every line of a basket, in insertion order and without a row cap.
    pub async fn items(&self, fuser_id: u64) -> QueryResult<Vec<BasketItem>> {
        self.all(&Self::owned_by(fuser_id)).await
    }

    /// Basket lines matching a filter document.
    pub async fn list(&self, doc: &FilterDocument) -> QueryResult<Vec<BasketItem>> {
        let mut conn = self.engine.acquire().await?;
        find_many::<BasketItem, _>(&mut conn, doc).await
    }

    /// The line holding `product_id`.
    pub async fn product(&self, fuser_id: u64, product_id: u64) -> QueryResult<BasketItem> {
        let doc = Self::owned_by(fuser_id).filter("PRODUCT_ID", product_id.to_string());
        self.all(&doc)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::not_found(BasketItem::NAME))
    }

    /// Number of lines.
    pub async fn count(&self, fuser_id: u64) -> QueryResult<usize> {
        Ok(self.items(fuser_id).await?.len())
    }

    /// Sum of line prices, rounded to two decimals.
    pub async fn total_cost(&self, fuser_id: u64) -> QueryResult<Decimal> {
        let items = self.items(fuser_id).await?;
        total_cost(&items)
    }

    /// Sum of line weights in kilograms, rounded to two decimals.
    pub async fn total_weight(&self, fuser_id: u64) -> QueryResult<Decimal> {
        let items = self.items(fuser_id).await?;
        total_weight(&items)
    }

    async fn all(&self, doc: &FilterDocument) -> QueryResult<Vec<BasketItem>> {
        let mut conn = self.engine.acquire().await?;
        find_all::<BasketItem, _>(&mut conn, doc).await
    }

    fn owned_by(fuser_id: u64) -> FilterDocument {
        FilterDocument::new()
            .filter("FUSER_ID", fuser_id.to_string())
            .order("ID ASC")
    }
}

fn to_decimal(column: &str, value: f64) -> QueryResult<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| QueryError::type_mismatch(column, format!("{} is not a finite amount", value)))
}

/// Sum of `PRICE` over `items`.
pub fn total_cost(items: &[BasketItem]) -> QueryResult<Decimal> {
    let mut sum = Decimal::ZERO;
    for item in items {
        sum += to_decimal("PRICE", item.price)?;
    }
    debug!(lines = items.len(), total = %sum, "basket cost");
    Ok(sum.round_dp(2))
}

/// Sum of `WEIGHT` over `items`, converted from grams.
pub fn total_weight(items: &[BasketItem]) -> QueryResult<Decimal> {
    let mut grams = Decimal::ZERO;
    for item in items {
        grams += to_decimal("WEIGHT", item.weight)?;
    }
    Ok((grams / Decimal::from(GRAMS_PER_KILOGRAM)).round_dp(2))
}

/// Render an aggregate with exactly two decimals.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitrix_query::testing::MockEngine;
    use bitrix_query::{ErrorKind, FilterValue, SqlValue};
    use pretty_assertions::assert_eq;

    fn basket_row(id: u64, product_id: u64, price: &str, weight: f64) -> Row {
        Row::new()
            .with("BASE_PRICE", price)
            .with("CAN_BUY", "Y")
            .with("CURRENCY", "RUB")
            .with("CUSTOM_PRICE", "N")
            .with("DATE_INSERT", "2021-03-07 14:05:09")
            .with("DELAY", "N")
            .with("DETAIL_PAGE_URL", SqlValue::Null)
            .with("DISCOUNT_PRICE", "0.00")
            .with("FUSER_ID", 42u64)
            .with("ID", id)
            .with("NAME", "Oak chair")
            .with("NOTES", SqlValue::Null)
            .with("ORDER_ID", SqlValue::Null)
            .with("PRICE", price)
            .with("PRICE_TYPE_ID", 1i64)
            .with("PRODUCT_ID", product_id)
            .with("QUANTITY", "1.0000")
            .with("RESERVED", "N")
            .with("RESERVE_QUANTITY", SqlValue::Null)
            .with("SORT", 100i64)
            .with("VAT_INCLUDED", "Y")
            .with("VAT_RATE", "0.20")
            .with("WEIGHT", weight)
            .with("SECTION_NAME", "Chairs")
    }

    fn engine() -> MockEngine {
        MockEngine::new().on(
            "FROM b_sale_basket b",
            vec![
                basket_row(1, 501, "10.50", 1500.0),
                basket_row(2, 502, "3.25", 2500.0),
            ],
        )
    }

    #[tokio::test]
    async fn test_items_query_shape() {
        let engine = engine();
        let items = BasketAccessor::new(engine.clone()).items(42).await.unwrap();
        assert_eq!(items.len(), 2);

        let executed = engine.executed();
        assert!(executed[0].sql.contains("AS SECTION_NAME FROM b_sale_basket b"));
        assert!(executed[0].sql.ends_with(" WHERE b.FUSER_ID = ? ORDER BY ID ASC"));
        assert_eq!(executed[0].params, vec![FilterValue::from("42")]);
        assert_eq!(engine.released(), 1);
    }

    #[tokio::test]
    async fn test_list_uses_default_order_and_limit() {
        let engine = engine();
        BasketAccessor::new(engine.clone())
            .list(&FilterDocument::new())
            .await
            .unwrap();

        let executed = engine.executed();
        assert!(
            executed[0]
                .sql
                .ends_with(" FROM b_sale_basket b ORDER BY SORT ASC LIMIT 100")
        );
        assert!(executed[0].params.is_empty());
    }

    #[tokio::test]
    async fn test_total_cost_scenario() {
        let cost = BasketAccessor::new(engine()).total_cost(42).await.unwrap();
        assert_eq!(format_amount(cost), "13.75");
    }

    #[tokio::test]
    async fn test_total_weight_scenario() {
        let weight = BasketAccessor::new(engine()).total_weight(42).await.unwrap();
        assert_eq!(format_amount(weight), "4.00");
    }

    #[tokio::test]
    async fn test_count() {
        assert_eq!(BasketAccessor::new(engine()).count(42).await.unwrap(), 2);
        assert_eq!(BasketAccessor::new(MockEngine::new()).count(7).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_basket_aggregates() {
        let basket = BasketAccessor::new(MockEngine::new());
        assert_eq!(format_amount(basket.total_cost(1).await.unwrap()), "0.00");
        assert_eq!(format_amount(basket.total_weight(1).await.unwrap()), "0.00");
    }

    #[tokio::test]
    async fn test_product_filters_by_both_ids() {
        let engine = MockEngine::new().on("FROM b_sale_basket b", vec![basket_row(2, 502, "3.25", 0.0)]);
        let item = BasketAccessor::new(engine.clone()).product(42, 502).await.unwrap();
        assert_eq!(item.product_id, 502);

        let executed = engine.executed();
        assert!(executed[0].sql.contains("WHERE b.FUSER_ID = ? AND b.PRODUCT_ID = ?"));
        assert_eq!(
            executed[0].params,
            vec![FilterValue::from("42"), FilterValue::from("502")]
        );
    }

    #[tokio::test]
    async fn test_product_absent_is_not_found() {
        let err = BasketAccessor::new(MockEngine::new())
            .product(42, 999)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_json_projection() {
        let items = BasketAccessor::new(engine()).items(42).await.unwrap();
        let json = serde_json::to_value(&items[0]).unwrap();

        assert_eq!(json["discont"], 0.0);
        assert_eq!(json["vat_include"], true);
        assert_eq!(json["custom_price"], false);
        assert_eq!(json["order_id"], 0);
        assert_eq!(json["reserved_quantity"], 0);
        assert_eq!(json["detail_page_url"], "");
        assert_eq!(json["section_name"], "Chairs");
        assert_eq!(json["price"], 10.5);
        assert!(json.get("reserve_quantity").is_none());
    }

    #[tokio::test]
    async fn test_query_failure_surfaces() {
        let engine = MockEngine::new().fail("b_sale_basket", "Lost connection to MySQL server");
        let err = BasketAccessor::new(engine.clone()).total_cost(42).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Query);
        assert_eq!(engine.released(), 1);
    }

    #[test]
    fn test_non_finite_amount_rejected() {
        let mut item = BasketItem::from_row(&basket_row(1, 1, "1.00", 0.0)).unwrap();
        item.price = f64::NAN;
        let err = total_cost(&[item]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
