//! Route handlers.
//!
//! Records are returned as JSON. Aggregates are returned as bare text bodies:
//! the line count as an integer, cost and weight with two decimals, offer
//! existence as `true`/`false`. List routes take the filter document as the
//! request body.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use bitrix_query::{FilterDocument, QueryEngine};
use bitrix_resources::basket::format_amount;
use bitrix_resources::{
    BasketItem, CatalogProduct, ContentElement, ContentSection, ElementProperty, Resources,
};

use crate::error::{ApiError, ApiResult};
use crate::key::{ResourceKey, parse_id};

/// All routes, before state is attached.
pub fn routes<E: QueryEngine>() -> Router<Resources<E>> {
    Router::new()
        .route("/basket/{fuser_id}/items/", get(basket_items::<E>))
        .route(
            "/basket/{fuser_id}/product/{product_id}/",
            get(basket_product::<E>),
        )
        .route("/basket/{fuser_id}/count/", get(basket_count::<E>))
        .route("/basket/{fuser_id}/cost/", get(basket_cost::<E>))
        .route("/basket/{fuser_id}/weight/", get(basket_weight::<E>))
        .route("/catalog/{product_id}/info/", get(catalog_info::<E>))
        .route(
            "/catalog/{product_id}/have-offers/",
            get(catalog_have_offers::<E>),
        )
        .route("/element/list/", post(element_list::<E>))
        .route("/element/{element}/info/", get(element_info::<E>))
        .route("/element/{element}/props/", get(element_props::<E>))
        .route("/section/list/", post(section_list::<E>))
        .route("/section/{section}/info/", get(section_info::<E>))
}

async fn basket_items<E: QueryEngine>(
    State(resources): State<Resources<E>>,
    Path(fuser_id): Path<String>,
) -> ApiResult<Json<Vec<BasketItem>>> {
    let fuser_id = parse_id(&fuser_id)?;
    Ok(Json(resources.basket().items(fuser_id).await?))
}

async fn basket_product<E: QueryEngine>(
    State(resources): State<Resources<E>>,
    Path((fuser_id, product_id)): Path<(String, String)>,
) -> ApiResult<Json<BasketItem>> {
    let fuser_id = parse_id(&fuser_id)?;
    let product_id = parse_id(&product_id)?;
    Ok(Json(resources.basket().product(fuser_id, product_id).await?))
}

async fn basket_count<E: QueryEngine>(
    State(resources): State<Resources<E>>,
    Path(fuser_id): Path<String>,
) -> ApiResult<String> {
    let fuser_id = parse_id(&fuser_id)?;
    Ok(resources.basket().count(fuser_id).await?.to_string())
}

async fn basket_cost<E: QueryEngine>(
    State(resources): State<Resources<E>>,
    Path(fuser_id): Path<String>,
) -> ApiResult<String> {
    let fuser_id = parse_id(&fuser_id)?;
    Ok(format_amount(resources.basket().total_cost(fuser_id).await?))
}

async fn basket_weight<E: QueryEngine>(
    State(resources): State<Resources<E>>,
    Path(fuser_id): Path<String>,
) -> ApiResult<String> {
    let fuser_id = parse_id(&fuser_id)?;
    Ok(format_amount(resources.basket().total_weight(fuser_id).await?))
}

async fn catalog_info<E: QueryEngine>(
    State(resources): State<Resources<E>>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<CatalogProduct>> {
    let product_id = parse_id(&product_id)?;
    Ok(Json(resources.catalog().info(product_id).await?))
}

async fn catalog_have_offers<E: QueryEngine>(
    State(resources): State<Resources<E>>,
    Path(product_id): Path<String>,
) -> ApiResult<&'static str> {
    let product_id = parse_id(&product_id)?;
    let has_offers = resources.catalog().has_offers(product_id).await?;
    Ok(if has_offers { "true" } else { "false" })
}

async fn element_info<E: QueryEngine>(
    State(resources): State<Resources<E>>,
    Path(element): Path<String>,
) -> ApiResult<Json<ContentElement>> {
    let element = match ResourceKey::parse(&element)? {
        ResourceKey::Id(id) => resources.element().by_id(id).await?,
        ResourceKey::Code(code) => resources.element().by_code(&code).await?,
    };
    Ok(Json(element))
}

async fn element_props<E: QueryEngine>(
    State(resources): State<Resources<E>>,
    Path(element): Path<String>,
) -> ApiResult<Json<Vec<ElementProperty>>> {
    // Properties are addressed by id only.
    match ResourceKey::parse(&element)? {
        ResourceKey::Id(id) => Ok(Json(resources.element().properties(id).await?)),
        ResourceKey::Code(code) => Err(ApiError::UnknownKey(code)),
    }
}

async fn element_list<E: QueryEngine>(
    State(resources): State<Resources<E>>,
    body: Bytes,
) -> ApiResult<Json<Vec<ContentElement>>> {
    let doc = filter_document(&body)?;
    Ok(Json(resources.element().list(&doc).await?))
}

async fn section_info<E: QueryEngine>(
    State(resources): State<Resources<E>>,
    Path(section): Path<String>,
) -> ApiResult<Json<ContentSection>> {
    let section = match ResourceKey::parse(&section)? {
        ResourceKey::Id(id) => resources.section().by_id(id).await?,
        ResourceKey::Code(code) => resources.section().by_code(&code).await?,
    };
    Ok(Json(section))
}

async fn section_list<E: QueryEngine>(
    State(resources): State<Resources<E>>,
    body: Bytes,
) -> ApiResult<Json<Vec<ContentSection>>> {
    let doc = filter_document(&body)?;
    Ok(Json(resources.section().list(&doc).await?))
}

/// An empty body lists with defaults.
fn filter_document(body: &[u8]) -> ApiResult<FilterDocument> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(FilterDocument::new());
    }
    Ok(FilterDocument::from_json(body)?)
}
