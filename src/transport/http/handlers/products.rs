use crate::domain::model::Resource;
use crate::domain::query::{compose_product_listing, ListQuery, ProductListParams};
use crate::transport::http::handlers::common::{self, ApiResult, JsonBody};
use crate::transport::http::types::{ApiResponse, AppState, ProductInput};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value as JsonValue;

const PRODUCT: Resource = Resource::Product;

#[utoipa::path(
    get,
    path = "/products",
    params(ProductListParams),
    responses(
        (status = 200, description = "Products, filtered, sorted and paginated when any parameter is given", body = ApiResponse)
    )
)]
pub async fn list_products_handler(
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> ApiResult {
    match compose_product_listing(&params) {
        ListQuery::Unfiltered => common::list_all(&state, PRODUCT).await,
        ListQuery::Filtered(query) => {
            tracing::debug!(?query, "product listing");
            let records = state.storage.query(PRODUCT, &query).await?;
            Ok(Json(ApiResponse::data(JsonValue::Array(records))))
        }
    }
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "The product", body = ApiResponse),
        (status = 404, description = "No such product", body = ApiResponse)
    )
)]
pub async fn get_product_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    common::fetch_one(&state, PRODUCT, &id).await
}

#[utoipa::path(
    get,
    path = "/products/{id}/details",
    params(("id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product with its category and reviews (each with its author)", body = ApiResponse),
        (status = 404, description = "No such product", body = ApiResponse)
    )
)]
pub async fn get_product_details_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    common::fetch_details(&state, PRODUCT, &id).await
}

#[utoipa::path(
    post,
    path = "/products",
    request_body(content = ProductInput, description = "name, categoryId and price are required"),
    responses(
        (status = 201, description = "Product created", body = ApiResponse),
        (status = 400, description = "Invalid input or unknown category", body = ApiResponse)
    )
)]
pub async fn create_product_handler(
    State(state): State<AppState>,
    body: JsonBody,
) -> ApiResult<(StatusCode, Json<ApiResponse>)> {
    common::create(&state, PRODUCT, body).await
}

#[utoipa::path(
    patch,
    path = "/products/{id}",
    params(("id" = i64, Path, description = "Product id")),
    request_body(content = ProductInput, description = "Any subset of the product's writable fields"),
    responses(
        (status = 200, description = "Product updated", body = ApiResponse),
        (status = 400, description = "No valid fields provided", body = ApiResponse),
        (status = 404, description = "No such product", body = ApiResponse)
    )
)]
pub async fn update_product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody,
) -> ApiResult {
    common::update(&state, PRODUCT, &id, body).await
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted", body = ApiResponse),
        (status = 404, description = "No such product", body = ApiResponse)
    )
)]
pub async fn delete_product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    common::remove(&state, PRODUCT, &id).await
}
