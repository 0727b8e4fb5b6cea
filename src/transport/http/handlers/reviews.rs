use crate::domain::model::Resource;
use crate::domain::query::{
    compose_product_reviews, compose_review_search, ListQuery, ProductReviewsParams,
    ReviewSearchParams,
};
use crate::storage::ReviewStats;
use crate::transport::http::error::ApiError;
use crate::transport::http::handlers::common::{self, ApiResult, JsonBody};
use crate::transport::http::types::{ApiResponse, AppState, ReviewInput};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value as JsonValue;

const REVIEW: Resource = Resource::Review;

/// Product id from the path, checked against storage.
async fn existing_product(state: &AppState, raw_id: &str) -> Result<i64, ApiError> {
    let id = common::resource_id(Resource::Product, raw_id)?;
    match state.storage.find_by_id(Resource::Product, id).await? {
        Some(_) => Ok(id),
        None => Err(common::not_found(Resource::Product)),
    }
}

#[utoipa::path(
    get,
    path = "/reviews",
    responses((status = 200, description = "All reviews", body = ApiResponse))
)]
pub async fn list_reviews_handler(State(state): State<AppState>) -> ApiResult {
    common::list_all(&state, REVIEW).await
}

#[utoipa::path(
    get,
    path = "/reviews/search",
    params(ReviewSearchParams),
    responses(
        (status = 200, description = "Matching reviews; rating descending unless another sort is asked for", body = ApiResponse)
    )
)]
pub async fn search_reviews_handler(
    State(state): State<AppState>,
    Query(params): Query<ReviewSearchParams>,
) -> ApiResult {
    match compose_review_search(&params) {
        ListQuery::Unfiltered => common::list_all(&state, REVIEW).await,
        ListQuery::Filtered(query) => {
            tracing::debug!(?query, "review search");
            let records = state.storage.query(REVIEW, &query).await?;
            Ok(Json(ApiResponse::data(JsonValue::Array(records))))
        }
    }
}

#[utoipa::path(
    get,
    path = "/reviews/product/{productId}",
    params(
        ("productId" = i64, Path, description = "Product id"),
        ProductReviewsParams
    ),
    responses(
        (status = 200, description = "Reviews of the product", body = ApiResponse),
        (status = 404, description = "No such product", body = ApiResponse)
    )
)]
pub async fn product_reviews_handler(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Query(params): Query<ProductReviewsParams>,
) -> ApiResult {
    let product_id = existing_product(&state, &product_id).await?;
    let query = compose_product_reviews(product_id, &params);
    let records = state.storage.query(REVIEW, &query).await?;
    Ok(Json(ApiResponse::data(JsonValue::Array(records))))
}

#[utoipa::path(
    get,
    path = "/reviews/product/{productId}/stats",
    params(("productId" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Rating distribution of the product", body = ReviewStats),
        (status = 404, description = "No such product", body = ApiResponse)
    )
)]
pub async fn review_stats_handler(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult {
    let product_id = existing_product(&state, &product_id).await?;
    let stats = state.storage.review_stats(product_id).await?;
    let data = serde_json::to_value(stats).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(ApiResponse::data(data)))
}

#[utoipa::path(
    patch,
    path = "/reviews/{id}/like",
    params(("id" = i64, Path, description = "Review id")),
    responses(
        (status = 200, description = "Like counter incremented", body = ApiResponse),
        (status = 404, description = "No such review", body = ApiResponse)
    )
)]
pub async fn like_review_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = common::resource_id(REVIEW, &id)?;
    let review = state
        .storage
        .like_review(id)
        .await?
        .ok_or_else(|| common::not_found(REVIEW))?;
    Ok(Json(ApiResponse::message("Review liked", Some(review))))
}

#[utoipa::path(
    get,
    path = "/reviews/{id}",
    params(("id" = i64, Path, description = "Review id")),
    responses(
        (status = 200, description = "The review", body = ApiResponse),
        (status = 404, description = "No such review", body = ApiResponse)
    )
)]
pub async fn get_review_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    common::fetch_one(&state, REVIEW, &id).await
}

#[utoipa::path(
    get,
    path = "/reviews/{id}/details",
    params(("id" = i64, Path, description = "Review id")),
    responses(
        (status = 200, description = "Review with its product and author", body = ApiResponse),
        (status = 404, description = "No such review", body = ApiResponse)
    )
)]
pub async fn get_review_details_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    common::fetch_details(&state, REVIEW, &id).await
}

#[utoipa::path(
    post,
    path = "/reviews",
    request_body(content = ReviewInput, description = "productId, userId and rating are required"),
    responses(
        (status = 201, description = "Review created", body = ApiResponse),
        (status = 400, description = "Invalid input or unknown product/user", body = ApiResponse)
    )
)]
pub async fn create_review_handler(
    State(state): State<AppState>,
    body: JsonBody,
) -> ApiResult<(StatusCode, Json<ApiResponse>)> {
    common::create(&state, REVIEW, body).await
}

#[utoipa::path(
    patch,
    path = "/reviews/{id}",
    params(("id" = i64, Path, description = "Review id")),
    request_body(content = ReviewInput, description = "Any subset of the review's writable fields"),
    responses(
        (status = 200, description = "Review updated", body = ApiResponse),
        (status = 400, description = "No valid fields provided", body = ApiResponse),
        (status = 404, description = "No such review", body = ApiResponse)
    )
)]
pub async fn update_review_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody,
) -> ApiResult {
    common::update(&state, REVIEW, &id, body).await
}

#[utoipa::path(
    delete,
    path = "/reviews/{id}",
    params(("id" = i64, Path, description = "Review id")),
    responses(
        (status = 200, description = "Review deleted", body = ApiResponse),
        (status = 404, description = "No such review", body = ApiResponse)
    )
)]
pub async fn delete_review_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    common::remove(&state, REVIEW, &id).await
}
