use crate::domain::model::Resource;
use crate::transport::http::handlers::common::{self, ApiResult, JsonBody};
use crate::transport::http::types::{ApiResponse, AppState, CategoryInput};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

const CATEGORY: Resource = Resource::Category;

#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "All categories", body = ApiResponse))
)]
pub async fn list_categories_handler(State(state): State<AppState>) -> ApiResult {
    common::list_all(&state, CATEGORY).await
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "The category", body = ApiResponse),
        (status = 404, description = "No such category", body = ApiResponse)
    )
)]
pub async fn get_category_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    common::fetch_one(&state, CATEGORY, &id).await
}

#[utoipa::path(
    get,
    path = "/categories/{id}/details",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category with its products", body = ApiResponse),
        (status = 404, description = "No such category", body = ApiResponse)
    )
)]
pub async fn get_category_details_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    common::fetch_details(&state, CATEGORY, &id).await
}

#[utoipa::path(
    post,
    path = "/categories",
    request_body(content = CategoryInput, description = "name is required and unique"),
    responses(
        (status = 201, description = "Category created", body = ApiResponse),
        (status = 409, description = "Name already taken", body = ApiResponse)
    )
)]
pub async fn create_category_handler(
    State(state): State<AppState>,
    body: JsonBody,
) -> ApiResult<(StatusCode, Json<ApiResponse>)> {
    common::create(&state, CATEGORY, body).await
}

#[utoipa::path(
    patch,
    path = "/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    request_body(content = CategoryInput, description = "name and/or description"),
    responses(
        (status = 200, description = "Category updated", body = ApiResponse),
        (status = 400, description = "No valid fields provided", body = ApiResponse),
        (status = 404, description = "No such category", body = ApiResponse)
    )
)]
pub async fn update_category_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody,
) -> ApiResult {
    common::update(&state, CATEGORY, &id, body).await
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category deleted", body = ApiResponse),
        (status = 400, description = "Category still has products", body = ApiResponse),
        (status = 404, description = "No such category", body = ApiResponse)
    )
)]
pub async fn delete_category_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    common::remove(&state, CATEGORY, &id).await
}
