use crate::domain::model::Resource;
use crate::transport::http::handlers::common::{self, ApiResult, JsonBody};
use crate::transport::http::types::{ApiResponse, AppState, UserInput};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

const USER: Resource = Resource::User;

#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "All users", body = ApiResponse))
)]
pub async fn list_users_handler(State(state): State<AppState>) -> ApiResult {
    common::list_all(&state, USER).await
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = ApiResponse),
        (status = 404, description = "No such user", body = ApiResponse)
    )
)]
pub async fn get_user_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    common::fetch_one(&state, USER, &id).await
}

#[utoipa::path(
    get,
    path = "/users/{id}/details",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User with the reviews they wrote", body = ApiResponse),
        (status = 404, description = "No such user", body = ApiResponse)
    )
)]
pub async fn get_user_details_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    common::fetch_details(&state, USER, &id).await
}

#[utoipa::path(
    post,
    path = "/users",
    request_body(content = UserInput, description = "username, email and passwordHash are required"),
    responses(
        (status = 201, description = "User created", body = ApiResponse),
        (status = 409, description = "Username or email already taken", body = ApiResponse)
    )
)]
pub async fn create_user_handler(
    State(state): State<AppState>,
    body: JsonBody,
) -> ApiResult<(StatusCode, Json<ApiResponse>)> {
    common::create(&state, USER, body).await
}

#[utoipa::path(
    patch,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body(content = UserInput, description = "Any subset of the user's writable fields"),
    responses(
        (status = 200, description = "User updated", body = ApiResponse),
        (status = 400, description = "No valid fields provided", body = ApiResponse),
        (status = 404, description = "No such user", body = ApiResponse),
        (status = 409, description = "Username or email already taken", body = ApiResponse)
    )
)]
pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody,
) -> ApiResult {
    common::update(&state, USER, &id, body).await
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted along with their reviews and cart", body = ApiResponse),
        (status = 404, description = "No such user", body = ApiResponse)
    )
)]
pub async fn delete_user_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    common::remove(&state, USER, &id).await
}
