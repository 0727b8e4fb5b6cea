//! Helpers shared by the per-resource handlers.

use crate::domain::model::Resource;
use crate::domain::update::{normalize, TypedUpdateSet};
use crate::transport::http::error::ApiError;
use crate::transport::http::types::{ApiResponse, AppState};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{Map, Value as JsonValue};

/// Request body as extracted by axum, with the rejection kept for translation.
pub type JsonBody = Result<Json<JsonValue>, JsonRejection>;

pub type ApiResult<T = Json<ApiResponse>> = Result<T, ApiError>;

/// Positive decimal identifier from a path segment.
pub fn parse_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

pub fn not_found(resource: Resource) -> ApiError {
    ApiError::not_found(format!("{} not found", resource.label()))
}

/// Resource identifier from the path; a malformed one names no record.
pub fn resource_id(resource: Resource, raw: &str) -> Result<i64, ApiError> {
    parse_id(raw).ok_or_else(|| not_found(resource))
}

pub fn payload_object(body: JsonBody) -> Result<Map<String, JsonValue>, ApiError> {
    match body? {
        Json(JsonValue::Object(map)) => Ok(map),
        Json(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}

/// Rejects sets carrying the not-a-number sentinel.
pub fn reject_malformed(fields: &TypedUpdateSet) -> Result<(), ApiError> {
    let malformed = fields.malformed_fields();
    if malformed.is_empty() {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Invalid numeric value for field(s): {}",
            malformed.join(", ")
        )))
    }
}

/// Normalizes a PATCH body against the resource's field table.
pub fn update_set(resource: Resource, body: JsonBody) -> Result<TypedUpdateSet, ApiError> {
    let payload = payload_object(body)?;
    let fields = normalize(&payload, resource.model().mutable_fields())?;
    reject_malformed(&fields)?;
    Ok(fields)
}

/// Normalizes a POST body and checks required fields. Omitted optional
/// fields are left for storage to default.
pub fn create_set(resource: Resource, body: JsonBody) -> Result<TypedUpdateSet, ApiError> {
    let fields = update_set(resource, body)?;
    resource
        .model()
        .validate_create_payload(&fields)
        .map_err(ApiError::BadRequest)?;
    Ok(fields)
}

pub async fn list_all(state: &AppState, resource: Resource) -> ApiResult {
    let records = state.storage.query_all(resource).await?;
    Ok(Json(ApiResponse::data(JsonValue::Array(records))))
}

pub async fn fetch_one(state: &AppState, resource: Resource, raw_id: &str) -> ApiResult {
    let id = resource_id(resource, raw_id)?;
    let record = state
        .storage
        .find_by_id(resource, id)
        .await?
        .ok_or_else(|| not_found(resource))?;
    Ok(Json(ApiResponse::data(record)))
}

pub async fn fetch_details(state: &AppState, resource: Resource, raw_id: &str) -> ApiResult {
    let id = resource_id(resource, raw_id)?;
    let record = state
        .storage
        .find_details(resource, id)
        .await?
        .ok_or_else(|| not_found(resource))?;
    Ok(Json(ApiResponse::data(record)))
}

pub async fn create(
    state: &AppState,
    resource: Resource,
    body: JsonBody,
) -> ApiResult<(StatusCode, Json<ApiResponse>)> {
    let fields = create_set(resource, body)?;
    let record = state.storage.insert(resource, &fields).await?;
    tracing::info!(resource = resource.label(), id = ?record.get("id"), "created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message(
            format!("{} created successfully", resource.label()),
            Some(record),
        )),
    ))
}

pub async fn update(
    state: &AppState,
    resource: Resource,
    raw_id: &str,
    body: JsonBody,
) -> ApiResult {
    let id = resource_id(resource, raw_id)?;
    let fields = update_set(resource, body)?;
    tracing::debug!(resource = resource.label(), id, fields = ?fields.field_names(), "partial update");
    let record = state
        .storage
        .apply_partial_update(resource, id, &fields)
        .await?
        .ok_or_else(|| not_found(resource))?;
    Ok(Json(ApiResponse::message(
        format!("{} successfully updated", resource.label()),
        Some(record),
    )))
}

pub async fn remove(state: &AppState, resource: Resource, raw_id: &str) -> ApiResult {
    let id = resource_id(resource, raw_id)?;
    let record = state
        .storage
        .delete(resource, id)
        .await?
        .ok_or_else(|| not_found(resource))?;
    tracing::info!(resource = resource.label(), id, "deleted");
    Ok(Json(ApiResponse::message(
        format!("{} successfully deleted", resource.label()),
        Some(record),
    )))
}
