//! Shopping-cart handlers.
//!
//! Cart routes are keyed by user id. Unlike the resource routes, a malformed
//! id here is invalid input rather than a missing record.

use crate::domain::model::Resource;
use crate::domain::update::{Coercion, TypedValue};
use crate::transport::http::error::ApiError;
use crate::transport::http::handlers::common::{self, ApiResult, JsonBody};
use crate::transport::http::types::{AddToCartRequest, ApiResponse, AppState, CartQuantityRequest};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{Map, Value as JsonValue};

fn invalid_input() -> ApiError {
    ApiError::bad_request("Invalid input")
}

/// Largest quantity a single request may carry.
const MAX_QUANTITY: i64 = i32::MAX as i64;

fn reference(payload: &Map<String, JsonValue>, field: &str) -> Option<i64> {
    Coercion::Reference.apply(payload.get(field)?).ok()?.as_i64()
}

fn quantity(value: Option<&TypedValue>) -> Result<i64, ApiError> {
    value
        .and_then(TypedValue::as_i64)
        .filter(|q| (1..=MAX_QUANTITY).contains(q))
        .ok_or_else(invalid_input)
}

#[utoipa::path(
    post,
    path = "/shopping-cart",
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Product added; the cart is created on first use", body = ApiResponse),
        (status = 400, description = "Invalid input or unknown user/product", body = ApiResponse)
    )
)]
pub async fn add_to_cart_handler(
    State(state): State<AppState>,
    body: JsonBody,
) -> ApiResult<(StatusCode, Json<ApiResponse>)> {
    let payload = common::payload_object(body)?;
    let (Some(user_id), Some(product_id)) =
        (reference(&payload, "userId"), reference(&payload, "productId"))
    else {
        return Err(invalid_input());
    };
    let raw_quantity = payload
        .get("quantity")
        .map(|raw| Coercion::Integer.apply(raw))
        .transpose()
        .map_err(|_| invalid_input())?;
    let quantity = quantity(raw_quantity.as_ref())?;

    let line = state
        .storage
        .add_to_cart(user_id, product_id, quantity)
        .await?;
    tracing::info!(user_id, product_id, quantity, "added to cart");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message("Product added to cart successfully", Some(line))),
    ))
}

#[utoipa::path(
    get,
    path = "/shopping-cart/{userId}",
    params(("userId" = i64, Path, description = "Owner of the cart")),
    responses(
        (status = 200, description = "Cart with its lines and their products", body = ApiResponse),
        (status = 400, description = "Invalid user id", body = ApiResponse),
        (status = 404, description = "The user has no cart", body = ApiResponse)
    )
)]
pub async fn get_cart_handler(State(state): State<AppState>, Path(user_id): Path<String>) -> ApiResult {
    let user_id = common::parse_id(&user_id).ok_or_else(|| ApiError::bad_request("Invalid user id"))?;
    let cart = state
        .storage
        .get_cart(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Cart not found"))?;
    Ok(Json(ApiResponse::data(cart)))
}

#[utoipa::path(
    patch,
    path = "/shopping-cart/{userId}/{productId}",
    params(
        ("userId" = i64, Path, description = "Owner of the cart"),
        ("productId" = i64, Path, description = "Product in the cart")
    ),
    request_body = CartQuantityRequest,
    responses(
        (status = 200, description = "Quantity replaced", body = ApiResponse),
        (status = 400, description = "Invalid input", body = ApiResponse),
        (status = 404, description = "The product is not in the cart", body = ApiResponse)
    )
)]
pub async fn update_cart_quantity_handler(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(String, String)>,
    body: JsonBody,
) -> ApiResult {
    let (Some(user_id), Some(product_id)) = (common::parse_id(&user_id), common::parse_id(&product_id))
    else {
        return Err(invalid_input());
    };
    let fields = common::update_set(Resource::CartLine, body).map_err(|err| match err {
        ApiError::InvalidJson(_) => err,
        _ => invalid_input(),
    })?;
    let quantity = quantity(fields.get("quantity"))?;

    let line = state
        .storage
        .update_cart_quantity(user_id, product_id, quantity)
        .await?
        .ok_or_else(|| common::not_found(Resource::CartLine))?;
    Ok(Json(ApiResponse::message(
        "Product quantity updated successfully",
        Some(line),
    )))
}

#[utoipa::path(
    delete,
    path = "/shopping-cart/{userId}/{productId}",
    params(
        ("userId" = i64, Path, description = "Owner of the cart"),
        ("productId" = i64, Path, description = "Product to remove")
    ),
    responses(
        (status = 200, description = "Line removed", body = ApiResponse),
        (status = 400, description = "Invalid input", body = ApiResponse),
        (status = 404, description = "The product is not in the cart", body = ApiResponse)
    )
)]
pub async fn remove_from_cart_handler(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(String, String)>,
) -> ApiResult {
    let (Some(user_id), Some(product_id)) = (common::parse_id(&user_id), common::parse_id(&product_id))
    else {
        return Err(invalid_input());
    };
    state
        .storage
        .remove_from_cart(user_id, product_id)
        .await?
        .ok_or_else(|| common::not_found(Resource::CartLine))?;
    Ok(Json(ApiResponse::message(
        "Product removed from cart successfully",
        None,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_is_bounded() {
        assert_eq!(quantity(Some(&TypedValue::Integer(1))).ok(), Some(1));
        assert_eq!(quantity(Some(&TypedValue::Integer(MAX_QUANTITY))).ok(), Some(MAX_QUANTITY));
        assert!(quantity(Some(&TypedValue::Integer(0))).is_err());
        assert!(quantity(Some(&TypedValue::Integer(MAX_QUANTITY + 1))).is_err());
        assert!(quantity(Some(&TypedValue::NotANumber)).is_err());
        assert!(quantity(None).is_err());
    }
}
