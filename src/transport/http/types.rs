use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

/// Envelope for every JSON response.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    /// Storage-level detail, only attached to constraint violations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiResponse {
    pub fn data(data: JsonValue) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            detail: None,
        }
    }

    pub fn message(message: impl Into<String>, data: Option<JsonValue>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
            detail: None,
        }
    }

    pub fn failure(message: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            detail,
        }
    }
}

/// Body of `POST /shopping-cart`. Values may also be numeric strings.
#[derive(Deserialize, Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    #[schema(value_type = i64)]
    pub user_id: JsonValue,
    #[schema(value_type = i64)]
    pub product_id: JsonValue,
    #[schema(value_type = i64)]
    pub quantity: JsonValue,
}

/// Body of `PATCH /shopping-cart/:userId/:productId`.
#[derive(Deserialize, Serialize, Debug, ToSchema)]
pub struct CartQuantityRequest {
    #[schema(value_type = i64, minimum = 1)]
    pub quantity: JsonValue,
}

// Request bodies as documented in OpenAPI. Handlers read the raw JSON object
// and run it through the field tables, so every field here is optional on PATCH.

#[derive(Deserialize, Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock_count: Option<i64>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub product_id: Option<i64>,
    pub user_id: Option<i64>,
    #[schema(minimum = 1, maximum = 5)]
    pub rating: Option<i64>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub pros: Option<Vec<String>>,
    pub cons: Option<Vec<String>>,
    pub verified_purchase: Option<bool>,
    pub likes: Option<i64>,
}
