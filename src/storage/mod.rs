//! Storage capability.
//!
//! Handlers only ever see `Arc<dyn Storage>`. Records cross this boundary as
//! JSON objects keyed by wire names; each backend maps them to its own layout.

use crate::domain::model::Resource;
use crate::domain::query::QueryDescriptor;
use crate::domain::update::TypedUpdateSet;
use crate::infra::config::{Config, StorageBackend};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    NotNull,
    Check,
}

impl ConstraintKind {
    /// Maps a SQLSTATE code to the constraint it reports.
    pub fn from_sqlstate(code: &str) -> Option<Self> {
        match code {
            "23505" => Some(ConstraintKind::Unique),
            "23503" => Some(ConstraintKind::ForeignKey),
            "23502" => Some(ConstraintKind::NotNull),
            "23514" => Some(ConstraintKind::Check),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("constraint violation ({kind:?}): {detail}")]
    Constraint { kind: ConstraintKind, detail: String },

    /// A value that cannot be stored, such as the not-a-number sentinel.
    #[error("Invalid value for field '{0}'")]
    InvalidValue(String),

    /// Arithmetic on a stored number left its column's range (SQLSTATE 22003).
    #[error("numeric value out of range: {0}")]
    OutOfRange(String),

    #[error("unknown field '{field}' on {resource:?}")]
    UnknownField { resource: Resource, field: String },

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if let Some(kind) = db.code().as_deref().and_then(ConstraintKind::from_sqlstate) {
                let detail = db
                    .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
                    .and_then(|pg| pg.detail())
                    .unwrap_or_else(|| db.message())
                    .to_string();
                return StoreError::Constraint { kind, detail };
            }
            if db.code().as_deref() == Some("22003") {
                return StoreError::OutOfRange(db.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

/// Rating distribution for one product.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub average_rating: f64,
    /// Review count per rating value 1 to 5.
    #[schema(value_type = Object)]
    pub rating_counts: BTreeMap<i64, i64>,
    pub total_reviews: i64,
}

impl ReviewStats {
    /// Builds stats from `(rating, count)` groups. Buckets 1 to 5 are always present.
    pub fn from_groups(groups: impl IntoIterator<Item = (i64, i64)>) -> Self {
        let mut rating_counts: BTreeMap<i64, i64> = (1..=5).map(|r| (r, 0)).collect();
        let mut total_reviews = 0;
        let mut rating_sum = 0;
        for (rating, count) in groups {
            total_reviews += count;
            rating_sum += rating * count;
            *rating_counts.entry(rating).or_insert(0) += count;
        }
        let average_rating = if total_reviews > 0 {
            rating_sum as f64 / total_reviews as f64
        } else {
            0.0
        };
        Self {
            average_rating,
            rating_counts,
            total_reviews,
        }
    }
}

/// Persistence operations the HTTP layer relies on.
///
/// Every method is one scoped, all-or-nothing call.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    /// Unfiltered listing in identifier order.
    async fn query_all(&self, resource: Resource) -> Result<Vec<JsonValue>, StoreError>;

    async fn query(
        &self,
        resource: Resource,
        query: &QueryDescriptor,
    ) -> Result<Vec<JsonValue>, StoreError>;

    async fn find_by_id(&self, resource: Resource, id: i64)
        -> Result<Option<JsonValue>, StoreError>;

    /// The record joined with its related records.
    async fn find_details(
        &self,
        resource: Resource,
        id: i64,
    ) -> Result<Option<JsonValue>, StoreError>;

    async fn insert(
        &self,
        resource: Resource,
        fields: &TypedUpdateSet,
    ) -> Result<JsonValue, StoreError>;

    /// Merges `update` into the record; `None` when no record has `id`.
    async fn apply_partial_update(
        &self,
        resource: Resource,
        id: i64,
        update: &TypedUpdateSet,
    ) -> Result<Option<JsonValue>, StoreError>;

    /// Removes the record and returns it; `None` when no record has `id`.
    async fn delete(&self, resource: Resource, id: i64) -> Result<Option<JsonValue>, StoreError>;

    /// Increments the review's like counter.
    async fn like_review(&self, id: i64) -> Result<Option<JsonValue>, StoreError>;

    async fn review_stats(&self, product_id: i64) -> Result<ReviewStats, StoreError>;

    /// Finds or creates the user's cart and adds `quantity` to the product line,
    /// as one atomic step.
    async fn add_to_cart(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i64,
    ) -> Result<JsonValue, StoreError>;

    /// The user's cart with its lines and products.
    async fn get_cart(&self, user_id: i64) -> Result<Option<JsonValue>, StoreError>;

    async fn update_cart_quantity(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i64,
    ) -> Result<Option<JsonValue>, StoreError>;

    async fn remove_from_cart(
        &self,
        user_id: i64,
        product_id: i64,
    ) -> Result<Option<JsonValue>, StoreError>;
}

/// Builds the storage backend selected by `config`.
pub async fn connect(config: &Config) -> anyhow::Result<Arc<dyn Storage>> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; data is lost on shutdown");
            Ok(Arc::new(MemoryStorage::new()))
        }
        StorageBackend::Postgres => {
            let storage = PgStorage::connect(config).await?;
            Ok(Arc::new(storage))
        }
    }
}
