//! PostgreSQL storage backend.
//!
//! Records are rendered server-side with `json_build_object`, so every query
//! returns a single `record` column already keyed by wire names.

use crate::domain::model::{Resource, ResourceModel};
use crate::domain::query::{FilterValue, Predicate, QueryDescriptor};
use crate::domain::update::{TypedUpdateSet, TypedValue};
use crate::infra::config::Config;
use crate::storage::{ReviewStats, Storage, StoreError};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Connects using `DATABASE_URL` and makes sure every table exists.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(config.database_url()?)
            .await?;
        let storage = Self::with_pool(pool);
        storage.apply_schema().await?;
        tracing::info!("postgres storage ready");
        Ok(storage)
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs every model's `CREATE TABLE IF NOT EXISTS`, referenced tables first.
    pub async fn apply_schema(&self) -> Result<(), StoreError> {
        for resource in Resource::ALL {
            let model = resource.model();
            sqlx::query(model.get_create_table_sql())
                .execute(&self.pool)
                .await?;
            tracing::debug!(table = model.table_name(), "table ensured");
        }
        Ok(())
    }

    /// Names of the managed tables that are missing from the database.
    pub async fn missing_tables(&self) -> Result<Vec<&'static str>, StoreError> {
        let present: Vec<String> = sqlx::query_scalar(
            "SELECT table_name::text FROM information_schema.tables
             WHERE table_schema = 'public' AND table_type = 'BASE TABLE'",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(Resource::ALL
            .iter()
            .map(|r| r.model().table_name())
            .filter(|t| !present.iter().any(|p| p == t))
            .collect())
    }
}

/// `json_build_object(...)` over every column of `model`, read from `alias`.
fn record_expr(model: &dyn ResourceModel, alias: &str) -> String {
    let pairs: Vec<String> = model
        .columns()
        .iter()
        .map(|c| format!("'{}', {}.{}", c.field, alias, c.column))
        .collect();
    format!("json_build_object({})", pairs.join(", "))
}

fn column_of(model: &dyn ResourceModel, field: &str) -> Result<&'static str, StoreError> {
    model
        .column(field)
        .map(|c| c.column)
        .ok_or_else(|| StoreError::UnknownField {
            resource: model.resource(),
            field: field.to_string(),
        })
}

fn push_value(
    builder: &mut QueryBuilder<'_, Postgres>,
    field: &str,
    value: &TypedValue,
) -> Result<(), StoreError> {
    match value {
        TypedValue::Decimal(f) => {
            builder.push_bind(*f);
        }
        TypedValue::Integer(i) | TypedValue::Reference(i) => {
            builder.push_bind(*i);
        }
        TypedValue::Boolean(b) => {
            builder.push_bind(*b);
        }
        TypedValue::Text(s) => {
            builder.push_bind(s.clone());
        }
        TypedValue::TextList(items) => {
            builder.push_bind(sqlx::types::Json(items.clone()));
        }
        TypedValue::NotANumber => return Err(StoreError::InvalidValue(field.to_string())),
    }
    Ok(())
}

fn push_predicate(
    builder: &mut QueryBuilder<'_, Postgres>,
    model: &dyn ResourceModel,
    predicate: &Predicate,
) -> Result<(), StoreError> {
    match predicate {
        Predicate::Equals { field, value } => {
            builder.push(" AND t.").push(column_of(model, field)?).push(" = ");
            match value {
                FilterValue::Bool(b) => builder.push_bind(*b),
                FilterValue::Int(i) => builder.push_bind(*i),
            };
        }
        Predicate::TextMatch { fields, needle } => {
            let pattern = format!("%{}%", escape_like(needle));
            builder.push(" AND (");
            for (idx, field) in fields.iter().enumerate() {
                if idx > 0 {
                    builder.push(" OR ");
                }
                builder
                    .push("t.")
                    .push(column_of(model, field)?)
                    .push(" ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\'");
            }
            builder.push(")");
        }
    }
    Ok(())
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn records(rows: Vec<PgRow>) -> Result<Vec<JsonValue>, StoreError> {
    rows.iter()
        .map(|row| row.try_get::<JsonValue, _>("record").map_err(StoreError::from))
        .collect()
}

fn optional_record(row: Option<PgRow>) -> Result<Option<JsonValue>, StoreError> {
    row.map(|r| r.try_get::<JsonValue, _>("record"))
        .transpose()
        .map_err(StoreError::from)
}

/// Record of `resource` (aliased `alias`) with its related records embedded.
fn details_expr(resource: Resource, alias: &str) -> Option<String> {
    let category = Resource::Category.model();
    let product = Resource::Product.model();
    let user = Resource::User.model();
    let review = Resource::Review.model();

    let review_with_user = format!(
        "{}::jsonb || jsonb_build_object('user', (SELECT {} FROM users u WHERE u.id = r.user_id))",
        record_expr(review, "r"),
        record_expr(user, "u")
    );

    let extra = match resource {
        Resource::Product => format!(
            "'category', (SELECT {cat} FROM categories c WHERE c.id = {a}.category_id), \
             'reviews', COALESCE((SELECT jsonb_agg({rev} ORDER BY r.id) FROM reviews r WHERE r.product_id = {a}.id), '[]'::jsonb)",
            cat = record_expr(category, "c"),
            rev = review_with_user,
            a = alias
        ),
        Resource::Category => format!(
            "'products', COALESCE((SELECT jsonb_agg({p}::jsonb ORDER BY p.id) FROM products p WHERE p.category_id = {a}.id), '[]'::jsonb)",
            p = record_expr(product, "p"),
            a = alias
        ),
        Resource::User => format!(
            "'reviews', COALESCE((SELECT jsonb_agg({r}::jsonb ORDER BY r.id) FROM reviews r WHERE r.user_id = {a}.id), '[]'::jsonb)",
            r = record_expr(review, "r"),
            a = alias
        ),
        Resource::Review => format!(
            "'product', (SELECT {p} FROM products p WHERE p.id = {a}.product_id), \
             'user', (SELECT {u} FROM users u WHERE u.id = {a}.user_id)",
            p = record_expr(product, "p"),
            u = record_expr(user, "u"),
            a = alias
        ),
        Resource::Cart | Resource::CartLine => return None,
    };

    Some(format!(
        "{}::jsonb || jsonb_build_object({})",
        record_expr(resource.model(), alias),
        extra
    ))
}

fn cart_expr(alias: &str) -> String {
    format!(
        "{cart}::jsonb || jsonb_build_object('products', COALESCE((\
            SELECT jsonb_agg({line}::jsonb || jsonb_build_object('product', \
                (SELECT {product} FROM products p WHERE p.id = i.product_id)) ORDER BY i.product_id) \
            FROM cart_items i WHERE i.cart_id = {a}.id), '[]'::jsonb))",
        cart = record_expr(Resource::Cart.model(), alias),
        line = record_expr(Resource::CartLine.model(), "i"),
        product = record_expr(Resource::Product.model(), "p"),
        a = alias
    )
}

#[async_trait]
impl Storage for PgStorage {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn query_all(&self, resource: Resource) -> Result<Vec<JsonValue>, StoreError> {
        let model = resource.model();
        let sql = format!(
            "SELECT {} AS record FROM {} t ORDER BY t.id",
            record_expr(model, "t"),
            model.table_name()
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        records(rows)
    }

    async fn query(
        &self,
        resource: Resource,
        query: &QueryDescriptor,
    ) -> Result<Vec<JsonValue>, StoreError> {
        let model = resource.model();
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} AS record FROM {} t WHERE TRUE",
            record_expr(model, "t"),
            model.table_name()
        ));

        for predicate in query.filter.predicates() {
            push_predicate(&mut builder, model, predicate)?;
        }

        builder.push(" ORDER BY ");
        if let Some(sort) = &query.sort {
            builder
                .push("t.")
                .push(column_of(model, sort.field)?)
                .push(" ")
                .push(sort.direction.as_sql())
                .push(", ");
        }
        builder.push("t.id ASC");

        builder
            .push(" LIMIT ")
            .push_bind(i64::from(query.page.limit()))
            .push(" OFFSET ")
            .push_bind(query.page.skip() as i64);

        tracing::debug!(sql = builder.sql(), "composed query");
        let rows = builder.build().fetch_all(&self.pool).await?;
        records(rows)
    }

    async fn find_by_id(
        &self,
        resource: Resource,
        id: i64,
    ) -> Result<Option<JsonValue>, StoreError> {
        let model = resource.model();
        let sql = format!(
            "SELECT {} AS record FROM {} t WHERE t.id = $1",
            record_expr(model, "t"),
            model.table_name()
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        optional_record(row)
    }

    async fn find_details(
        &self,
        resource: Resource,
        id: i64,
    ) -> Result<Option<JsonValue>, StoreError> {
        let Some(expr) = details_expr(resource, "t") else {
            return self.find_by_id(resource, id).await;
        };
        let sql = format!(
            "SELECT {} AS record FROM {} t WHERE t.id = $1",
            expr,
            resource.model().table_name()
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        optional_record(row)
    }

    async fn insert(
        &self,
        resource: Resource,
        fields: &TypedUpdateSet,
    ) -> Result<JsonValue, StoreError> {
        let model = resource.model();
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("INSERT INTO {} AS t (", model.table_name()));
        for (idx, (field, _)) in fields.iter().enumerate() {
            if idx > 0 {
                builder.push(", ");
            }
            builder.push(column_of(model, field)?);
        }
        builder.push(") VALUES (");
        for (idx, (field, value)) in fields.iter().enumerate() {
            if idx > 0 {
                builder.push(", ");
            }
            push_value(&mut builder, field, value)?;
        }
        builder.push(") RETURNING ").push(record_expr(model, "t")).push(" AS record");

        let row = builder.build().fetch_one(&self.pool).await?;
        Ok(row.try_get::<JsonValue, _>("record")?)
    }

    async fn apply_partial_update(
        &self,
        resource: Resource,
        id: i64,
        update: &TypedUpdateSet,
    ) -> Result<Option<JsonValue>, StoreError> {
        let model = resource.model();
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("UPDATE {} AS t SET ", model.table_name()));
        for (idx, (field, value)) in update.iter().enumerate() {
            if idx > 0 {
                builder.push(", ");
            }
            builder.push(column_of(model, field)?).push(" = ");
            push_value(&mut builder, field, value)?;
        }
        builder
            .push(" WHERE t.id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(record_expr(model, "t"))
            .push(" AS record");

        let row = builder.build().fetch_optional(&self.pool).await?;
        optional_record(row)
    }

    async fn delete(&self, resource: Resource, id: i64) -> Result<Option<JsonValue>, StoreError> {
        let model = resource.model();
        let sql = format!(
            "DELETE FROM {} AS t WHERE t.id = $1 RETURNING {} AS record",
            model.table_name(),
            record_expr(model, "t")
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        optional_record(row)
    }

    async fn like_review(&self, id: i64) -> Result<Option<JsonValue>, StoreError> {
        let sql = format!(
            "UPDATE reviews AS t SET likes = t.likes + 1 WHERE t.id = $1 RETURNING {} AS record",
            record_expr(Resource::Review.model(), "t")
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        optional_record(row)
    }

    async fn review_stats(&self, product_id: i64) -> Result<ReviewStats, StoreError> {
        let rows = sqlx::query(
            "SELECT rating, COUNT(*) AS count FROM reviews WHERE product_id = $1 GROUP BY rating",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            groups.push((row.try_get::<i64, _>("rating")?, row.try_get::<i64, _>("count")?));
        }
        Ok(ReviewStats::from_groups(groups))
    }

    async fn add_to_cart(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i64,
    ) -> Result<JsonValue, StoreError> {
        let mut transaction = self.pool.begin().await?;

        let cart_id: i64 = sqlx::query_scalar(
            "INSERT INTO shopping_carts (user_id) VALUES ($1)
             ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
             RETURNING id",
        )
        .bind(user_id)
        .fetch_one(&mut *transaction)
        .await?;

        let sql = format!(
            "INSERT INTO cart_items AS t (cart_id, product_id, quantity) VALUES ($1, $2, $3)
             ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = t.quantity + EXCLUDED.quantity
             RETURNING {} AS record",
            record_expr(Resource::CartLine.model(), "t")
        );
        let row = sqlx::query(&sql)
            .bind(cart_id)
            .bind(product_id)
            .bind(quantity)
            .fetch_one(&mut *transaction)
            .await?;
        let line: JsonValue = row.try_get("record")?;

        transaction.commit().await?;
        Ok(line)
    }

    async fn get_cart(&self, user_id: i64) -> Result<Option<JsonValue>, StoreError> {
        let sql = format!(
            "SELECT {} AS record FROM shopping_carts c WHERE c.user_id = $1",
            cart_expr("c")
        );
        let row = sqlx::query(&sql).bind(user_id).fetch_optional(&self.pool).await?;
        optional_record(row)
    }

    async fn update_cart_quantity(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i64,
    ) -> Result<Option<JsonValue>, StoreError> {
        let sql = format!(
            "UPDATE cart_items AS t SET quantity = $1
             FROM shopping_carts c
             WHERE c.id = t.cart_id AND c.user_id = $2 AND t.product_id = $3
             RETURNING {} AS record",
            record_expr(Resource::CartLine.model(), "t")
        );
        let row = sqlx::query(&sql)
            .bind(quantity)
            .bind(user_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        optional_record(row)
    }

    async fn remove_from_cart(
        &self,
        user_id: i64,
        product_id: i64,
    ) -> Result<Option<JsonValue>, StoreError> {
        let sql = format!(
            "DELETE FROM cart_items AS t USING shopping_carts c
             WHERE c.id = t.cart_id AND c.user_id = $1 AND t.product_id = $2
             RETURNING {} AS record",
            record_expr(Resource::CartLine.model(), "t")
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        optional_record(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_expr_maps_wire_names_to_columns() {
        let expr = record_expr(Resource::Category.model(), "t");
        assert_eq!(
            expr,
            "json_build_object('id', t.id, 'name', t.name, 'description', t.description)"
        );
        let expr = record_expr(Resource::Product.model(), "p");
        assert!(expr.contains("'stockCount', p.stock_count"));
    }

    #[test]
    fn like_patterns_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("battery"), "battery");
    }

    #[test]
    fn cart_resources_have_no_details_view() {
        assert!(details_expr(Resource::Cart, "t").is_none());
        let expr = details_expr(Resource::Product, "t").unwrap();
        assert!(expr.contains("'category'"));
        assert!(expr.contains("'reviews'"));
    }
}
