use super::{Column, ColumnKind, OnDelete, Resource, ResourceModel};
use crate::domain::update::{Coercion, FieldRule, TypedValue};

/// Product categories.
pub struct CategoryModel;

impl ResourceModel for CategoryModel {
    fn resource(&self) -> Resource {
        Resource::Category
    }

    fn table_name(&self) -> &'static str {
        "categories"
    }

    fn get_create_table_sql(&self) -> &'static str {
        "CREATE TABLE IF NOT EXISTS categories (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT
        )"
    }

    fn columns(&self) -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "id", ColumnKind::Id),
            Column::new("name", "name", ColumnKind::Text).unique(),
            Column::new("description", "description", ColumnKind::Text),
        ];
        COLUMNS
    }

    fn mutable_fields(&self) -> &'static [FieldRule] {
        const FIELDS: &[FieldRule] = &[
            FieldRule::new("name", Coercion::Text),
            FieldRule::new("description", Coercion::Text),
        ];
        FIELDS
    }

    fn required_on_create(&self) -> &'static [&'static str] {
        &["name"]
    }
}

/// Catalog products.
pub struct ProductModel;

impl ResourceModel for ProductModel {
    fn resource(&self) -> Resource {
        Resource::Product
    }

    fn table_name(&self) -> &'static str {
        "products"
    }

    fn get_create_table_sql(&self) -> &'static str {
        "CREATE TABLE IF NOT EXISTS products (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            category_id BIGINT NOT NULL REFERENCES categories(id) ON DELETE RESTRICT,
            description TEXT,
            price DOUBLE PRECISION NOT NULL CHECK (price >= 0.01),
            stock_count BIGINT NOT NULL DEFAULT 0 CHECK (stock_count >= 0),
            brand TEXT,
            image_url TEXT,
            is_available BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"
    }

    fn columns(&self) -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "id", ColumnKind::Id),
            Column::new("name", "name", ColumnKind::Text),
            Column::references("categoryId", "category_id", Resource::Category, OnDelete::Restrict),
            Column::new("description", "description", ColumnKind::Text),
            Column::new("price", "price", ColumnKind::Decimal).at_least(0.01),
            Column::new("stockCount", "stock_count", ColumnKind::Integer).at_least(0.0),
            Column::new("brand", "brand", ColumnKind::Text),
            Column::new("imageUrl", "image_url", ColumnKind::Text),
            Column::new("isAvailable", "is_available", ColumnKind::Boolean),
            Column::new("createdAt", "created_at", ColumnKind::Timestamp),
        ];
        COLUMNS
    }

    fn mutable_fields(&self) -> &'static [FieldRule] {
        const FIELDS: &[FieldRule] = &[
            FieldRule::new("name", Coercion::Text),
            FieldRule::new("categoryId", Coercion::Reference),
            FieldRule::new("description", Coercion::Text),
            FieldRule::new("price", Coercion::Decimal),
            FieldRule::new("stockCount", Coercion::Integer),
            FieldRule::new("brand", Coercion::Text),
            FieldRule::new("imageUrl", Coercion::Text),
            FieldRule::new("isAvailable", Coercion::BooleanLiteral),
        ];
        FIELDS
    }

    fn required_on_create(&self) -> &'static [&'static str] {
        &["name", "categoryId", "price"]
    }

    fn create_defaults(&self) -> Vec<(&'static str, TypedValue)> {
        vec![
            ("stockCount", TypedValue::Integer(0)),
            ("isAvailable", TypedValue::Boolean(false)),
        ]
    }
}

/// Registered shoppers.
pub struct UserModel;

impl ResourceModel for UserModel {
    fn resource(&self) -> Resource {
        Resource::User
    }

    fn table_name(&self) -> &'static str {
        "users"
    }

    fn get_create_table_sql(&self) -> &'static str {
        "CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            first_name TEXT,
            last_name TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"
    }

    fn columns(&self) -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "id", ColumnKind::Id),
            Column::new("username", "username", ColumnKind::Text).unique(),
            Column::new("email", "email", ColumnKind::Text).unique(),
            Column::new("passwordHash", "password_hash", ColumnKind::Text),
            Column::new("firstName", "first_name", ColumnKind::Text),
            Column::new("lastName", "last_name", ColumnKind::Text),
            Column::new("createdAt", "created_at", ColumnKind::Timestamp),
        ];
        COLUMNS
    }

    fn mutable_fields(&self) -> &'static [FieldRule] {
        const FIELDS: &[FieldRule] = &[
            FieldRule::new("username", Coercion::Text),
            FieldRule::new("email", Coercion::Text),
            FieldRule::new("passwordHash", Coercion::Text),
            FieldRule::new("firstName", Coercion::Text),
            FieldRule::new("lastName", Coercion::Text),
        ];
        FIELDS
    }

    fn required_on_create(&self) -> &'static [&'static str] {
        &["username", "email", "passwordHash"]
    }
}

/// Product reviews written by users.
pub struct ReviewModel;

impl ResourceModel for ReviewModel {
    fn resource(&self) -> Resource {
        Resource::Review
    }

    fn table_name(&self) -> &'static str {
        "reviews"
    }

    fn get_create_table_sql(&self) -> &'static str {
        "CREATE TABLE IF NOT EXISTS reviews (
            id BIGSERIAL PRIMARY KEY,
            product_id BIGINT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            rating BIGINT NOT NULL CHECK (rating BETWEEN 1 AND 5),
            title TEXT,
            content TEXT,
            pros JSONB NOT NULL DEFAULT '[]'::jsonb,
            cons JSONB NOT NULL DEFAULT '[]'::jsonb,
            verified_purchase BOOLEAN NOT NULL DEFAULT FALSE,
            likes BIGINT NOT NULL DEFAULT 0 CHECK (likes >= 0),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"
    }

    fn columns(&self) -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "id", ColumnKind::Id),
            Column::references("productId", "product_id", Resource::Product, OnDelete::Cascade),
            Column::references("userId", "user_id", Resource::User, OnDelete::Cascade),
            Column::new("rating", "rating", ColumnKind::Integer).between(1.0, 5.0),
            Column::new("title", "title", ColumnKind::Text),
            Column::new("content", "content", ColumnKind::Text),
            Column::new("pros", "pros", ColumnKind::TextList),
            Column::new("cons", "cons", ColumnKind::TextList),
            Column::new("verifiedPurchase", "verified_purchase", ColumnKind::Boolean),
            Column::new("likes", "likes", ColumnKind::Integer).at_least(0.0),
            Column::new("createdAt", "created_at", ColumnKind::Timestamp),
        ];
        COLUMNS
    }

    fn mutable_fields(&self) -> &'static [FieldRule] {
        const FIELDS: &[FieldRule] = &[
            FieldRule::new("productId", Coercion::Reference),
            FieldRule::new("userId", Coercion::Reference),
            FieldRule::new("rating", Coercion::Integer),
            FieldRule::new("title", Coercion::Text),
            FieldRule::new("content", Coercion::Text),
            FieldRule::new("pros", Coercion::TextList),
            FieldRule::new("cons", Coercion::TextList),
            FieldRule::new("verifiedPurchase", Coercion::BooleanLiteral),
            FieldRule::new("likes", Coercion::Integer),
        ];
        FIELDS
    }

    fn required_on_create(&self) -> &'static [&'static str] {
        &["productId", "userId", "rating"]
    }

    fn create_defaults(&self) -> Vec<(&'static str, TypedValue)> {
        vec![
            ("pros", TypedValue::TextList(Vec::new())),
            ("cons", TypedValue::TextList(Vec::new())),
            ("verifiedPurchase", TypedValue::Boolean(false)),
            ("likes", TypedValue::Integer(0)),
        ]
    }
}

/// One shopping cart per user.
pub struct CartModel;

impl ResourceModel for CartModel {
    fn resource(&self) -> Resource {
        Resource::Cart
    }

    fn table_name(&self) -> &'static str {
        "shopping_carts"
    }

    fn get_create_table_sql(&self) -> &'static str {
        "CREATE TABLE IF NOT EXISTS shopping_carts (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"
    }

    fn columns(&self) -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "id", ColumnKind::Id),
            Column::references("userId", "user_id", Resource::User, OnDelete::Cascade).unique(),
            Column::new("createdAt", "created_at", ColumnKind::Timestamp),
        ];
        COLUMNS
    }

    fn mutable_fields(&self) -> &'static [FieldRule] {
        &[]
    }
}

/// A product line inside a cart, keyed by (cart, product).
pub struct CartLineModel;

impl ResourceModel for CartLineModel {
    fn resource(&self) -> Resource {
        Resource::CartLine
    }

    fn table_name(&self) -> &'static str {
        "cart_items"
    }

    fn get_create_table_sql(&self) -> &'static str {
        "CREATE TABLE IF NOT EXISTS cart_items (
            cart_id BIGINT NOT NULL REFERENCES shopping_carts(id) ON DELETE CASCADE,
            product_id BIGINT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            quantity BIGINT NOT NULL CHECK (quantity >= 1),
            PRIMARY KEY (cart_id, product_id)
        )"
    }

    fn columns(&self) -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::references("cartId", "cart_id", Resource::Cart, OnDelete::Cascade),
            Column::references("productId", "product_id", Resource::Product, OnDelete::Cascade),
            Column::new("quantity", "quantity", ColumnKind::Integer).at_least(1.0),
        ];
        COLUMNS
    }

    fn mutable_fields(&self) -> &'static [FieldRule] {
        const FIELDS: &[FieldRule] = &[FieldRule::new("quantity", Coercion::Integer)];
        FIELDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutable_fields_exclude_identity_and_audit_columns() {
        for resource in Resource::ALL {
            let model = resource.model();
            for rule in model.mutable_fields() {
                assert_ne!(rule.field, "id");
                assert_ne!(rule.field, "createdAt");
                assert!(
                    model.column(rule.field).is_some(),
                    "{} has no column for {}",
                    model.table_name(),
                    rule.field
                );
            }
        }
    }

    #[test]
    fn required_fields_are_mutable() {
        for resource in Resource::ALL {
            let model = resource.model();
            for field in model.required_on_create() {
                assert!(model.mutable_fields().iter().any(|r| r.field == *field));
            }
        }
    }

    #[test]
    fn ranged_columns_carry_a_check_clause() {
        for resource in Resource::ALL {
            let model = resource.model();
            for column in model.columns().iter().filter(|c| c.range.is_some()) {
                let clause = format!("CHECK ({}", column.column);
                assert!(
                    model.get_create_table_sql().contains(&clause),
                    "{}.{} has no CHECK clause",
                    model.table_name(),
                    column.column
                );
            }
        }
    }

    #[test]
    fn rating_range_is_inclusive() {
        let rating = Resource::Review.model().column("rating").and_then(|c| c.range).unwrap();
        assert!(rating.contains(1.0));
        assert!(rating.contains(5.0));
        assert!(!rating.contains(0.0));
        assert!(!rating.contains(6.0));
        let price = Resource::Product.model().column("price").and_then(|c| c.range).unwrap();
        assert!(!price.contains(0.0));
        assert!(price.contains(1e9));
    }

    #[test]
    fn wire_names_map_to_snake_case_columns() {
        let product = Resource::Product.model();
        assert_eq!(product.column("stockCount").map(|c| c.column), Some("stock_count"));
        assert_eq!(product.column("isAvailable").map(|c| c.column), Some("is_available"));
        assert!(product.column("stock_count").is_none());
    }
}
