//! Resource model definitions.
//!
//! Each resource describes its table, the mapping between camelCase wire
//! names and snake_case columns, and the mutable-field table that drives
//! partial-update normalization.

use crate::domain::update::{FieldRule, TypedUpdateSet, TypedValue};

pub mod catalog;

pub use catalog::{CartLineModel, CartModel, CategoryModel, ProductModel, ReviewModel, UserModel};

/// The unit addressed by an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Category,
    Product,
    User,
    Review,
    Cart,
    CartLine,
}

impl Resource {
    /// Table creation order (referenced tables first).
    pub const ALL: [Resource; 6] = [
        Resource::Category,
        Resource::Product,
        Resource::User,
        Resource::Review,
        Resource::Cart,
        Resource::CartLine,
    ];

    pub fn model(self) -> &'static dyn ResourceModel {
        match self {
            Resource::Category => &CategoryModel,
            Resource::Product => &ProductModel,
            Resource::User => &UserModel,
            Resource::Review => &ReviewModel,
            Resource::Cart => &CartModel,
            Resource::CartLine => &CartLineModel,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Resource::Category => "Category",
            Resource::Product => "Product",
            Resource::User => "User",
            Resource::Review => "Review",
            Resource::Cart => "Cart",
            Resource::CartLine => "Cart item",
        }
    }
}

/// What happens to referencing rows when the target row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    Restrict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Id,
    Text,
    Decimal,
    Integer,
    Boolean,
    TextList,
    Timestamp,
    Reference { target: Resource, on_delete: OnDelete },
}

/// Inclusive bounds a numeric column must stay within. Mirrors the column's
/// `CHECK` clause in the DDL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: Option<f64>,
}

impl ValueRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && self.max.map_or(true, |max| value <= max)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    /// Name on the wire and in JSON records.
    pub field: &'static str,
    /// SQL column name.
    pub column: &'static str,
    pub kind: ColumnKind,
    pub unique: bool,
    pub range: Option<ValueRange>,
}

impl Column {
    pub const fn new(field: &'static str, column: &'static str, kind: ColumnKind) -> Self {
        Self {
            field,
            column,
            kind,
            unique: false,
            range: None,
        }
    }

    pub const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }

    pub const fn at_least(self, min: f64) -> Self {
        Self {
            range: Some(ValueRange { min, max: None }),
            ..self
        }
    }

    pub const fn between(self, min: f64, max: f64) -> Self {
        Self {
            range: Some(ValueRange {
                min,
                max: Some(max),
            }),
            ..self
        }
    }

    pub const fn references(
        field: &'static str,
        column: &'static str,
        target: Resource,
        on_delete: OnDelete,
    ) -> Self {
        Self::new(field, column, ColumnKind::Reference { target, on_delete })
    }
}

/// Contract every resource model fulfils.
///
/// This lets handlers and storage backends work with any resource without
/// knowing its schema.
pub trait ResourceModel: Send + Sync {
    fn resource(&self) -> Resource;

    fn table_name(&self) -> &'static str;

    /// `CREATE TABLE IF NOT EXISTS` statement, executed at startup.
    fn get_create_table_sql(&self) -> &'static str;

    /// Every column, in output order.
    fn columns(&self) -> &'static [Column];

    /// Fields a client may write, with their coercion rules.
    fn mutable_fields(&self) -> &'static [FieldRule];

    fn required_on_create(&self) -> &'static [&'static str] {
        &[]
    }

    /// Values filled in on create when the client omitted the field.
    fn create_defaults(&self) -> Vec<(&'static str, TypedValue)> {
        Vec::new()
    }

    fn column(&self, field: &str) -> Option<&'static Column> {
        self.columns().iter().find(|c| c.field == field)
    }

    /// Checks a normalized create payload before it reaches storage.
    fn validate_create_payload(&self, fields: &TypedUpdateSet) -> Result<(), String> {
        let missing: Vec<&str> = self
            .required_on_create()
            .iter()
            .copied()
            .filter(|f| !fields.contains(f))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("Missing required field(s): {}", missing.join(", ")))
        }
    }
}
