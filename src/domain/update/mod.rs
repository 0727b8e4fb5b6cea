//! Partial-update normalization.
//!
//! A raw request body is reduced to the resource's allow-listed fields, each
//! coerced through the field's rule. Unknown keys never reach storage.

use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

pub mod coercion;

pub use coercion::{Coercion, TypedValue};

/// One entry of a resource's mutable-field table.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub coercion: Coercion,
}

impl FieldRule {
    pub const fn new(field: &'static str, coercion: Coercion) -> Self {
        Self { field, coercion }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("No valid fields provided for update.")]
    EmptyUpdate,

    #[error("Invalid reference for field '{0}'")]
    InvalidReference(String),
}

/// Allow-listed, typed field values in field-table order. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedUpdateSet {
    fields: Vec<(&'static str, TypedValue)>,
}

impl TypedUpdateSet {
    pub fn get(&self, field: &str) -> Option<&TypedValue> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &TypedValue)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }

    /// Fields whose raw value carried no number.
    pub fn malformed_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|(_, value)| value.is_not_a_number())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Adds `value` under `field` unless the client already supplied it.
    pub fn insert_default(&mut self, field: &'static str, value: TypedValue) {
        if !self.contains(field) {
            self.fields.push((field, value));
        }
    }

    /// JSON object view, omitting not-a-number sentinels.
    pub fn to_json(&self) -> JsonValue {
        let mut out = Map::new();
        for (name, value) in &self.fields {
            if let Some(v) = value.to_json() {
                out.insert((*name).to_string(), v);
            }
        }
        JsonValue::Object(out)
    }
}

/// Filters `payload` down to `rules` and coerces each present field.
///
/// A field that is missing or explicitly `null` is left out. Fails with
/// [`NormalizeError::EmptyUpdate`] when nothing is left, and with
/// [`NormalizeError::InvalidReference`] when an identifier field is malformed.
pub fn normalize(
    payload: &Map<String, JsonValue>,
    rules: &[FieldRule],
) -> Result<TypedUpdateSet, NormalizeError> {
    let mut fields = Vec::with_capacity(rules.len());
    for rule in rules {
        let raw = match payload.get(rule.field) {
            None | Some(JsonValue::Null) => continue,
            Some(raw) => raw,
        };
        let value = rule
            .coercion
            .apply(raw)
            .map_err(|_| NormalizeError::InvalidReference(rule.field.to_string()))?;
        fields.push((rule.field, value));
    }

    if fields.is_empty() {
        return Err(NormalizeError::EmptyUpdate);
    }
    Ok(TypedUpdateSet { fields })
}
