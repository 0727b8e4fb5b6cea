//! Per-field coercion rules applied to raw request values.
//!
//! Numeric coercion is best-effort: the longest numeric prefix of a string is
//! used (`"22.99abc"` -> 22.99) and anything without one becomes
//! [`TypedValue::NotANumber`] instead of an error. Only references are strict.

use serde::Serialize;
use serde_json::Value as JsonValue;

/// How a raw wire value is turned into a [`TypedValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Decimal,
    Integer,
    /// `true` only for the boolean `true` or the literal string `"true"`.
    BooleanLiteral,
    /// Identifier of another record; must be a positive integer.
    Reference,
    Text,
    TextList,
}

/// A coerced field value, ready for the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Decimal(f64),
    Integer(i64),
    Boolean(bool),
    Text(String),
    TextList(Vec<String>),
    Reference(i64),
    /// Sentinel for numeric fields whose raw value had no numeric prefix.
    NotANumber,
}

impl TypedValue {
    pub fn is_not_a_number(&self) -> bool {
        matches!(self, TypedValue::NotANumber)
    }

    /// JSON rendering of the value. `None` for [`TypedValue::NotANumber`].
    pub fn to_json(&self) -> Option<JsonValue> {
        match self {
            TypedValue::Decimal(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
            TypedValue::Integer(i) | TypedValue::Reference(i) => Some(JsonValue::from(*i)),
            TypedValue::Boolean(b) => Some(JsonValue::from(*b)),
            TypedValue::Text(s) => Some(JsonValue::from(s.as_str())),
            TypedValue::TextList(items) => Some(JsonValue::from(items.clone())),
            TypedValue::NotANumber => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Integer(i) | TypedValue::Reference(i) => Some(*i),
            _ => None,
        }
    }
}

/// Raised only for malformed identifiers; every other rule is total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedReference;

impl Coercion {
    pub fn apply(self, raw: &JsonValue) -> Result<TypedValue, MalformedReference> {
        let value = match self {
            Coercion::Decimal => coerce_decimal(raw),
            Coercion::Integer => coerce_integer(raw),
            Coercion::BooleanLiteral => TypedValue::Boolean(coerce_boolean_literal(raw)),
            Coercion::Reference => return coerce_reference(raw).map(TypedValue::Reference),
            Coercion::Text => TypedValue::Text(coerce_text(raw)),
            Coercion::TextList => TypedValue::TextList(coerce_text_list(raw)),
        };
        Ok(value)
    }
}

fn coerce_decimal(raw: &JsonValue) -> TypedValue {
    let parsed = match raw {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => numeric_prefix(s, true).parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() => TypedValue::Decimal(f),
        _ => TypedValue::NotANumber,
    }
}

fn coerce_integer(raw: &JsonValue) -> TypedValue {
    let parsed = match raw {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate_to_i64)),
        JsonValue::String(s) => numeric_prefix(s, false).parse::<i64>().ok(),
        _ => None,
    };
    parsed.map_or(TypedValue::NotANumber, TypedValue::Integer)
}

fn truncate_to_i64(f: f64) -> Option<i64> {
    let t = f.trunc();
    if t.is_finite() && t >= i64::MIN as f64 && t <= i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}

fn coerce_boolean_literal(raw: &JsonValue) -> bool {
    match raw {
        JsonValue::Bool(b) => *b,
        JsonValue::String(s) => s == "true",
        _ => false,
    }
}

fn coerce_reference(raw: &JsonValue) -> Result<i64, MalformedReference> {
    let id = match raw {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse::<i64>().ok()
            } else {
                None
            }
        }
        _ => None,
    };
    id.filter(|id| *id > 0).ok_or(MalformedReference)
}

fn coerce_text(raw: &JsonValue) -> String {
    match raw {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn coerce_text_list(raw: &JsonValue) -> Vec<String> {
    match raw {
        JsonValue::Array(items) => items.iter().map(coerce_text).collect(),
        _ => Vec::new(),
    }
}

/// Longest prefix of `s` (after leading whitespace) that reads as a number.
///
/// Returns an empty string when there is no digit at all, which fails to
/// parse and so yields the not-a-number sentinel.
pub(crate) fn numeric_prefix(s: &str, allow_fraction: bool) -> &str {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut saw_digits = end > int_start;

    if allow_fraction && end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if saw_digits || frac_end > frac_start {
            saw_digits = true;
            end = frac_end;
        }
    }

    if !saw_digits {
        return "";
    }

    if allow_fraction && end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    &s[..end]
}
