//! Serde helpers for decimal amounts exchanged as JSON numbers.
//!
//! Integral values are written as JSON integers and the rest as floats, so
//! `2000000` round-trips as `2000000` rather than `"2000000"`. On input both
//! JSON numbers and numeric strings are accepted.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serializer};
use serde_json::Value;

/// Serialize a decimal as a JSON number.
pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let normalized = value.normalize();
    if normalized.scale() == 0 {
        if let Some(int) = normalized.to_i64() {
            return serializer.serialize_i64(int);
        }
    }
    match normalized.to_f64() {
        Some(float) => serializer.serialize_f64(float),
        None => serializer.serialize_str(&normalized.to_string()),
    }
}

/// Deserialize a decimal from a JSON number or numeric string.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    parse_decimal(&raw).ok_or_else(|| de::Error::custom(format!("not a number: {raw}")))
}

/// Interpret a JSON value as a decimal, if it is numeric.
///
/// Strings are trimmed first; empty strings, booleans, nulls and
/// containers are not numeric.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            Decimal::from_str(trimmed).ok()
        }
        _ => None,
    }
}
