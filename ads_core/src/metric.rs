//! Lenient metric parsing.
//!
//! The Graph API reports most metrics as strings (`"5.50"`), clients post
//! them back as numbers, and spreadsheet cells can hold anything. Every
//! metric goes through here so a missing, null or non-numeric value reads
//! as zero and totals never turn into NaN.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse a JSON value as a finite float, 0.0 otherwise.
pub fn parse_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => parse_amount_str(s),
        _ => 0.0,
    }
}

/// Parse text as a finite float, 0.0 otherwise. A trailing `%` is ignored.
pub fn parse_amount_str(text: &str) -> f64 {
    text.trim()
        .trim_end_matches('%')
        .trim_end()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Parse a JSON value as a whole count. Fractions truncate, negatives clamp to 0.
pub fn parse_count(value: &Value) -> u64 {
    let amount = parse_amount(value);
    if amount <= 0.0 {
        0
    } else {
        amount.trunc() as u64
    }
}

pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

/// `deserialize_with` helper for count fields. Pair with `#[serde(default)]`.
pub fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(parse_count).unwrap_or(0))
}

/// `deserialize_with` helper for money and rate fields. Pair with `#[serde(default)]`.
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(parse_amount).unwrap_or(0.0))
}

/// `deserialize_with` helper for text that may arrive as null.
pub fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}
