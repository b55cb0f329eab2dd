//! Best-effort recovery of a JSON object from free-form model output.
//!
//! Models are asked for JSON but often wrap it in prose or code fences.
//! The outermost `{ ... }` span is cut out and parsed; anything that does
//! not survive that is replaced by a caller-provided fallback.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Slice from the first `{` to the last `}`, both included
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    /// True when the model output could not be used and the fallback was returned
    pub recovered: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum JsonRecoveryError {
    #[error("No JSON found in response")]
    NoJson,
    #[error("Invalid JSON in response: {0}")]
    Invalid(#[from] serde_json::Error),
}

pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, JsonRecoveryError> {
    let json = extract_json_object(text).ok_or(JsonRecoveryError::NoJson)?;
    Ok(serde_json::from_str(json)?)
}

pub fn parse_or_fallback<T, F>(text: &str, fallback: F) -> Parsed<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match parse_json(text) {
        Ok(value) => Parsed {
            value,
            recovered: false,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse model response, using fallback");
            Parsed {
                value: fallback(),
                recovered: true,
            }
        }
    }
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

/// First number written anywhere in `text`, ignoring `,` and `_` separators
fn first_number(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',' && *c != '_').collect();
    let start = cleaned.find(is_digit)?;
    let negative = cleaned[..start].ends_with('-');
    let rest = &cleaned[start..];

    let mut end = rest.find(|c: char| !is_digit(c)).unwrap_or(rest.len());
    let after = &rest[end..];
    if after.starts_with('.') && after[1..].starts_with(is_digit) {
        let fraction = &after[1..];
        end += 1 + fraction.find(|c: char| !is_digit(c)).unwrap_or(fraction.len());
    }

    let number: f64 = rest[..end].parse().ok()?;
    Some(if negative { -number } else { number })
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => first_number(s),
        _ => None,
    }
}

/// Counts sometimes come back as `"1,200"` or `"about 5 minutes"`; anything unreadable is 0
pub fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u64)
        .unwrap_or(0))
}

pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value).filter(|n| n.is_finite()).unwrap_or(0.0))
}

/// `null` and non-string scalars become strings instead of failing the whole object
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// `null` for a list or nested object means "nothing", not a broken answer
pub fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
