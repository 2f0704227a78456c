//! Serde helpers for providers that send numbers as JSON strings.

use serde::{Deserialize, Deserializer, de::Error};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumericText {
    Number(f64),
    Text(String),
    Null,
}

/// Accepts `23`, `23.5` or `"23"`.
pub(crate) fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumericText::deserialize(deserializer)? {
        NumericText::Number(n) => Ok(n),
        NumericText::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| D::Error::custom(format!("invalid number '{s}': {e}"))),
        NumericText::Null => Err(D::Error::custom("expected a number, found null")),
    }
}

/// Like [`number`], but `""` and `null` decode to `None`. Pair with
/// `#[serde(default)]` so a missing field is also `None`.
pub(crate) fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match NumericText::deserialize(deserializer)? {
        NumericText::Number(n) => Ok(Some(n)),
        NumericText::Text(s) if s.trim().is_empty() => Ok(None),
        NumericText::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid number '{s}': {e}"))),
        NumericText::Null => Ok(None),
    }
}
