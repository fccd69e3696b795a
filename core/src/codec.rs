//! Value codecs for decoding documents into caller types.
//!
//! Documents come out of `xml::parse`, which turns numeric text into numbers.
//! Fields that are text on the wire but may look numeric (SKUs, ASINs, codes,
//! tokens) should go through `ensure_string`. Lists that the service sends as
//! a single element, a repeated element, or an empty element go through
//! `one_or_many` / `ensure_array`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use percent_encoding::percent_decode_str;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{MwsError, Result};

/// A field that is text on the wire but may have been read as a number.
pub mod ensure_string {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Number(serde_json::Number),
        Bool(bool),
    }

    impl From<TextOrNumber> for String {
        fn from(value: TextOrNumber) -> Self {
            match value {
                TextOrNumber::Text(s) => s,
                TextOrNumber::Number(n) => n.to_string(),
                TextOrNumber::Bool(b) => b.to_string(),
            }
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
        TextOrNumber::deserialize(deserializer).map(String::from)
    }

    pub fn option<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
        Option::<TextOrNumber>::deserialize(deserializer).map(|v| v.map(String::from))
    }
}

/// Absent, `""`, a single element, or an array of elements, as a `Vec`.
pub fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    elements(value.unwrap_or(Value::Null)).map_err(D::Error::custom)
}

/// A container element that may arrive empty (`<Container/>`, read as `""`).
pub fn empty_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(T::default()),
        Some(Value::String(s)) if s.is_empty() => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(D::Error::custom),
    }
}

/// Pull the `tag` children out of a container element as a list.
///
/// `<Container/>` (read as `""`) yields an empty list.
pub fn ensure_array<T: DeserializeOwned>(container: &Value, tag: &str) -> Result<Vec<T>> {
    match container {
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::Object(map) => {
            elements(map.get(tag).cloned().unwrap_or(Value::Null)).map_err(|e| MwsError::Parsing(e.to_string()))
        }
        other => Err(MwsError::Parsing(format!("expected a <{tag}> container, got {other}"))),
    }
}

fn elements<T: DeserializeOwned>(value: Value) -> serde_json::Result<Vec<T>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(ref s) if s.is_empty() => Ok(Vec::new()),
        Value::Array(items) => items.into_iter().map(serde_json::from_value).collect(),
        single => serde_json::from_value(single).map(|v| vec![v]),
    }
}

/// `Yes` / `No` booleans.
pub mod yes_no {
    use serde::de::Error as _;

    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
        let text = String::deserialize(deserializer)?;
        match text.as_str() {
            "Yes" => Ok(true),
            "No" => Ok(false),
            other => Err(D::Error::custom(format!(
                "expected \"Yes\" or \"No\", got {other:?}"
            ))),
        }
    }

    pub fn serialize<S: serde::Serializer>(value: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "Yes" } else { "No" })
    }
}

/// Timestamps as the service writes them.
pub mod mws_date {
    use serde::de::Error as _;

    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).ok_or_else(|| D::Error::custom(format!("invalid date {text:?}")))
    }

    /// RFC 3339, or a zone-less timestamp/date read as UTC. The text is
    /// percent-decoded first.
    pub fn parse(text: &str) -> Option<DateTime<Utc>> {
        let decoded = percent_decode_str(text).decode_utf8().ok()?;
        let text = decoded.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

/// Health reported by `GetServiceStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    #[serde(rename = "GREEN")]
    Green,
    #[serde(rename = "YELLOW")]
    Yellow,
    #[serde(rename = "RED")]
    Red,
}
