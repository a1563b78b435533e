//! Input record type
//!
//! Source values are loosely typed: ids may be numbers or digit strings and
//! coordinates may be numbers or strings. Every key must be present, even
//! when its value is `null`.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Keys every input record must carry
pub const REQUIRED_FIELDS: [&str; 11] = [
    "id",
    "name",
    "state_id",
    "state_code",
    "state_name",
    "country_id",
    "country_code",
    "country_name",
    "latitude",
    "longitude",
    "wikiDataId",
];

/// One flat element of the input array
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CityRecord {
    #[serde(deserialize_with = "required_id")]
    pub id: i64,
    #[serde(deserialize_with = "loose_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "nullable_id")]
    pub state_id: Option<i64>,
    #[serde(deserialize_with = "loose_text")]
    pub state_code: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub state_name: Option<String>,
    #[serde(deserialize_with = "nullable_id")]
    pub country_id: Option<i64>,
    #[serde(deserialize_with = "loose_text")]
    pub country_code: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub country_name: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub latitude: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub longitude: Option<String>,
    #[serde(rename = "wikiDataId", deserialize_with = "loose_text")]
    pub wiki_data_id: Option<String>,
}

fn id_from_value(value: &Value) -> Result<Option<i64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(Some(f as i64)),
                _ => Err(format!("{n} is not an integer id")),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("'{s}' is not an integer id")),
        other => Err(format!("expected an id, found {}", kind(other))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn required_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value)
        .map_err(de::Error::custom)?
        .ok_or_else(|| de::Error::custom("id must not be null"))
}

fn nullable_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value).map_err(de::Error::custom)
}

fn loose_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(de::Error::custom(format!(
            "expected text, found {}",
            kind(&other)
        ))),
    }
}
