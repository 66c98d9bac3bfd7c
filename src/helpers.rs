use chrono::Utc;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::consts::{LOCAL_API_URL, MAINNET_API_URL, TESTNET_API_URL};
use crate::prelude::*;

/// Wall-clock milliseconds since the unix epoch
pub fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Render a float as a plain decimal string without exponent or trailing zeros.
///
/// Keeps 15 significant digits, which is every digit an `f64` carries, so
/// tiny sizes survive while `99.5 * 1.005` still renders as `99.9975`.
pub fn float_to_string(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (14 - magnitude).max(0) as usize;
    let mut s = format!("{:.*}", decimals, value);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

pub fn round_to_decimals(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BaseUrl {
    Localhost,
    Testnet,
    Mainnet,
}

impl BaseUrl {
    pub fn get_url(&self) -> String {
        match self {
            BaseUrl::Mainnet => MAINNET_API_URL.to_string(),
            BaseUrl::Testnet => TESTNET_API_URL.to_string(),
            BaseUrl::Localhost => LOCAL_API_URL.to_string(),
        }
    }
}

/// Strip the `{"data": ...}` envelope the exchange wraps most payloads in
pub(crate) fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(unwrap_data(value))?)
}

/// Decode a list that may arrive bare or nested under a paging object
pub(crate) fn decode_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>> {
    match unwrap_data(value) {
        Value::Null => Ok(Vec::new()),
        list @ Value::Array(_) => Ok(serde_json::from_value(list)?),
        Value::Object(mut map) => {
            for key in ["orders", "list", "fills"] {
                if let Some(list @ Value::Array(_)) = map.remove(key) {
                    return Ok(serde_json::from_value(list)?);
                }
            }
            Err(Error::JsonParse(format!(
                "expected a list payload, got object with keys {:?}",
                map.keys().collect::<Vec<_>>()
            )))
        }
        other => Err(Error::JsonParse(format!("expected a list payload, got {other}"))),
    }
}

pub(crate) fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts `1.5` as well as `"1.5"`
pub(crate) fn de_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_f64(&value)
        .ok_or_else(|| de::Error::custom(format!("expected number or numeric string, got {value}")))
}

pub(crate) fn de_opt_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        _ => value_to_f64(&value).map(Some).ok_or_else(|| {
            de::Error::custom(format!("expected number or numeric string, got {value}"))
        }),
    }
}

/// Ids come back as strings on some endpoints and integers on others
pub(crate) fn de_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected string or number, got {other}"))),
    }
}

pub(crate) fn de_opt_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!("expected string or number, got {other}"))),
    }
}

pub(crate) fn de_opt_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_u64().or_else(|| n.as_f64().map(|f| f as u64))),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected integer, got {value}"))),
        _ => Err(de::Error::custom(format!("expected integer, got {value}"))),
    }
}
