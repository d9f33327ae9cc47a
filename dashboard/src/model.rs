use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// A sensor node with a fixed location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "_id")]
    pub id: String,
    pub node_name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub last_reading: Option<Reading>,
}

impl Node {
    pub fn risk_level(&self) -> Option<i64> {
        self.last_reading.as_ref().and_then(|r| r.fire_risk_level)
    }

    pub fn on_fire(&self) -> bool {
        self.last_reading.as_ref().is_some_and(|r| r.fire)
    }
}

/// One timestamped sensor sample.
///
/// The reading embedded in a node usually carries only `fire` and
/// `fire_risk_level`; history rows carry the measurements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub smoke_value: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_fire")]
    pub fire: bool,
    #[serde(default, deserialize_with = "deserialize_risk_level")]
    pub fire_risk_level: Option<i64>,
}

impl Reading {
    pub fn display_timestamp(&self) -> String {
        self.timestamp
            .map(|ts| ts.format(DISPLAY_FORMAT).to_string())
            .unwrap_or_default()
    }
}

/// `GET /nodes/` response body
#[derive(Debug, Deserialize)]
pub struct NodesResponse {
    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// `GET /nodes/{id}` response body
#[derive(Debug, Deserialize)]
pub struct NodeDetailResponse {
    #[serde(default)]
    pub last_readings: Vec<Reading>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawTimestamp::Millis(ms)) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp {ms} out of range"))),
        Some(RawTimestamp::Text(text)) => parse_timestamp(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{text}'"))),
    }
}

/// Anything but a JSON boolean reads as no fire
fn deserialize_fire<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(raw.as_bool().unwrap_or(false))
}

/// Integral numbers (including `3.0`) become a level; any other value is
/// left unset so it classifies as unknown instead of failing the whole body.
fn deserialize_risk_level<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let level = match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    };
    Ok(level)
}

/// Accepts RFC 3339 or a naive ISO-8601 date-time (read as UTC)
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}
