use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

use super::channel::{SensoryChannel, Severity};

/// Arbitrary JSON-like payload attached to an event. Producer-supplied and
/// stored as-is; the matrix performs no schema validation on its contents.
pub type Payload = serde_json::Map<String, Value>;

/// A single perception. Constructed once at ingestion time and never mutated;
/// the stores share it immutably afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct SensoryEvent {
    /// Epoch seconds at ingestion.
    pub timestamp: f64,
    pub channel: SensoryChannel,
    pub source: String,
    pub event_type: String,
    pub payload: Payload,
    pub severity: Severity,
    pub correlation_id: Option<String>,
}

impl SensoryEvent {
    pub fn new(
        channel: SensoryChannel,
        source: impl Into<String>,
        event_type: impl Into<String>,
        payload: Payload,
        severity: Severity,
        correlation_id: Option<String>,
    ) -> Self {
        Self {
            timestamp: epoch_seconds(),
            channel,
            source: source.into(),
            event_type: event_type.into(),
            payload,
            severity,
            correlation_id,
        }
    }

    /// Flat-map rendering: channel as its string tag, timestamp both raw and
    /// as ISO-8601 UTC.
    pub fn to_map(&self) -> Payload {
        let mut map = Payload::new();
        map.insert("timestamp".into(), json!(self.timestamp));
        map.insert("timestamp_iso".into(), json!(iso8601(self.timestamp)));
        map.insert("channel".into(), json!(self.channel.as_str()));
        map.insert("source".into(), json!(self.source));
        map.insert("event_type".into(), json!(self.event_type));
        map.insert("payload".into(), Value::Object(self.payload.clone()));
        map.insert("severity".into(), json!(self.severity.as_str()));
        map.insert("correlation_id".into(), json!(self.correlation_id));
        map
    }

    /// Total read: missing or mistyped keys fall back to `default`.
    pub fn payload_f64(&self, key: &str, default: f64) -> f64 {
        self.payload.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn payload_bool(&self, key: &str, default: bool) -> bool {
        self.payload.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn payload_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.payload.get(key).and_then(Value::as_str).unwrap_or(default)
    }
}

pub fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

pub fn iso8601(timestamp: f64) -> String {
    let secs = timestamp.floor() as i64;
    let nanos = ((timestamp - timestamp.floor()) * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Micros, true))
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string())
}
