use serde_json::{json, Value};

use super::event::{Payload, SensoryEvent};

/// Real-time awareness: the latest event per channel plus running counters,
/// refreshed synchronously on every ingest inside the same critical section
/// as the store pushes.
///
/// `total_perceptions` tracks the post-eviction global ring length;
/// `<channel>_count` is cumulative and keeps rising after the ring evicts.
/// The asymmetry is intentional: the counter is telemetry, not a live count.
#[derive(Debug, Default)]
pub struct AwarenessState {
    entries: Payload,
}

impl AwarenessState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: &SensoryEvent, memory_len: usize) {
        let tag = event.channel.as_str();

        self.entries
            .insert(format!("latest_{tag}"), Value::Object(event.to_map()));
        self.entries
            .insert("last_perception".into(), json!(event.timestamp));
        self.entries
            .insert("total_perceptions".into(), json!(memory_len));

        let count_key = format!("{tag}_count");
        let count = self
            .entries
            .get(&count_key)
            .and_then(Value::as_u64)
            .unwrap_or(0);
        self.entries.insert(count_key, json!(count + 1));
    }

    pub fn snapshot(&self) -> Payload {
        self.entries.clone()
    }

    pub fn channel_count(&self, tag: &str) -> u64 {
        self.entries
            .get(&format!("{tag}_count"))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Number of channels that have perceived at least one event.
    pub fn active_channels(&self) -> usize {
        self.entries
            .keys()
            .filter(|k| k.starts_with("latest_"))
            .count()
    }
}
