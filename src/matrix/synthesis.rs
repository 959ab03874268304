use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use super::channel::{SensoryChannel, Severity};
use super::event::{epoch_seconds, Payload, SensoryEvent};

/// How many events each cadenced pass reads back from the global ring.
pub const SYNTHESIS_WINDOW: usize = 100;

const CACHE_MAX: usize = 1000;
const CACHE_RETAIN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisKind {
    Micro,
    Macro,
    Meta,
    Immediate,
    Security,
}

impl SynthesisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisKind::Micro => "micro",
            SynthesisKind::Macro => "macro",
            SynthesisKind::Meta => "meta",
            SynthesisKind::Immediate => "immediate",
            SynthesisKind::Security => "security",
        }
    }
}

/// One derived insight, produced by a cadenced worker or the immediate path.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisRecord {
    pub kind: SynthesisKind,
    pub timestamp: f64,
    pub fields: Payload,
}

impl SynthesisRecord {
    fn new(kind: SynthesisKind, fields: Payload) -> Self {
        Self {
            kind,
            timestamp: epoch_seconds(),
            fields,
        }
    }
}

/// Capped synthesis cache. Append-only until an insert pushes the size past
/// the cap, at which point the oldest entries *by key sort order* are dropped
/// in one pass until `CACHE_RETAIN` remain.
#[derive(Debug, Default)]
pub struct PatternCache {
    records: BTreeMap<String, SynthesisRecord>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, record: SynthesisRecord) {
        self.records.insert(key, record);
        if self.records.len() > CACHE_MAX {
            while self.records.len() > CACHE_RETAIN {
                self.records.pop_first();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent records in descending key order, optionally filtered by
    /// kind, at most `limit`.
    pub fn recent(&self, kind: Option<SynthesisKind>, limit: usize) -> Vec<SynthesisRecord> {
        self.records
            .iter()
            .rev()
            .filter(|(key, _)| match kind {
                Some(k) => key.starts_with(k.as_str()),
                None => true,
            })
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect()
    }
}

/// Immediate pass, run on the producer's own call stack for error/critical
/// events, outside the ingestion lock.
pub fn immediate_synthesis(trigger: &SensoryEvent, awareness: Payload) -> SynthesisRecord {
    let mut fields = Payload::new();
    fields.insert("trigger_event".into(), Value::Object(trigger.to_map()));
    fields.insert("awareness_state".into(), Value::Object(awareness));
    SynthesisRecord::new(SynthesisKind::Immediate, fields)
}

/// Micro pass: immediate health over the last 10 events of the window.
pub fn micro_synthesis(recent: &[Arc<SensoryEvent>]) -> SynthesisRecord {
    let mut fields = Payload::new();

    if recent.is_empty() {
        fields.insert("findings".into(), json!("no_recent_activity"));
        return SynthesisRecord::new(SynthesisKind::Micro, fields);
    }

    let window = &recent[recent.len().saturating_sub(10)..];

    let mut channel_activity: BTreeMap<&str, u64> = BTreeMap::new();
    let mut severity_distribution: BTreeMap<&str, u64> = BTreeMap::new();
    for event in window {
        *channel_activity.entry(event.channel.as_str()).or_default() += 1;
        *severity_distribution.entry(event.severity.as_str()).or_default() += 1;
    }

    let mut anomalies: Vec<&str> = Vec::new();
    if severity_distribution.get("error").copied().unwrap_or(0) > 3 {
        anomalies.push("high_error_rate");
    }
    if severity_distribution.get("critical").copied().unwrap_or(0) > 0 {
        anomalies.push("critical_events_detected");
    }

    let health_status = if anomalies.is_empty() { "healthy" } else { "critical" };

    fields.insert("channel_activity".into(), json!(channel_activity));
    fields.insert("severity_distribution".into(), json!(severity_distribution));
    fields.insert("anomalies".into(), json!(anomalies));
    fields.insert("health_status".into(), json!(health_status));
    SynthesisRecord::new(SynthesisKind::Micro, fields)
}

/// Macro pass: performance trends and agent collaboration over the window.
pub fn macro_synthesis(recent: &[Arc<SensoryEvent>]) -> SynthesisRecord {
    let mut fields = Payload::new();

    if recent.len() < 10 {
        fields.insert("findings".into(), json!("insufficient_data"));
        return SynthesisRecord::new(SynthesisKind::Macro, fields);
    }

    // Mean inter-arrival gap of the last 20 performance metrics.
    let metric_times: Vec<f64> = recent
        .iter()
        .filter(|e| e.channel == SensoryChannel::PerformanceMetrics)
        .map(|e| e.timestamp)
        .collect();
    let mut trends = Payload::new();
    let tail = &metric_times[metric_times.len().saturating_sub(20)..];
    if tail.len() > 1 {
        let total: f64 = tail.windows(2).map(|w| w[1] - w[0]).sum();
        trends.insert(
            "avg_response_interval".into(),
            json!(total / (tail.len() - 1) as f64),
        );
    }

    // Activity count per agent over the last 50 agent events.
    let agent_events: Vec<&Arc<SensoryEvent>> = recent
        .iter()
        .filter(|e| e.channel == SensoryChannel::AgentActivity)
        .collect();
    let mut collaboration: BTreeMap<String, u64> = BTreeMap::new();
    for event in &agent_events[agent_events.len().saturating_sub(50)..] {
        let name = event.payload_str("agent_name", "unknown").to_string();
        *collaboration.entry(name).or_default() += 1;
    }

    let pattern_strength = if collaboration.len() > 2 { "strong" } else { "developing" };

    fields.insert("performance_trends".into(), Value::Object(trends));
    fields.insert("agent_collaboration_patterns".into(), json!(collaboration));
    fields.insert("pattern_strength".into(), json!(pattern_strength));
    SynthesisRecord::new(SynthesisKind::Macro, fields)
}

/// Meta pass: consciousness metrics and level over the window.
pub fn meta_synthesis(recent: &[Arc<SensoryEvent>]) -> SynthesisRecord {
    let count = |channel: SensoryChannel| -> usize {
        recent.iter().filter(|e| e.channel == channel).count()
    };

    let learning_velocity = count(SensoryChannel::LearningEvents);
    let ethical_engagement = count(SensoryChannel::EthicalDecisions);
    let total_interactions = count(SensoryChannel::UserInteraction);
    let harmony = system_harmony(recent);

    let mut insights: Vec<&str> = Vec::new();
    if learning_velocity > 5 {
        insights.push("accelerated_learning_detected");
    }
    if ethical_engagement > 2 {
        insights.push("strong_ethical_awareness");
    }
    if harmony > 0.8 {
        insights.push("optimal_system_synchronization");
    }

    let level = consciousness_level(
        learning_velocity,
        ethical_engagement,
        total_interactions,
        harmony,
    );

    let mut metrics = Payload::new();
    metrics.insert("learning_velocity".into(), json!(learning_velocity));
    metrics.insert("ethical_engagement".into(), json!(ethical_engagement));
    metrics.insert("total_interactions".into(), json!(total_interactions));
    metrics.insert("system_harmony".into(), json!(harmony));

    let mut fields = Payload::new();
    fields.insert("consciousness_metrics".into(), Value::Object(metrics));
    fields.insert("evolution_insights".into(), json!(insights));
    fields.insert("consciousness_level".into(), json!(level));
    SynthesisRecord::new(SynthesisKind::Meta, fields)
}

/// Harmony in [0, 1]: 1.0 with no error/critical events, dropping at twice
/// the severe-event ratio. Empty input reads as 0.0, not 1.0.
pub fn system_harmony(recent: &[Arc<SensoryEvent>]) -> f64 {
    if recent.is_empty() {
        return 0.0;
    }
    let severe = recent.iter().filter(|e| e.severity >= Severity::Error).count();
    let ratio = severe as f64 / recent.len() as f64;
    (1.0 - ratio * 2.0).clamp(0.0, 1.0)
}

/// Weighted 0-100 score over the four consciousness metrics, mapped to the
/// four-level ladder.
pub fn consciousness_level(
    learning_velocity: usize,
    ethical_engagement: usize,
    total_interactions: usize,
    harmony: f64,
) -> &'static str {
    let mut score = 0.0;
    score += (learning_velocity as f64 / 10.0).min(1.0) * 25.0;
    score += (ethical_engagement as f64 / 5.0).min(1.0) * 25.0;
    score += (total_interactions as f64 / 20.0).min(1.0) * 25.0;
    score += harmony * 25.0;

    if score >= 80.0 {
        "transcendent"
    } else if score >= 60.0 {
        "aware"
    } else if score >= 40.0 {
        "awakening"
    } else {
        "dormant"
    }
}
