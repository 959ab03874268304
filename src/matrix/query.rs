use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use super::awareness::AwarenessState;
use super::channel::{SensoryChannel, Severity, ThreatLevel};
use super::event::{epoch_seconds, Payload, SensoryEvent};
use super::security::{self, ASSESSMENT_WINDOW};
use super::store::SensoryStore;
use super::synthesis::{PatternCache, SynthesisKind};

pub const AVAILABLE_QUERIES: [&str; 6] = [
    "system_health",
    "learning_progress",
    "agent_performance",
    "consciousness_state",
    "security_assessment",
    "threat_status",
];

pub fn unknown(query_type: &str) -> Payload {
    let mut out = Payload::new();
    out.insert("error".into(), json!("unknown_query_type"));
    out.insert("available_queries".into(), json!(AVAILABLE_QUERIES));
    tracing::debug!(query_type, "unknown query type");
    out
}

pub fn system_health(store: &SensoryStore) -> Payload {
    let vitals_count = store
        .iter()
        .filter(|e| e.channel == SensoryChannel::SystemVitals)
        .count()
        .min(10);
    let recent_errors = store
        .iter()
        .filter(|e| e.severity >= Severity::Error)
        .count()
        .min(20);

    let mut out = Payload::new();
    out.insert("query_type".into(), json!("system_health"));
    out.insert("vitals_count".into(), json!(vitals_count));
    out.insert("recent_errors".into(), json!(recent_errors));
    out.insert(
        "error_rate".into(),
        json!(recent_errors as f64 / store.len().max(1) as f64),
    );
    out.insert(
        "status".into(),
        json!(if recent_errors < 5 { "healthy" } else { "concerning" }),
    );
    out
}

pub fn learning_progress(store: &SensoryStore) -> Payload {
    let learning: Vec<&Arc<SensoryEvent>> = store
        .iter()
        .filter(|e| e.channel == SensoryChannel::LearningEvents)
        .collect();

    let mut out = Payload::new();
    out.insert("query_type".into(), json!("learning_progress"));

    if learning.is_empty() {
        out.insert("status".into(), json!("no_learning_detected"));
        return out;
    }

    let recent = &learning[learning.len().saturating_sub(20)..];
    let mut learning_types: BTreeMap<String, u64> = BTreeMap::new();
    for event in recent {
        let kind = event.payload_str("learning_type", "unknown").to_string();
        *learning_types.entry(kind).or_default() += 1;
    }

    out.insert("total_learning_events".into(), json!(learning.len()));
    out.insert("recent_learning_events".into(), json!(recent.len()));
    out.insert("learning_types".into(), json!(learning_types));
    out.insert(
        "learning_velocity".into(),
        json!(if recent.len() > 10 { "high" } else { "moderate" }),
    );
    out
}

pub fn agent_performance(store: &SensoryStore, agent_name: Option<&str>) -> Payload {
    let activities: Vec<&Arc<SensoryEvent>> = store
        .iter()
        .filter(|e| e.channel == SensoryChannel::AgentActivity)
        .filter(|e| match agent_name {
            Some(name) => e.payload_str("agent_name", "") == name,
            None => true,
        })
        .collect();

    let recent = &activities[activities.len().saturating_sub(50)..];
    let mut breakdown: BTreeMap<String, u64> = BTreeMap::new();
    for activity in recent {
        *breakdown.entry(activity.event_type.clone()).or_default() += 1;
    }

    let mut out = Payload::new();
    out.insert("query_type".into(), json!("agent_performance"));
    out.insert("agent_name".into(), json!(agent_name.unwrap_or("all_agents")));
    out.insert("total_activities".into(), json!(activities.len()));
    out.insert("recent_activities".into(), json!(recent.len()));
    out.insert("activity_breakdown".into(), json!(breakdown));
    out
}

pub fn consciousness_state(
    store: &SensoryStore,
    awareness: &AwarenessState,
    patterns: &PatternCache,
) -> Payload {
    let last_meta = patterns.recent(Some(SynthesisKind::Meta), 1).into_iter().next();

    let mut out = Payload::new();
    out.insert("query_type".into(), json!("consciousness_state"));
    out.insert("current_awareness".into(), Value::Object(awareness.snapshot()));
    out.insert(
        "consciousness_level".into(),
        last_meta
            .as_ref()
            .and_then(|r| r.fields.get("consciousness_level").cloned())
            .unwrap_or_else(|| json!("unknown")),
    );
    out.insert(
        "last_meta_synthesis".into(),
        last_meta.map(|r| json!(r.timestamp)).unwrap_or(Value::Null),
    );
    out.insert("total_perceptions".into(), json!(store.len()));
    out.insert("active_channels".into(), json!(awareness.active_channels()));
    out
}

pub fn security_assessment(store: &SensoryStore) -> Payload {
    let total_security = store
        .iter()
        .filter(|e| e.channel == SensoryChannel::SecurityEvents)
        .count();
    let total_threats = store
        .iter()
        .filter(|e| e.channel == SensoryChannel::ThreatDetection)
        .count();

    let synthesis = security::security_synthesis(&store.recent(ASSESSMENT_WINDOW));

    let mut out = Payload::new();
    out.insert("query_type".into(), json!("security_assessment"));
    out.insert(
        "security_posture".into(),
        synthesis
            .fields
            .get("security_posture")
            .cloned()
            .unwrap_or_else(|| json!("unknown")),
    );
    out.insert(
        "security_score".into(),
        synthesis.fields.get("security_score").cloned().unwrap_or(json!(0)),
    );
    out.insert("total_security_events".into(), json!(total_security));
    out.insert("total_threat_detections".into(), json!(total_threats));
    out.insert("recent_security_events".into(), json!(total_security.min(20)));
    out.insert("recent_threat_detections".into(), json!(total_threats.min(20)));
    out.insert(
        "active_threats".into(),
        synthesis.fields.get("active_threats").cloned().unwrap_or(json!([])),
    );
    out.insert(
        "recommendations".into(),
        synthesis.fields.get("recommendations").cloned().unwrap_or(json!([])),
    );
    out.insert("last_assessment".into(), json!(epoch_seconds()));
    out
}

pub fn threat_status(store: &SensoryStore) -> Payload {
    let threats: Vec<&Arc<SensoryEvent>> = store
        .iter()
        .filter(|e| e.channel == SensoryChannel::ThreatDetection)
        .collect();

    let mut out = Payload::new();
    out.insert("query_type".into(), json!("threat_status"));

    if threats.is_empty() {
        out.insert("status".into(), json!("no_threats_detected"));
        out.insert("active_threats".into(), json!([]));
        out.insert("threat_level".into(), json!("green"));
        return out;
    }

    let recent = &threats[threats.len().saturating_sub(50)..];
    let now = epoch_seconds();
    let mut active: Vec<Value> = Vec::new();
    let mut max_level: Option<ThreatLevel> = None;

    for threat in recent {
        let confidence = threat.payload_f64("confidence", 0.5);
        let level = ThreatLevel::parse(threat.payload_str("threat_level", "low"));
        let mitigated = threat.payload_bool("mitigation_applied", false);

        if confidence > 0.6 && !mitigated {
            active.push(json!({
                "type": threat.payload_str("threat_type", "unknown"),
                "confidence": confidence,
                "level": level.as_str(),
                "timestamp": threat.timestamp,
                "age_seconds": now - threat.timestamp,
            }));
            max_level = Some(max_level.map_or(level, |m| m.max(level)));
        }
    }

    let status = match max_level {
        Some(ThreatLevel::Critical) => "red",
        Some(ThreatLevel::High) => "orange",
        Some(ThreatLevel::Medium) => "yellow",
        _ => "green",
    };
    let highest = match max_level {
        Some(level) => level.as_str(),
        None => "none",
    };

    out.insert("status".into(), json!(status));
    out.insert("threat_level".into(), json!(status));
    out.insert("total_recent_threats".into(), json!(recent.len()));
    out.insert("unmitigated_threats".into(), json!(active.len()));
    out.insert("highest_threat_level".into(), json!(highest));
    out.insert("active_threats".into(), json!(active));
    out
}
