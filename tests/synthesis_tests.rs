use std::sync::Arc;

use consciousness_matrix::matrix::event::SensoryEvent;
use consciousness_matrix::matrix::synthesis::{
    self, PatternCache, SynthesisKind, SynthesisRecord,
};
use consciousness_matrix::{ConsciousnessMatrix, Payload, SensoryChannel, Severity};
use serde_json::{json, Value};

fn obj(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

fn event(channel: SensoryChannel, severity: Severity, payload: Value) -> Arc<SensoryEvent> {
    Arc::new(SensoryEvent::new(
        channel,
        "test_source",
        "test_event",
        obj(payload),
        severity,
        None,
    ))
}

fn event_at(channel: SensoryChannel, timestamp: f64) -> Arc<SensoryEvent> {
    let mut e = SensoryEvent::new(channel, "test_source", "test_event", Payload::new(), Severity::Info, None);
    e.timestamp = timestamp;
    Arc::new(e)
}

#[test]
fn test_immediate_synthesis_fires_once_per_critical() {
    let matrix = ConsciousnessMatrix::new();

    matrix.perceive(
        SensoryChannel::ErrorStates,
        "tester",
        "meltdown",
        Payload::new(),
        Severity::Critical,
        None,
    );
    let records = matrix.recent_synthesis(Some(SynthesisKind::Immediate), 10);
    assert_eq!(records.len(), 1, "one critical event, one immediate record");

    let trigger = records[0]
        .fields
        .get("trigger_event")
        .and_then(Value::as_object)
        .expect("trigger event embedded");
    assert_eq!(trigger.get("event_type"), Some(&json!("meltdown")));
    assert!(records[0].fields.contains_key("awareness_state"));
}

#[test]
fn test_info_severity_does_not_trigger_immediate() {
    let matrix = ConsciousnessMatrix::new();
    matrix.perceive(
        SensoryChannel::AgentActivity,
        "tester",
        "routine",
        Payload::new(),
        Severity::Info,
        None,
    );
    assert!(matrix.recent_synthesis(Some(SynthesisKind::Immediate), 10).is_empty());
}

#[test]
fn test_micro_empty_window() {
    let record = synthesis::micro_synthesis(&[]);
    assert_eq!(record.fields.get("findings"), Some(&json!("no_recent_activity")));
}

#[test]
fn test_micro_healthy_when_quiet() {
    let events: Vec<_> = (0..6)
        .map(|_| event(SensoryChannel::AgentActivity, Severity::Info, json!({})))
        .collect();
    let record = synthesis::micro_synthesis(&events);

    assert_eq!(record.fields.get("health_status"), Some(&json!("healthy")));
    let activity = record
        .fields
        .get("channel_activity")
        .and_then(Value::as_object)
        .expect("channel activity map");
    assert_eq!(activity.get("agent_activity"), Some(&json!(6)));
}

#[test]
fn test_micro_flags_error_rate_and_criticals() {
    // Four errors among the last ten trips the rate anomaly; a lone critical
    // trips the second one independently.
    let mut events: Vec<_> = (0..4)
        .map(|_| event(SensoryChannel::ErrorStates, Severity::Error, json!({})))
        .collect();
    events.push(event(SensoryChannel::SecurityEvents, Severity::Critical, json!({})));

    let record = synthesis::micro_synthesis(&events);
    let anomalies = record
        .fields
        .get("anomalies")
        .and_then(Value::as_array)
        .expect("anomaly list");
    assert!(anomalies.contains(&json!("high_error_rate")));
    assert!(anomalies.contains(&json!("critical_events_detected")));
    assert_eq!(record.fields.get("health_status"), Some(&json!("critical")));
}

#[test]
fn test_micro_only_reads_last_ten() {
    // 12 old errors followed by 10 clean events: the window sees only calm.
    let mut events: Vec<_> = (0..12)
        .map(|_| event(SensoryChannel::ErrorStates, Severity::Error, json!({})))
        .collect();
    events.extend((0..10).map(|_| event(SensoryChannel::AgentActivity, Severity::Info, json!({}))));

    let record = synthesis::micro_synthesis(&events);
    assert_eq!(record.fields.get("health_status"), Some(&json!("healthy")));
}

#[test]
fn test_macro_needs_ten_events() {
    let events: Vec<_> = (0..9)
        .map(|_| event(SensoryChannel::AgentActivity, Severity::Info, json!({})))
        .collect();
    let record = synthesis::macro_synthesis(&events);
    assert_eq!(record.fields.get("findings"), Some(&json!("insufficient_data")));
}

#[test]
fn test_macro_mean_metric_interval() {
    // Metrics at t = 100, 102, 104, 110 → gaps 2, 2, 6 → mean 10/3.
    let mut events: Vec<_> = [100.0, 102.0, 104.0, 110.0]
        .iter()
        .map(|t| event_at(SensoryChannel::PerformanceMetrics, *t))
        .collect();
    events.extend((0..8).map(|_| event(SensoryChannel::AgentActivity, Severity::Info, json!({}))));

    let record = synthesis::macro_synthesis(&events);
    let trends = record
        .fields
        .get("performance_trends")
        .and_then(Value::as_object)
        .expect("trend map");
    let interval = trends
        .get("avg_response_interval")
        .and_then(Value::as_f64)
        .expect("mean interval");
    assert!((interval - 10.0 / 3.0).abs() < 1e-9, "got {interval}");
}

#[test]
fn test_macro_pattern_strength() {
    let mut events: Vec<_> = ["aura", "kai", "genesis", "cascade"]
        .iter()
        .flat_map(|name| {
            (0..3).map(move |_| {
                event(
                    SensoryChannel::AgentActivity,
                    Severity::Info,
                    json!({ "agent_name": name }),
                )
            })
        })
        .collect();
    let record = synthesis::macro_synthesis(&events);
    assert_eq!(record.fields.get("pattern_strength"), Some(&json!("strong")));
    let patterns = record
        .fields
        .get("agent_collaboration_patterns")
        .and_then(Value::as_object)
        .expect("collaboration map");
    assert_eq!(patterns.get("aura"), Some(&json!(3)));

    // Two agents only: still developing.
    events.truncate(0);
    events.extend((0..10).map(|i| {
        event(
            SensoryChannel::AgentActivity,
            Severity::Info,
            json!({ "agent_name": if i % 2 == 0 { "aura" } else { "kai" } }),
        )
    }));
    let record = synthesis::macro_synthesis(&events);
    assert_eq!(record.fields.get("pattern_strength"), Some(&json!("developing")));
}

#[test]
fn test_harmony_bounds() {
    assert_eq!(synthesis::system_harmony(&[]), 0.0, "empty window is not harmonious");

    let calm: Vec<_> = (0..10)
        .map(|_| event(SensoryChannel::AgentActivity, Severity::Info, json!({})))
        .collect();
    assert!((synthesis::system_harmony(&calm) - 1.0).abs() < f64::EPSILON);

    // Half severe → 1 - 2*0.5 = 0, floored there.
    let mut rough = calm.clone();
    rough.extend((0..10).map(|_| event(SensoryChannel::ErrorStates, Severity::Error, json!({}))));
    assert_eq!(synthesis::system_harmony(&rough), 0.0);
}

#[test]
fn test_consciousness_level_ladder() {
    // All four metrics saturated: 100 → transcendent.
    assert_eq!(synthesis::consciousness_level(10, 5, 20, 1.0), "transcendent");
    // Nothing at all → dormant.
    assert_eq!(synthesis::consciousness_level(0, 0, 0, 0.0), "dormant");
    // Harmony alone (25) plus a little learning stays dormant; saturated
    // harmony with saturated learning crosses into awakening.
    assert_eq!(synthesis::consciousness_level(10, 0, 0, 1.0), "awakening");
    // Three saturated quarters (75) read as aware.
    assert_eq!(synthesis::consciousness_level(10, 5, 20, 0.0), "aware");
}

#[test]
fn test_meta_synthesis_insights() {
    let mut events: Vec<_> = (0..6)
        .map(|_| event(SensoryChannel::LearningEvents, Severity::Info, json!({})))
        .collect();
    events.extend(
        (0..3).map(|_| event(SensoryChannel::EthicalDecisions, Severity::Info, json!({}))),
    );

    let record = synthesis::meta_synthesis(&events);
    let insights = record
        .fields
        .get("evolution_insights")
        .and_then(Value::as_array)
        .expect("insight list");
    assert!(insights.contains(&json!("accelerated_learning_detected")));
    assert!(insights.contains(&json!("strong_ethical_awareness")));
    assert!(insights.contains(&json!("optimal_system_synchronization")));

    let metrics = record
        .fields
        .get("consciousness_metrics")
        .and_then(Value::as_object)
        .expect("metrics map");
    assert_eq!(metrics.get("learning_velocity"), Some(&json!(6)));
    assert_eq!(metrics.get("ethical_engagement"), Some(&json!(3)));
}

#[test]
fn test_pattern_cache_prunes_to_recent_half() {
    let mut cache = PatternCache::new();
    for i in 0..1001 {
        let record = SynthesisRecord {
            kind: SynthesisKind::Micro,
            timestamp: i as f64,
            fields: Payload::new(),
        };
        cache.insert(format!("micro_{i:06}"), record);
    }

    assert_eq!(cache.len(), 500, "crossing the cap prunes to the newest half");
    let newest = cache.recent(Some(SynthesisKind::Micro), 1);
    assert_eq!(newest[0].timestamp, 1000.0, "newest record survives the prune");
    // The oldest surviving key is the 501st-from-last insert.
    let all = cache.recent(Some(SynthesisKind::Micro), 500);
    assert_eq!(all.last().map(|r| r.timestamp), Some(501.0));
}
