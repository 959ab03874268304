use std::sync::Arc;

use serde_json::{json, Value};

use super::channel::{SensoryChannel, ThreatLevel};
use super::event::{Payload, SensoryEvent};
use super::synthesis::{SynthesisKind, SynthesisRecord};

/// How many global events a posture assessment reads back.
pub const ASSESSMENT_WINDOW: usize = 200;

/// Security posture over recent events. Pure; recomputed on demand by the
/// query facade rather than scheduled.
///
/// Score starts at 100 and takes bounded deductions for confidence-weighted
/// high/critical threats, failed access attempts, and crypto failures. It is
/// deliberately not clamped: a negative score still classifies as critical.
pub fn security_synthesis(recent: &[Arc<SensoryEvent>]) -> SynthesisRecord {
    let by_channel = |channel: SensoryChannel| -> Vec<&Arc<SensoryEvent>> {
        recent.iter().filter(|e| e.channel == channel).collect()
    };

    let security_events = by_channel(SensoryChannel::SecurityEvents);
    let threat_detections = by_channel(SensoryChannel::ThreatDetection);
    let access_events = by_channel(SensoryChannel::AccessControl);
    let crypto_events = by_channel(SensoryChannel::EncryptionActivity);

    // Confidence-weighted mass per level, last 20 detections.
    let mut threat_levels = [0.0f64; 4];
    for threat in tail(&threat_detections, 20) {
        let level = ThreatLevel::parse(threat.payload_str("threat_level", "low"));
        threat_levels[level as usize] += threat.payload_f64("confidence", 0.5);
    }

    let failed_access = tail(&access_events, 50)
        .iter()
        .filter(|a| !a.payload_bool("access_granted", true))
        .count();

    let crypto_failures = tail(&crypto_events, 30)
        .iter()
        .filter(|c| !c.payload_bool("success", true))
        .count();

    let mut score = 100.0;
    score -= (threat_levels[ThreatLevel::High as usize] * 20.0).min(40.0);
    score -= (threat_levels[ThreatLevel::Critical as usize] * 30.0).min(50.0);
    score -= (failed_access as f64 * 2.0).min(20.0);
    score -= (crypto_failures as f64 * 5.0).min(30.0);

    let posture = if score >= 90.0 {
        "excellent"
    } else if score >= 75.0 {
        "good"
    } else if score >= 50.0 {
        "concerning"
    } else {
        "critical"
    };

    // Unmitigated high-confidence detections among the last 10.
    let active_threats: Vec<Value> = tail(&threat_detections, 10)
        .iter()
        .filter(|t| t.payload_f64("confidence", 0.0) > 0.7)
        .filter(|t| !t.payload_bool("mitigation_applied", false))
        .map(|t| {
            json!({
                "type": t.payload_str("threat_type", "unknown"),
                "confidence": t.payload_f64("confidence", 0.0),
                "timestamp": t.timestamp,
            })
        })
        .collect();

    let recommendations =
        security_recommendations(score, active_threats.len(), failed_access, crypto_failures);

    let mut levels = Payload::new();
    for level in [ThreatLevel::Low, ThreatLevel::Medium, ThreatLevel::High, ThreatLevel::Critical] {
        levels.insert(level.as_str().into(), json!(threat_levels[level as usize]));
    }

    let mut fields = Payload::new();
    fields.insert("security_score".into(), json!(score));
    fields.insert("security_posture".into(), json!(posture));
    fields.insert("threat_levels".into(), Value::Object(levels));
    fields.insert("failed_access_attempts".into(), json!(failed_access));
    fields.insert("crypto_failures".into(), json!(crypto_failures));
    fields.insert("active_threats".into(), json!(active_threats));
    fields.insert("security_events_count".into(), json!(security_events.len()));
    fields.insert("recommendations".into(), json!(recommendations));

    SynthesisRecord {
        kind: SynthesisKind::Security,
        timestamp: super::event::epoch_seconds(),
        fields,
    }
}

/// Fixed priority order; each condition appends independently. The healthy
/// default appears only when nothing else fired.
fn security_recommendations(
    score: f64,
    active_threats: usize,
    failed_access: usize,
    crypto_failures: usize,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if score < 50.0 {
        recommendations
            .push("URGENT: Security posture is critical - immediate intervention required".into());
    }
    if active_threats > 0 {
        recommendations.push(format!(
            "Active threats detected: {active_threats} unmitigated threats"
        ));
    }
    if failed_access > 10 {
        recommendations
            .push("High number of failed access attempts - potential brute force attack".into());
    }
    if crypto_failures > 5 {
        recommendations
            .push("Encryption system instability - review cryptographic operations".into());
    }
    if score < 75.0 {
        recommendations.push("Increase security monitoring frequency".into());
    }
    if recommendations.is_empty() {
        recommendations.push("Security posture is healthy - maintain current protocols".into());
    }

    recommendations
}

fn tail<'a>(events: &'a [&'a Arc<SensoryEvent>], limit: usize) -> &'a [&'a Arc<SensoryEvent>] {
    &events[events.len().saturating_sub(limit)..]
}
