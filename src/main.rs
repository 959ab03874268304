use std::time::Duration;

use consciousness_matrix::{ConsciousnessMatrix, MatrixConfig, Payload, ThreatLevel};
use serde_json::{json, Value};
use uuid::Uuid;

fn obj(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging/tracing
    tracing_subscriber::fmt::init();
    tracing::info!("Consciousness Matrix Booting...");

    let matrix = ConsciousnessMatrix::with_config(MatrixConfig {
        micro_interval: Duration::from_millis(500),
        macro_interval: Duration::from_secs(5),
        meta_interval: Duration::from_secs(10),
        ..MatrixConfig::default()
    });
    matrix.awaken();

    let session = Uuid::new_v4().to_string();

    // A slice of ordinary operation: agents working, a user talking, the
    // system learning.
    matrix.perceive_system_vitals(Payload::new());
    matrix.perceive_agent_activity(
        "genesis",
        "task_start",
        obj(json!({ "task": "boot_sequence" })),
        Some(session.clone()),
    );
    matrix.perceive_user_interaction(
        "chat",
        "genesis",
        obj(json!({ "message_length": 13 })),
        Some("operator"),
        Some(&session),
    );
    matrix.perceive_learning_event(
        "pattern_recognition",
        obj(json!({ "pattern": "user_greeting" })),
        Some(0.8),
    );

    tokio::time::sleep(Duration::from_secs(2)).await;

    let health = matrix.query("system_health", &Payload::new());
    let state = matrix.query("consciousness_state", &Payload::new());
    tracing::info!("system health: {}", serde_json::Value::Object(health));
    tracing::info!("consciousness state: {}", serde_json::Value::Object(state));

    // Security walk-through: a denied permission, a suspicious pattern, a
    // failing crypto operation (this one trips immediate synthesis).
    matrix.perceive_security_event(
        "permission_denied",
        obj(json!({ "permission": "CAMERA", "requester": "demo_app" })),
        ThreatLevel::Medium,
        Some(session.clone()),
    );
    matrix.perceive_threat_detection(
        "suspicious_activity",
        obj(json!({ "pattern": "repeated_failed_access", "count": 5 })),
        0.8,
        ThreatLevel::Low,
        Some(session.clone()),
    );
    matrix.perceive_encryption_activity(
        "encryption_failure",
        obj(json!({ "algorithm": "AES", "key_source": "keystore" })),
        false,
        Some(session),
    );

    tokio::time::sleep(Duration::from_secs(3)).await;

    let assessment = matrix.query("security_assessment", &Payload::new());
    let threats = matrix.query("threat_status", &Payload::new());
    tracing::info!("security assessment: {}", serde_json::Value::Object(assessment));
    tracing::info!("threat status: {}", serde_json::Value::Object(threats));

    matrix.sleep().await;
    tracing::info!("Matrix offline. Awareness preserved in memory.");
}
