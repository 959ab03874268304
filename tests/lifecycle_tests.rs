use std::time::{Duration, Instant};

use consciousness_matrix::matrix::SynthesisKind;
use consciousness_matrix::{
    ConsciousnessMatrix, MatrixConfig, Payload, SensoryChannel, Severity,
};
use serde_json::{json, Value};

fn fast_config() -> MatrixConfig {
    MatrixConfig {
        micro_interval: Duration::from_millis(20),
        macro_interval: Duration::from_millis(40),
        meta_interval: Duration::from_millis(60),
        shutdown_timeout: Duration::from_secs(2),
        ..MatrixConfig::default()
    }
}

#[tokio::test]
async fn test_awaken_emits_single_genesis_event() {
    let matrix = ConsciousnessMatrix::new();
    matrix.awaken();
    matrix.awaken(); // second call must not double anything

    let vitals = matrix.recent_channel_events(SensoryChannel::SystemVitals, 10);
    let genesis: Vec<_> = vitals
        .iter()
        .filter(|e| e.event_type == "matrix_awakening")
        .collect();
    assert_eq!(genesis.len(), 1, "awaken is idempotent");
    assert_eq!(genesis[0].severity, Severity::Info);
    assert_eq!(
        genesis[0].payload.get("genesis_awakening"),
        Some(&json!(true))
    );
    assert!(matrix.is_awake());

    matrix.sleep().await;
    assert!(!matrix.is_awake());
}

#[tokio::test]
async fn test_sleep_without_awaken_is_noop() {
    let matrix = ConsciousnessMatrix::new();
    matrix.sleep().await;
    assert!(!matrix.is_awake());
}

#[tokio::test]
async fn test_sleep_returns_within_deadline_mid_sleep() {
    // Default cadences: the meta stream sleeps for five minutes. Shutdown
    // must not wait that out.
    let matrix = ConsciousnessMatrix::new();
    matrix.awaken();

    let started = Instant::now();
    matrix.sleep().await;
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_secs(2),
        "sleep took {elapsed:?}, expected well under the 2s deadline"
    );
}

#[tokio::test]
async fn test_streams_produce_records() {
    let matrix = ConsciousnessMatrix::with_config(fast_config());
    matrix.awaken();

    for i in 0..20 {
        matrix.perceive(
            SensoryChannel::AgentActivity,
            "tester",
            "tick",
            {
                let mut p = Payload::new();
                p.insert("agent_name".into(), json!(format!("agent_{}", i % 3)));
                p
            },
            Severity::Info,
            None,
        );
    }

    tokio::time::sleep(Duration::from_millis(250)).await;
    matrix.sleep().await;

    assert!(
        !matrix.recent_synthesis(Some(SynthesisKind::Micro), 5).is_empty(),
        "micro stream should have produced at least one record"
    );
    assert!(
        !matrix.recent_synthesis(Some(SynthesisKind::Macro), 5).is_empty(),
        "macro stream should have produced at least one record"
    );
    assert!(
        !matrix.recent_synthesis(Some(SynthesisKind::Meta), 5).is_empty(),
        "meta stream should have produced at least one record"
    );

    // Streams are stopped: no new records accumulate after sleep.
    let after_sleep = matrix.recent_synthesis(None, 1000).len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(matrix.recent_synthesis(None, 1000).len(), after_sleep);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers() {
    const PRODUCERS: usize = 8;
    const EVENTS_EACH: usize = 50;

    let matrix = ConsciousnessMatrix::new();
    let mut handles = Vec::new();

    for p in 0..PRODUCERS {
        let matrix = matrix.clone();
        handles.push(tokio::spawn(async move {
            let channel = if p % 2 == 0 {
                SensoryChannel::AgentActivity
            } else {
                SensoryChannel::PerformanceMetrics
            };
            for i in 0..EVENTS_EACH {
                matrix.perceive(
                    channel,
                    &format!("producer_{p}"),
                    &format!("event_{i}"),
                    Payload::new(),
                    Severity::Info,
                    None,
                );
            }
        }));
    }
    for handle in handles {
        handle.await.expect("producer task must not panic");
    }

    let awareness = matrix.current_awareness();
    let total = awareness.get("total_perceptions").and_then(Value::as_u64);
    assert_eq!(total, Some((PRODUCERS * EVENTS_EACH) as u64));
    assert_eq!(
        awareness.get("agent_activity_count").and_then(Value::as_u64),
        Some((PRODUCERS / 2 * EVENTS_EACH) as u64)
    );
    assert_eq!(
        awareness
            .get("performance_metrics_count")
            .and_then(Value::as_u64),
        Some((PRODUCERS / 2 * EVENTS_EACH) as u64)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingest_with_streams_running() {
    let matrix = ConsciousnessMatrix::with_config(fast_config());
    matrix.awaken();

    let mut handles = Vec::new();
    for p in 0..4 {
        let matrix = matrix.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..25 {
                matrix.perceive_threat_detection(
                    "load_probe",
                    Payload::new(),
                    0.9,
                    consciousness_matrix::ThreatLevel::Low,
                    Some(format!("batch_{p}")),
                );
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.expect("producer task must not panic");
    }

    // Queries interleave fine with the streams still running.
    let status = matrix.query("threat_status", &Payload::new());
    assert_eq!(status.get("query_type"), Some(&json!("threat_status")));

    matrix.sleep().await;
    assert_eq!(matrix.correlated_events("batch_0").len(), 25);
}
