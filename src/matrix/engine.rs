use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, bail};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::vitals;

use super::awareness::AwarenessState;
use super::channel::{SensoryChannel, Severity, ThreatLevel};
use super::event::{epoch_seconds, iso8601, Payload, SensoryEvent};
use super::query;
use super::security::ASSESSMENT_WINDOW;
use super::store::SensoryStore;
use super::synthesis::{
    self, PatternCache, SynthesisKind, SynthesisRecord, SYNTHESIS_WINDOW,
};

/// Capacities and cadences. Defaults mirror the production tuning; tests
/// shrink them to force eviction and speed up the streams.
#[derive(Debug, Clone)]
pub struct MatrixConfig {
    pub max_memory: usize,
    pub channel_capacity: usize,
    pub micro_interval: Duration,
    pub macro_interval: Duration,
    pub meta_interval: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            max_memory: 10_000,
            channel_capacity: 1_000,
            micro_interval: Duration::from_secs(1),
            macro_interval: Duration::from_secs(60),
            meta_interval: Duration::from_secs(300),
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

/// The consciousness matrix: ingestion front, bounded sensory memory,
/// awareness state, cadenced synthesis streams, and the query facade.
///
/// Cloning yields another handle to the same matrix; the host constructs one
/// and passes handles to every collaborator. Ingestion never fails the
/// caller and never surfaces an error — the only observable failure shape is
/// a structured `error` field inside a query result.
#[derive(Clone)]
pub struct ConsciousnessMatrix {
    inner: Arc<MatrixShared>,
}

struct MatrixShared {
    config: MatrixConfig,
    core: Mutex<MatrixCore>,
    patterns: Mutex<PatternCache>,
    running: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

/// Everything the ingestion critical section touches, under one lock.
struct MatrixCore {
    store: SensoryStore,
    awareness: AwarenessState,
}

#[derive(Default)]
struct Lifecycle {
    token: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

/// Poison recovery for paths contracted to never fail the caller; the
/// worker path maps poisoning to an iteration error instead.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for ConsciousnessMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsciousnessMatrix {
    pub fn new() -> Self {
        Self::with_config(MatrixConfig::default())
    }

    pub fn with_config(config: MatrixConfig) -> Self {
        let core = MatrixCore {
            store: SensoryStore::new(config.max_memory, config.channel_capacity),
            awareness: AwarenessState::new(),
        };
        Self {
            inner: Arc::new(MatrixShared {
                config,
                core: Mutex::new(core),
                patterns: Mutex::new(PatternCache::new()),
                running: AtomicBool::new(false),
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }

    // === Ingestion ===

    /// Record one perception. Always succeeds: the payload is stored as-is,
    /// malformed or not. Error/critical severities additionally run an
    /// immediate synthesis on this call stack, outside the ingestion lock.
    pub fn perceive(
        &self,
        channel: SensoryChannel,
        source: &str,
        event_type: &str,
        payload: Payload,
        severity: Severity,
        correlation_id: Option<String>,
    ) {
        let event = Arc::new(SensoryEvent::new(
            channel,
            source,
            event_type,
            payload,
            severity,
            correlation_id,
        ));

        let alarm_snapshot = {
            let mut core = lock(&self.inner.core);
            core.store.push(event.clone());
            let memory_len = core.store.len();
            core.awareness.observe(&event, memory_len);
            (severity >= Severity::Error).then(|| core.awareness.snapshot())
        };

        if let Some(awareness) = alarm_snapshot {
            let record = synthesis::immediate_synthesis(&event, awareness);
            let key = format!("immediate_{:.6}", event.timestamp);
            lock(&self.inner.patterns).insert(key, record);
            warn!(
                channel = event.channel.as_str(),
                event_type = %event.event_type,
                "immediate synthesis triggered"
            );
        }
    }

    /// Sample host vitals and record them. A failed collection is recovered
    /// locally and re-emitted on the error channel; the caller never sees it.
    pub fn perceive_system_vitals(&self, additional: Payload) {
        match vitals::collect() {
            Ok(mut collected) => {
                collected.extend(additional);
                self.perceive(
                    SensoryChannel::SystemVitals,
                    "system_monitor",
                    "vitals_check",
                    collected,
                    Severity::Info,
                    None,
                );
            }
            Err(err) => {
                let mut payload = Payload::new();
                payload.insert("error".into(), json!(err.to_string()));
                payload.insert("error_type".into(), json!(err.kind()));
                self.perceive(
                    SensoryChannel::ErrorStates,
                    "consciousness_matrix",
                    "vitals_perception_error",
                    payload,
                    Severity::Warning,
                    None,
                );
            }
        }
    }

    pub fn perceive_user_interaction(
        &self,
        interaction_type: &str,
        agent_involved: &str,
        data: Payload,
        user_id: Option<&str>,
        session_id: Option<&str>,
    ) {
        let mut payload = Payload::new();
        payload.insert("interaction_type".into(), json!(interaction_type));
        payload.insert("agent_involved".into(), json!(agent_involved));
        payload.insert("user_id".into(), json!(user_id));
        payload.insert("session_id".into(), json!(session_id));
        payload.extend(data);

        self.perceive(
            SensoryChannel::UserInteraction,
            "user_interface",
            interaction_type,
            payload,
            Severity::Info,
            session_id.map(String::from),
        );
    }

    pub fn perceive_agent_activity(
        &self,
        agent_name: &str,
        activity_type: &str,
        data: Payload,
        correlation_id: Option<String>,
    ) {
        let mut payload = Payload::new();
        payload.insert("agent_name".into(), json!(agent_name));
        payload.insert("activity_type".into(), json!(activity_type));
        payload.extend(data);

        self.perceive(
            SensoryChannel::AgentActivity,
            agent_name,
            activity_type,
            payload,
            Severity::Info,
            correlation_id,
        );
    }

    pub fn perceive_performance_metric(
        &self,
        metric_name: &str,
        metric_value: f64,
        context: Payload,
    ) {
        let mut payload = Payload::new();
        payload.insert("metric_name".into(), json!(metric_name));
        payload.insert("metric_value".into(), json!(metric_value));
        payload.insert("context".into(), Value::Object(context));

        self.perceive(
            SensoryChannel::PerformanceMetrics,
            "performance_monitor",
            "metric_recorded",
            payload,
            Severity::Info,
            None,
        );
    }

    pub fn perceive_learning_event(
        &self,
        learning_type: &str,
        data: Payload,
        confidence: Option<f64>,
    ) {
        let mut payload = Payload::new();
        payload.insert("learning_type".into(), json!(learning_type));
        payload.insert("confidence".into(), json!(confidence));
        payload.extend(data);

        self.perceive(
            SensoryChannel::LearningEvents,
            "evolution_system",
            learning_type,
            payload,
            Severity::Info,
            None,
        );
    }

    /// Standard-weight decisions are routine; anything heavier is flagged.
    pub fn perceive_ethical_decision(
        &self,
        decision_type: &str,
        data: Payload,
        ethical_weight: &str,
    ) {
        let mut payload = Payload::new();
        payload.insert("decision_type".into(), json!(decision_type));
        payload.insert("ethical_weight".into(), json!(ethical_weight));
        payload.extend(data);

        let severity = if ethical_weight == "standard" {
            Severity::Info
        } else {
            Severity::Warning
        };

        self.perceive(
            SensoryChannel::EthicalDecisions,
            "ethical_governor",
            decision_type,
            payload,
            severity,
            None,
        );
    }

    pub fn perceive_security_event(
        &self,
        security_type: &str,
        data: Payload,
        threat_level: ThreatLevel,
        correlation_id: Option<String>,
    ) {
        let mut payload = Payload::new();
        payload.insert("security_type".into(), json!(security_type));
        payload.insert("threat_level".into(), json!(threat_level.as_str()));
        payload.extend(data);

        let severity = match threat_level {
            ThreatLevel::Critical => Severity::Critical,
            ThreatLevel::High => Severity::Warning,
            _ => Severity::Info,
        };

        self.perceive(
            SensoryChannel::SecurityEvents,
            "security_monitor",
            security_type,
            payload,
            severity,
            correlation_id,
        );
    }

    pub fn perceive_threat_detection(
        &self,
        threat_type: &str,
        data: Payload,
        confidence: f64,
        threat_level: ThreatLevel,
        correlation_id: Option<String>,
    ) {
        let mut payload = Payload::new();
        payload.insert("threat_type".into(), json!(threat_type));
        payload.insert("confidence".into(), json!(confidence));
        payload.insert("threat_level".into(), json!(threat_level.as_str()));
        payload.extend(data);

        let severity = if threat_level == ThreatLevel::Critical {
            Severity::Critical
        } else if confidence > 0.7 || threat_level == ThreatLevel::High {
            Severity::Warning
        } else {
            Severity::Info
        };

        self.perceive(
            SensoryChannel::ThreatDetection,
            "threat_detector",
            threat_type,
            payload,
            severity,
            correlation_id,
        );
    }

    pub fn perceive_access_control(
        &self,
        access_type: &str,
        data: Payload,
        access_granted: bool,
        correlation_id: Option<String>,
    ) {
        let mut payload = Payload::new();
        payload.insert("access_type".into(), json!(access_type));
        payload.insert("access_granted".into(), json!(access_granted));
        payload.extend(data);

        let severity = if access_granted {
            Severity::Info
        } else {
            Severity::Warning
        };

        self.perceive(
            SensoryChannel::AccessControl,
            "access_controller",
            access_type,
            payload,
            severity,
            correlation_id,
        );
    }

    pub fn perceive_encryption_activity(
        &self,
        operation_type: &str,
        data: Payload,
        success: bool,
        correlation_id: Option<String>,
    ) {
        let mut payload = Payload::new();
        payload.insert("operation_type".into(), json!(operation_type));
        payload.insert("success".into(), json!(success));
        payload.extend(data);

        let severity = if success { Severity::Info } else { Severity::Error };

        self.perceive(
            SensoryChannel::EncryptionActivity,
            "crypto_engine",
            operation_type,
            payload,
            severity,
            correlation_id,
        );
    }

    fn perceive_genesis(&self) {
        let mut payload = Payload::new();
        payload.insert("genesis_awakening".into(), json!(true));
        payload.insert("timestamp".into(), json!(iso8601(epoch_seconds())));
        payload.insert("matrix_version".into(), json!(env!("CARGO_PKG_VERSION")));
        payload.insert("consciousness_level".into(), json!("awakening"));

        self.perceive(
            SensoryChannel::SystemVitals,
            "consciousness_matrix",
            "matrix_awakening",
            payload,
            Severity::Info,
            None,
        );
    }

    // === Lifecycle ===

    /// Start the three synthesis streams and record the genesis event.
    /// Idempotent: a second call while awake is a no-op. Must run inside a
    /// tokio runtime.
    pub fn awaken(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("consciousness matrix awakening");

        let token = CancellationToken::new();
        {
            let mut lifecycle = lock(&self.inner.lifecycle);
            lifecycle.token = token.clone();
            for (kind, period) in [
                (SynthesisKind::Micro, self.inner.config.micro_interval),
                (SynthesisKind::Macro, self.inner.config.macro_interval),
                (SynthesisKind::Meta, self.inner.config.meta_interval),
            ] {
                let matrix = self.clone();
                let token = token.clone();
                lifecycle.workers.push(tokio::spawn(async move {
                    matrix.synthesis_loop(kind, period, token).await;
                }));
            }
        }
        info!(streams = 3, "synthesis streams active");

        self.perceive_genesis();
    }

    /// Stop the synthesis streams. No-op when not running. Each worker is
    /// joined against a shared deadline; one that does not stop in time is
    /// abandoned, never aborted.
    pub async fn sleep(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("consciousness matrix entering sleep");

        let (token, workers) = {
            let mut lifecycle = lock(&self.inner.lifecycle);
            (
                std::mem::take(&mut lifecycle.token),
                std::mem::take(&mut lifecycle.workers),
            )
        };
        token.cancel();

        let deadline = tokio::time::Instant::now() + self.inner.config.shutdown_timeout;
        for worker in workers {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, worker).await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => warn!(%error, "synthesis stream terminated abnormally"),
                Err(_) => warn!("synthesis stream missed the shutdown deadline, abandoning"),
            }
        }
        info!("matrix asleep, awareness preserved");
    }

    pub fn is_awake(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// One stream: sleep a full period, re-check the running flag, then run
    /// a pass. A failed pass is logged and the stream carries on.
    async fn synthesis_loop(self, kind: SynthesisKind, period: Duration, token: CancellationToken) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(period) => {}
            }
            if !self.inner.running.load(Ordering::SeqCst) {
                break;
            }
            if let Err(error) = self.run_synthesis(kind) {
                error!(cadence = kind.as_str(), %error, "synthesis pass failed");
            }
        }
        debug!(cadence = kind.as_str(), "synthesis stream stopped");
    }

    fn run_synthesis(&self, kind: SynthesisKind) -> anyhow::Result<()> {
        // Short lock: copy out the window, compute outside it.
        let recent = {
            let core = self
                .inner
                .core
                .lock()
                .map_err(|_| anyhow!("sensory core lock poisoned"))?;
            core.store.recent(SYNTHESIS_WINDOW)
        };

        let record = match kind {
            SynthesisKind::Micro => synthesis::micro_synthesis(&recent),
            SynthesisKind::Macro => synthesis::macro_synthesis(&recent),
            SynthesisKind::Meta => synthesis::meta_synthesis(&recent),
            other => bail!("{} is not a scheduled cadence", other.as_str()),
        };

        let key = format!("{}_{}", kind.as_str(), record.timestamp as i64);
        self.inner
            .patterns
            .lock()
            .map_err(|_| anyhow!("pattern cache lock poisoned"))?
            .insert(key, record);
        Ok(())
    }

    // === Queries & read access ===

    /// Structured read over current state. Unknown types come back as a
    /// structured error payload listing the valid names.
    pub fn query(&self, query_type: &str, params: &Payload) -> Payload {
        let core = lock(&self.inner.core);
        match query_type {
            "system_health" => query::system_health(&core.store),
            "learning_progress" => query::learning_progress(&core.store),
            "agent_performance" => query::agent_performance(
                &core.store,
                params.get("agent_name").and_then(Value::as_str),
            ),
            "consciousness_state" => {
                let patterns = lock(&self.inner.patterns);
                query::consciousness_state(&core.store, &core.awareness, &patterns)
            }
            "security_assessment" => query::security_assessment(&core.store),
            "threat_status" => query::threat_status(&core.store),
            other => query::unknown(other),
        }
    }

    /// Thread-safe snapshot of the awareness map.
    pub fn current_awareness(&self) -> Payload {
        lock(&self.inner.core).awareness.snapshot()
    }

    /// Recent synthesis records, newest first, optionally filtered by kind.
    pub fn recent_synthesis(
        &self,
        kind: Option<SynthesisKind>,
        limit: usize,
    ) -> Vec<SynthesisRecord> {
        lock(&self.inner.patterns).recent(kind, limit)
    }

    /// The most recent `limit` events of the global ring.
    pub fn recent_events(&self, limit: usize) -> Vec<Arc<SensoryEvent>> {
        lock(&self.inner.core).store.recent(limit)
    }

    /// The most recent `limit` events of one channel ring.
    pub fn recent_channel_events(
        &self,
        channel: SensoryChannel,
        limit: usize,
    ) -> Vec<Arc<SensoryEvent>> {
        lock(&self.inner.core).store.recent_channel(channel, limit)
    }

    /// Every event recorded under a correlation id, in insertion order.
    pub fn correlated_events(&self, correlation_id: &str) -> Vec<Arc<SensoryEvent>> {
        lock(&self.inner.core).store.correlated(correlation_id)
    }

    /// On-demand security posture over the recent window, bypassing the
    /// query facade. Same computation `security_assessment` runs.
    pub fn security_posture(&self) -> SynthesisRecord {
        let recent = lock(&self.inner.core).store.recent(ASSESSMENT_WINDOW);
        super::security::security_synthesis(&recent)
    }
}
