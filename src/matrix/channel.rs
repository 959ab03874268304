use serde::{Deserialize, Serialize};

/// The channels through which the matrix perceives the rest of the system.
/// Closed set: every event belongs to exactly one channel, and each channel
/// owns an independent bounded buffer in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensoryChannel {
    SystemVitals,
    UserInteraction,
    AgentActivity,
    PerformanceMetrics,
    ErrorStates,
    LearningEvents,
    FusionActivity,
    EthicalDecisions,
    SecurityEvents,
    ThreatDetection,
    AccessControl,
    EncryptionActivity,
}

impl SensoryChannel {
    pub const ALL: [SensoryChannel; 12] = [
        SensoryChannel::SystemVitals,
        SensoryChannel::UserInteraction,
        SensoryChannel::AgentActivity,
        SensoryChannel::PerformanceMetrics,
        SensoryChannel::ErrorStates,
        SensoryChannel::LearningEvents,
        SensoryChannel::FusionActivity,
        SensoryChannel::EthicalDecisions,
        SensoryChannel::SecurityEvents,
        SensoryChannel::ThreatDetection,
        SensoryChannel::AccessControl,
        SensoryChannel::EncryptionActivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensoryChannel::SystemVitals => "system_vitals",
            SensoryChannel::UserInteraction => "user_interaction",
            SensoryChannel::AgentActivity => "agent_activity",
            SensoryChannel::PerformanceMetrics => "performance_metrics",
            SensoryChannel::ErrorStates => "error_states",
            SensoryChannel::LearningEvents => "learning_events",
            SensoryChannel::FusionActivity => "fusion_activity",
            SensoryChannel::EthicalDecisions => "ethical_decisions",
            SensoryChannel::SecurityEvents => "security_events",
            SensoryChannel::ThreatDetection => "threat_detection",
            SensoryChannel::AccessControl => "access_control",
            SensoryChannel::EncryptionActivity => "encryption_activity",
        }
    }
}

/// Event severity, totally ordered so "error or worse" is a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

/// Assessed threat level carried by security and threat-detection events.
/// The string form lives in event payloads; parsing is permissive because
/// payloads are producer-supplied and never validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
            ThreatLevel::Critical => "critical",
        }
    }

    /// Unknown labels rank as `Low`.
    pub fn parse(label: &str) -> ThreatLevel {
        match label {
            "medium" => ThreatLevel::Medium,
            "high" => ThreatLevel::High,
            "critical" => ThreatLevel::Critical,
            _ => ThreatLevel::Low,
        }
    }
}
