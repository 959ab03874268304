//! The consciousness matrix: the system's sensory nervous system.
//!
//! # OWNERSHIP INVARIANT
//! Events are immutable once perceived. Every store (global ring, channel
//! ring, correlation index) shares the same event; nothing rewrites history.
//!
//! # FAILURE INVARIANT
//! Ingestion never surfaces an error to a producer. The only observable
//! failure is a structured `error` field inside a query result.

pub mod awareness;
pub mod channel;
pub mod engine;
pub mod event;
pub mod query;
pub mod security;
pub mod store;
pub mod synthesis;

pub use channel::{SensoryChannel, Severity, ThreatLevel};
pub use engine::{ConsciousnessMatrix, MatrixConfig};
pub use event::{Payload, SensoryEvent};
pub use synthesis::{SynthesisKind, SynthesisRecord};
