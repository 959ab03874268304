pub mod matrix;
pub mod vitals;

// Re-export specific items if needed for convenient access
pub use matrix::{
    ConsciousnessMatrix, MatrixConfig, Payload, SensoryChannel, Severity, ThreatLevel,
};
