use thiserror::Error;

/// Error taxonomy for the experiment engine.
///
/// Variants are grouped by how callers should react: client errors are
/// reportable and non-fatal, safety errors abort the run path outright,
/// runtime errors wrap infrastructure failures.
#[derive(Error, Debug)]
pub enum ChaosError {
    #[error("Unknown chaos type: {0}")]
    UnknownChaosType(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Experiment not found: {0}")]
    NotFound(String),

    #[error("Namespace '{namespace}' matches pattern '{pattern}'; require_confirmation must be set")]
    ConfirmationRequired { namespace: String, pattern: String },

    #[error("Emergency stop is active")]
    EmergencyStopActive,

    #[error("Blast radius exceeded: {affected}/{total} affected (max ratio {max_ratio})")]
    BlastRadiusExceeded {
        affected: usize,
        total: usize,
        max_ratio: f64,
    },

    #[error("Actuator failure for {chaos_type}: {source}")]
    ActuatorFailure {
        chaos_type: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Operation '{op}' timed out after {seconds}s")]
    OperationTimeout { op: String, seconds: u64 },

    #[error("Connection error: {0}")]
    Connection(#[source] anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ChaosResult<T> = Result<T, ChaosError>;
