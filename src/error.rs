use std::io;
use thiserror::Error;

/// Custom error type for the energy monitoring engine
#[derive(Error, Debug)]
pub enum EcoflocError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("Timing inconsistency: process time {pid_delta} exceeds system time {cpu_delta}")]
    TimingInconsistency { pid_delta: u64, cpu_delta: u64 },

    #[error("Invalid line number {index} (registry holds {len} targets)")]
    InvalidIndex { index: i64, len: usize },

    #[error("PID {0} is already being monitored")]
    DuplicateTarget(u32),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Unknown component '{0}' (must be CPU, GPU, SD or NIC)")]
    UnknownComponent(String),

    #[error("Resource acquisition failed: {0}")]
    ResourceAcquisition(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for the energy monitoring engine
pub type Result<T> = std::result::Result<T, EcoflocError>;

impl EcoflocError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        EcoflocError::Config(msg.into())
    }

    /// Create a sensor unavailable error
    pub fn sensor_unavailable<S: Into<String>>(msg: S) -> Self {
        EcoflocError::SensorUnavailable(msg.into())
    }

    /// Create an invalid target error
    pub fn invalid_target<S: Into<String>>(msg: S) -> Self {
        EcoflocError::InvalidTarget(msg.into())
    }

    /// Create a resource acquisition error
    pub fn resource_acquisition<S: Into<String>>(msg: S) -> Self {
        EcoflocError::ResourceAcquisition(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        EcoflocError::Other(msg.into())
    }

    /// Failures expected to clear by the next cycle: a sensor hiccup or a
    /// process that exited mid-interval.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EcoflocError::SensorUnavailable(_) | EcoflocError::TimingInconsistency { .. }
        )
    }
}
