//! Error types for the confidence pipeline.
//!
//! Only `ConfigError` ever crosses the public scoring boundary. Signal-level
//! failures are downgraded to the "no signal" result by the engine.

use thiserror::Error;

/// Malformed or unknown profile configuration. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown scoring profile: {0}")]
    UnknownProfile(String),

    #[error("Profile '{profile}' is missing weight '{feature}'")]
    MissingWeight { profile: String, feature: String },

    #[error("Profile '{profile}' has unknown weight key '{key}'")]
    UnknownWeight { profile: String, key: String },

    #[error("Profile '{profile}' weight '{feature}' is not finite")]
    NonFiniteWeight { profile: String, feature: String },

    #[error("Profile file parse error: {path} - {reason}")]
    Parse { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Internal failures on the scoring path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("Empty audio input")]
    EmptyInput,

    #[error("Not enough accumulated signal: {0}")]
    NotReady(String),

    #[error("Feature estimation failed: {0}")]
    Estimation(String),
}

/// Audio device errors raised while opening the microphone.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    #[error("No default input device available")]
    NoDefaultDevice,

    #[error("Audio stream error: {0}")]
    Stream(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
