//! Poise: heuristic speaking-confidence scoring.
//!
//! Turns mono audio into five acoustic-prosodic features (pause frequency,
//! average pause length, silence ratio, speech-rate proxy, pitch
//! variability) and a profile-weighted 0-100 confidence score. The same
//! engine scores finished recordings (batch) and a live microphone feed
//! (streaming); the two modes differ only in their [`engine::ModePolicy`].

pub mod audio;
pub mod collab;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod features;
pub mod history;
pub mod logging;
pub mod record;
pub mod scoring;
pub mod vad;

pub use engine::{ConfidenceEngine, ConfidenceResult, EngineSettings, Mode, ModePolicy};
pub use error::{CaptureError, ConfigError, SignalError};
pub use features::{Feature, Features};
pub use scoring::{ProfileRegistry, Rating, ScoringProfile};
