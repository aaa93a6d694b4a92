//! Configuration reading and data directory paths.

pub mod paths;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audio::{DEFAULT_CHUNK_SECS, DEFAULT_QUEUE_CAPACITY, DEFAULT_SAMPLE_RATE};
use crate::engine::{EngineSettings, DEFAULT_ANALYSIS_WINDOW_SECS};
use crate::error::ConfigResult;
use crate::scoring::{ProfileRegistry, DEFAULT_PROFILE};

use paths::get_data_dir;

/// poise_config.json shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub sample_rate: u32,
    /// Seconds per analysis chunk.
    pub chunk_duration: f64,
    /// Seconds covered by the voiced-flag window.
    pub analysis_window: f64,
    pub profile: String,
    pub queue_capacity: usize,
    pub input_device: Option<String>,
    /// ONNX regression model. Only used with the `onnx` feature.
    pub model_path: Option<PathBuf>,
    /// Extra scoring profiles merged over the built-in ones.
    pub profiles_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_duration: DEFAULT_CHUNK_SECS,
            analysis_window: DEFAULT_ANALYSIS_WINDOW_SECS,
            profile: DEFAULT_PROFILE.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            input_device: None,
            model_path: None,
            profiles_path: None,
        }
    }
}

impl AppConfig {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            sample_rate: self.sample_rate.max(1),
            chunk_secs: self.chunk_duration,
            analysis_window_secs: self.analysis_window,
        }
    }

    /// Built-in profiles plus the configured profiles file, if any.
    pub fn load_registry(&self) -> ConfigResult<ProfileRegistry> {
        let mut registry = ProfileRegistry::builtin();
        if let Some(path) = &self.profiles_path {
            registry.merge_file(path)?;
        }
        Ok(registry)
    }
}

/// Read poise_config.json from the data directory. Missing or malformed
/// files yield defaults.
pub fn read_app_config() -> AppConfig {
    read_app_config_from(&get_config_path())
}

pub fn read_app_config_from(path: &Path) -> AppConfig {
    match read_json_file::<AppConfig>(path) {
        Some(config) => {
            info!(path = %path.display(), "Configuration loaded");
            config
        }
        None => AppConfig::default(),
    }
}

/// Path to poise_config.json.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("poise_config.json")
}

/// Generic helper: read a JSON file and deserialize it.
fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(val) => Some(val),
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        },
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to read {}: {}", path.display(), e);
            }
            None
        }
    }
}
