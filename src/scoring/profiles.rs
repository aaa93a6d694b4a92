//! Named weight sets for the confidence scorer.
//!
//! Profiles are read from JSON of the shape
//! `{"<key>": {"name": ..., "description": ..., "weights": {"pause_freq": ..., ...}}}`.
//! Every profile must carry all five weights; anything else is a fatal
//! configuration error.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::features::Feature;

/// Profile used when nothing else is configured.
pub const DEFAULT_PROFILE: &str = "balanced";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringProfile {
    pub key: String,
    pub name: String,
    pub description: String,
    /// Signed weights in feature order. Only magnitudes affect the score.
    pub weights: [f64; 5],
}

impl ScoringProfile {
    pub fn new(key: &str, name: &str, description: &str, weights: [f64; 5]) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            weights,
        }
    }

    pub fn weight(&self, feature: Feature) -> f64 {
        self.weights[feature.index()]
    }
}

/// On-disk shape of one profile.
#[derive(Debug, Clone, Deserialize)]
struct ProfileSpec {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: String,
    weights: BTreeMap<String, f64>,
}

impl ProfileSpec {
    fn into_profile(self, key: &str) -> ConfigResult<ScoringProfile> {
        for k in self.weights.keys() {
            if Feature::from_name(k).is_none() {
                return Err(ConfigError::UnknownWeight {
                    profile: key.to_string(),
                    key: k.clone(),
                });
            }
        }
        let mut weights = [0.0; 5];
        for f in Feature::ALL {
            let w = *self
                .weights
                .get(f.name())
                .ok_or_else(|| ConfigError::MissingWeight {
                    profile: key.to_string(),
                    feature: f.name().to_string(),
                })?;
            if !w.is_finite() {
                return Err(ConfigError::NonFiniteWeight {
                    profile: key.to_string(),
                    feature: f.name().to_string(),
                });
            }
            weights[f.index()] = w;
        }
        Ok(ScoringProfile {
            key: key.to_string(),
            name: self.name.unwrap_or_else(|| key.to_string()),
            description: self.description,
            weights,
        })
    }
}

/// Key, display name and description of a registered profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileInfo {
    pub key: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, ScoringProfile>,
}

impl ProfileRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The stock profiles.
    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        for p in [
            ScoringProfile::new(
                "balanced",
                "Balanced",
                "Equally weighted across all factors",
                [-0.20, -0.15, -0.25, 0.15, -0.05],
            ),
            ScoringProfile::new(
                "delivery_fluency",
                "Delivery Fluency",
                "Smooth, confident delivery",
                [-0.25, -0.20, -0.25, 0.20, -0.10],
            ),
            ScoringProfile::new(
                "vocal_stability",
                "Vocal Stability",
                "Voice consistency and steadiness",
                [-0.05, -0.05, 0.0, 0.0, -0.90],
            ),
            ScoringProfile::new(
                "content_focus",
                "Content Focus",
                "Meaningful speech vs filler",
                [-0.10, 0.0, -0.80, 0.0, -0.10],
            ),
            ScoringProfile::new(
                "presence",
                "Presence",
                "Engagement and clarity",
                [-0.15, -0.10, -0.30, 0.10, 0.0],
            ),
            ScoringProfile::new(
                "custom",
                "Custom",
                "User-defined weights (starts from Balanced)",
                [-0.20, -0.15, -0.25, 0.15, -0.05],
            ),
        ] {
            reg.insert(p);
        }
        reg
    }

    /// Parse a JSON profile map. `source` names the input in errors.
    pub fn from_json_str(json: &str, source: &str) -> ConfigResult<Self> {
        let specs: BTreeMap<String, ProfileSpec> =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse {
                path: source.to_string(),
                reason: e.to_string(),
            })?;
        let mut reg = Self::empty();
        for (key, spec) in specs {
            reg.insert(spec.into_profile(&key)?);
        }
        Ok(reg)
    }

    /// Read a JSON profile file and add its profiles over the current ones.
    pub fn merge_file(&mut self, path: &Path) -> ConfigResult<()> {
        let contents = std::fs::read_to_string(path)?;
        let extra = Self::from_json_str(&contents, &path.display().to_string())?;
        info!(path = %path.display(), count = extra.len(), "Loaded scoring profiles");
        self.merge(extra);
        Ok(())
    }

    pub fn merge(&mut self, other: ProfileRegistry) {
        self.profiles.extend(other.profiles);
    }

    /// Add or replace a profile.
    pub fn insert(&mut self, profile: ScoringProfile) {
        self.profiles.insert(profile.key.clone(), profile);
    }

    /// Look up a profile by key. Unknown keys are fatal.
    pub fn get(&self, key: &str) -> ConfigResult<&ScoringProfile> {
        self.profiles
            .get(key)
            .ok_or_else(|| ConfigError::UnknownProfile(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.profiles.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// All profiles, sorted by key.
    pub fn list(&self) -> Vec<ProfileInfo> {
        self.profiles
            .values()
            .map(|p| ProfileInfo {
                key: p.key.clone(),
                name: p.name.clone(),
                description: p.description.clone(),
            })
            .collect()
    }
}
