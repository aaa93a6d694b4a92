//! The five-dimensional speaking feature vector.
//!
//! Dimensions are always handled in the fixed order `pause_freq`,
//! `avg_pause`, `silence_ratio`, `speech_rate`, `pitch_std`; the regression
//! collaborator depends on that order.

pub mod aggregator;
pub mod readiness;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use aggregator::{ExtractionSettings, RollingAggregator, SPEECH_RATE_DIVISOR};
pub use readiness::{ReadinessPolicy, ReadinessStatus, VoicedOccupancy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    PauseFreq,
    AvgPause,
    SilenceRatio,
    SpeechRate,
    PitchStd,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::PauseFreq,
        Feature::AvgPause,
        Feature::SilenceRatio,
        Feature::SpeechRate,
        Feature::PitchStd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::PauseFreq => "pause_freq",
            Self::AvgPause => "avg_pause",
            Self::SilenceRatio => "silence_ratio",
            Self::SpeechRate => "speech_rate",
            Self::PitchStd => "pitch_std",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Declared `[min, max]` range used for clipping and normalisation.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            Self::PauseFreq => (0.0, 150.0),
            Self::AvgPause => (0.0, 2.0),
            Self::SilenceRatio => (0.0, 0.95),
            Self::SpeechRate => (0.0, 35.0),
            Self::PitchStd => (0.0, 25.0),
        }
    }

    /// Higher values of a penalty dimension lower the score. Only
    /// `speech_rate` is rewarded as it grows.
    pub fn is_penalty(self) -> bool {
        !matches!(self, Self::SpeechRate)
    }

    pub fn clip(self, value: f64) -> f64 {
        let (lo, hi) = self.bounds();
        if value.is_nan() {
            return lo;
        }
        value.clamp(lo, hi)
    }

    /// Position of `value` inside the bounds, clamped to [0, 1].
    pub fn normalize(self, value: f64) -> f64 {
        let (lo, hi) = self.bounds();
        ((self.clip(value) - lo) / (hi - lo)).clamp(0.0, 1.0)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per feature dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Features {
    /// Recorded pauses per minute of analysis window.
    pub pause_freq: f64,
    /// Mean pause length in seconds.
    pub avg_pause: f64,
    /// Fraction of the voiced window classified as silence.
    pub silence_ratio: f64,
    /// Voiced/silent alternation cadence.
    pub speech_rate: f64,
    /// Population standard deviation of recent pitch samples, in Hz.
    pub pitch_std: f64,
}

impl Features {
    pub fn from_array(values: [f64; 5]) -> Self {
        Self {
            pause_freq: values[0],
            avg_pause: values[1],
            silence_ratio: values[2],
            speech_rate: values[3],
            pitch_std: values[4],
        }
    }

    pub fn to_array(&self) -> [f64; 5] {
        [
            self.pause_freq,
            self.avg_pause,
            self.silence_ratio,
            self.speech_rate,
            self.pitch_std,
        ]
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.to_array()[feature.index()]
    }

    /// Every dimension clamped into its declared bounds.
    pub fn clipped(&self) -> Self {
        let raw = self.to_array();
        let mut out = [0.0; 5];
        for f in Feature::ALL {
            out[f.index()] = f.clip(raw[f.index()]);
        }
        Self::from_array(out)
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Raw and clipped vectors produced together by one extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub raw: Features,
    pub clipped: Features,
}

impl FeatureSnapshot {
    pub fn from_raw(raw: Features) -> Self {
        Self {
            clipped: raw.clipped(),
            raw,
        }
    }
}
