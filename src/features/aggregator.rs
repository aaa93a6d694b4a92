//! Bounded rolling histories and feature extraction over them.

use serde::{Deserialize, Serialize};

use super::{FeatureSnapshot, Features};
use crate::error::SignalError;
use crate::history::RingHistory;

/// Empirical scaling applied to the voiced/silent alternation count.
pub const SPEECH_RATE_DIVISOR: f64 = 3.0;

/// Recent pitch samples kept for `pitch_std`.
pub const PITCH_HISTORY_CAPACITY: usize = 30;

/// Recent pauses kept for `pause_freq` and `avg_pause`.
pub const PAUSE_HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSettings {
    /// Analysis window `W` in seconds.
    pub analysis_window_secs: f64,
    /// `silence_ratio` reported while the voiced window is empty.
    pub neutral_silence_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct RollingAggregator {
    voiced: RingHistory<bool>,
    pitches: RingHistory<f64>,
    pauses: RingHistory<f64>,
    voiced_seen: bool,
}

impl RollingAggregator {
    pub fn new(window_chunks: usize) -> Self {
        Self::with_capacities(window_chunks, PITCH_HISTORY_CAPACITY, PAUSE_HISTORY_CAPACITY)
    }

    pub fn with_capacities(window_chunks: usize, pitch_capacity: usize, pause_capacity: usize) -> Self {
        Self {
            voiced: RingHistory::new(window_chunks),
            pitches: RingHistory::new(pitch_capacity),
            pauses: RingHistory::new(pause_capacity),
            voiced_seen: false,
        }
    }

    pub fn push_voiced(&mut self, speaking: bool) {
        self.voiced_seen |= speaking;
        self.voiced.push(speaking);
    }

    pub fn push_pitch(&mut self, hz: f64) {
        self.pitches.push(hz);
    }

    pub fn push_pause(&mut self, secs: f64) {
        self.pauses.push(secs);
    }

    pub fn voiced_window(&self) -> &RingHistory<bool> {
        &self.voiced
    }

    pub fn pitches(&self) -> &RingHistory<f64> {
        &self.pitches
    }

    pub fn pauses(&self) -> &RingHistory<f64> {
        &self.pauses
    }

    /// Whether any chunk this session was classified as speech.
    pub fn voiced_seen(&self) -> bool {
        self.voiced_seen
    }

    pub fn voiced_count(&self) -> usize {
        self.voiced.iter().filter(|&&v| v).count()
    }

    /// Adjacent voiced/silent flips inside the window.
    pub fn transitions(&self) -> usize {
        self.voiced
            .iter()
            .zip(self.voiced.iter().skip(1))
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Derive the raw and clipped feature vectors from the current
    /// histories.
    pub fn extract(&self, settings: &ExtractionSettings) -> Result<FeatureSnapshot, SignalError> {
        let window = settings.analysis_window_secs;
        if !(window.is_finite() && window > 0.0) {
            return Err(SignalError::Estimation(format!(
                "invalid analysis window {window}"
            )));
        }

        let pause_freq = if self.pauses.is_empty() {
            0.0
        } else {
            self.pauses.len() as f64 / window * 60.0
        };

        let avg_pause = self.pauses.mean().unwrap_or(0.0);

        let silence_ratio = if self.voiced.is_empty() {
            settings.neutral_silence_ratio
        } else {
            1.0 - self.voiced_count() as f64 / self.voiced.len() as f64
        };

        let speech_rate = if self.voiced.len() > 1 {
            self.transitions() as f64 * 60.0 / window / SPEECH_RATE_DIVISOR
        } else {
            0.0
        };

        let pitch_std = if self.pitches.len() >= 2 {
            self.pitches.std_dev().unwrap_or(0.0)
        } else {
            0.0
        };

        let raw = Features {
            pause_freq,
            avg_pause,
            silence_ratio,
            speech_rate,
            pitch_std,
        };
        if !raw.is_finite() {
            return Err(SignalError::Estimation(format!(
                "non-finite feature vector {raw:?}"
            )));
        }
        Ok(FeatureSnapshot::from_raw(raw))
    }
}
