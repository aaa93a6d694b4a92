//! Gate deciding when extracted features are trustworthy enough to score.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{FeatureSnapshot, RollingAggregator};
use crate::error::SignalError;

/// How full the voiced-flag window must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoicedOccupancy {
    AtLeast(usize),
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadinessPolicy {
    pub voiced_occupancy: VoicedOccupancy,
    pub min_pauses: usize,
    pub min_pitch_samples: usize,
    /// Reject windows that are mostly silence.
    pub max_silence_ratio: Option<f64>,
    /// Reject slow cadence (`speech_rate` below the first value) while the
    /// pitch history holds fewer samples than the second value.
    pub slow_speech_gate: Option<(f64, usize)>,
}

impl ReadinessPolicy {
    /// Lenient gate for one pre-segmented answer.
    pub fn batch() -> Self {
        Self {
            voiced_occupancy: VoicedOccupancy::AtLeast(3),
            min_pauses: 0,
            min_pitch_samples: 0,
            max_silence_ratio: None,
            slow_speech_gate: None,
        }
    }

    /// Strict gate for continuous re-scoring of a live feed.
    pub fn streaming() -> Self {
        Self {
            voiced_occupancy: VoicedOccupancy::Full,
            min_pauses: 2,
            min_pitch_samples: 15,
            max_silence_ratio: Some(0.8),
            slow_speech_gate: Some((1.0, 20)),
        }
    }

    fn voiced_target(&self, window_capacity: usize) -> usize {
        match self.voiced_occupancy {
            VoicedOccupancy::AtLeast(n) => n.min(window_capacity),
            VoicedOccupancy::Full => window_capacity,
        }
    }

    /// Occupancy of each history against this policy's targets.
    pub fn status(&self, agg: &RollingAggregator, calibrated: bool) -> ReadinessStatus {
        let window = agg.voiced_window();
        ReadinessStatus {
            calibrated,
            voiced_seen: agg.voiced_seen(),
            voiced: window.len(),
            voiced_target: self.voiced_target(window.capacity()),
            pauses: agg.pauses().len(),
            pauses_target: self.min_pauses,
            pitch: agg.pitches().len(),
            pitch_target: self.min_pitch_samples,
        }
    }

    /// Check the occupancy conditions, then the content conditions against
    /// an extracted snapshot.
    pub fn check(
        &self,
        agg: &RollingAggregator,
        calibrated: bool,
        snapshot: &FeatureSnapshot,
    ) -> Result<(), SignalError> {
        let status = self.status(agg, calibrated);
        if !status.occupancy_met() {
            return Err(SignalError::NotReady(status.to_string()));
        }

        let feats = &snapshot.clipped;
        if let Some(max) = self.max_silence_ratio {
            if feats.silence_ratio > max {
                return Err(SignalError::NotReady(format!(
                    "silence ratio {:.2} above {max:.2}",
                    feats.silence_ratio
                )));
            }
        }
        if let Some((min_rate, min_pitch)) = self.slow_speech_gate {
            if feats.speech_rate < min_rate && status.pitch < min_pitch {
                return Err(SignalError::NotReady(format!(
                    "speech rate {:.2} too slow with {} pitch samples",
                    feats.speech_rate, status.pitch
                )));
            }
        }
        Ok(())
    }
}

/// Warm-up progress, rendered as `Voice[3/10] Pauses[0/2] Pitch[4/15]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadinessStatus {
    pub calibrated: bool,
    pub voiced_seen: bool,
    pub voiced: usize,
    pub voiced_target: usize,
    pub pauses: usize,
    pub pauses_target: usize,
    pub pitch: usize,
    pub pitch_target: usize,
}

impl ReadinessStatus {
    pub fn occupancy_met(&self) -> bool {
        self.calibrated
            && self.voiced_seen
            && self.voiced >= self.voiced_target
            && self.pauses >= self.pauses_target
            && self.pitch >= self.pitch_target
    }
}

impl fmt::Display for ReadinessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.calibrated {
            return f.write_str("Calibrating");
        }
        let mut parts = Vec::new();
        if self.voiced < self.voiced_target {
            parts.push(format!("Voice[{}/{}]", self.voiced, self.voiced_target));
        }
        if self.pauses < self.pauses_target {
            parts.push(format!("Pauses[{}/{}]", self.pauses, self.pauses_target));
        }
        if self.pitch < self.pitch_target {
            parts.push(format!("Pitch[{}/{}]", self.pitch, self.pitch_target));
        }
        if !self.voiced_seen {
            parts.push("NoSpeech".to_string());
        }
        if parts.is_empty() {
            f.write_str("Ready")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{ExtractionSettings, Features};

    fn extract(agg: &RollingAggregator) -> FeatureSnapshot {
        agg.extract(&ExtractionSettings {
            analysis_window_secs: 5.0,
            neutral_silence_ratio: 0.0,
        })
        .unwrap()
    }

    #[test]
    fn test_batch_needs_calibration_and_speech() {
        let policy = ReadinessPolicy::batch();
        let mut agg = RollingAggregator::new(10);
        for _ in 0..5 {
            agg.push_voiced(false);
        }
        let snap = extract(&agg);
        assert!(policy.check(&agg, true, &snap).is_err());

        agg.push_voiced(true);
        let snap = extract(&agg);
        assert!(policy.check(&agg, false, &snap).is_err());
        assert!(policy.check(&agg, true, &snap).is_ok());
    }

    #[test]
    fn test_batch_min_occupancy() {
        let policy = ReadinessPolicy::batch();
        let mut agg = RollingAggregator::new(10);
        agg.push_voiced(true);
        agg.push_voiced(true);
        assert!(policy.check(&agg, true, &extract(&agg)).is_err());
        agg.push_voiced(false);
        assert!(policy.check(&agg, true, &extract(&agg)).is_ok());
    }

    #[test]
    fn test_streaming_occupancy_and_content_gates() {
        let policy = ReadinessPolicy::streaming();
        let mut agg = RollingAggregator::new(10);
        for i in 0..10 {
            agg.push_voiced(i % 2 == 0);
        }
        agg.push_pause(0.5);
        agg.push_pause(0.5);
        for _ in 0..14 {
            agg.push_pitch(200.0);
        }
        let err = policy.check(&agg, true, &extract(&agg)).unwrap_err();
        assert_eq!(err, SignalError::NotReady("Pitch[14/15]".into()));

        agg.push_pitch(210.0);
        assert!(policy.check(&agg, true, &extract(&agg)).is_ok());
    }

    #[test]
    fn test_streaming_rejects_mostly_silent_window() {
        let policy = ReadinessPolicy::streaming();
        let mut agg = RollingAggregator::new(10);
        let snap = FeatureSnapshot::from_raw(Features {
            silence_ratio: 0.9,
            speech_rate: 10.0,
            ..Features::default()
        });
        agg.push_voiced(true);
        for _ in 0..9 {
            agg.push_voiced(false);
        }
        agg.push_pause(1.0);
        agg.push_pause(1.0);
        for _ in 0..20 {
            agg.push_pitch(150.0);
        }
        assert!(matches!(
            policy.check(&agg, true, &snap),
            Err(SignalError::NotReady(_))
        ));
    }

    #[test]
    fn test_streaming_slow_speech_gate() {
        let policy = ReadinessPolicy::streaming();
        let mut agg = RollingAggregator::new(10);
        for _ in 0..10 {
            agg.push_voiced(true);
        }
        agg.push_pause(1.0);
        agg.push_pause(1.0);
        for _ in 0..16 {
            agg.push_pitch(150.0);
        }
        // No flips -> speech_rate 0 with only 16 pitch samples.
        assert!(policy.check(&agg, true, &extract(&agg)).is_err());
        for _ in 0..4 {
            agg.push_pitch(150.0);
        }
        assert!(policy.check(&agg, true, &extract(&agg)).is_ok());
    }

    #[test]
    fn test_status_display() {
        let policy = ReadinessPolicy::streaming();
        let mut agg = RollingAggregator::new(10);
        assert_eq!(policy.status(&agg, false).to_string(), "Calibrating");
        for _ in 0..3 {
            agg.push_voiced(true);
        }
        for _ in 0..4 {
            agg.push_pitch(120.0);
        }
        assert_eq!(
            policy.status(&agg, true).to_string(),
            "Voice[3/10] Pauses[0/2] Pitch[4/15]"
        );
    }
}
