//! Energy-based voice activity detection.
//!
//! Each chunk's energy is compared to a noise floor calibrated once per
//! session from the first few chunks. Chunks seen before calibration
//! completes produce no speech/silence decision.

pub mod energy;
pub mod pause;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use energy::energy_db;
pub use pause::PauseTracker;

/// Statistic used to freeze the noise floor from the calibration buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseStatistic {
    /// Most conservative baseline, suited to one short pre-segmented answer.
    Min,
    /// Outlier-resistant baseline for indefinitely running streams.
    Median,
}

impl NoiseStatistic {
    fn apply(self, values: &[f64]) -> f64 {
        match self {
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
        }
    }
}

/// Collects the first `capacity` energies and freezes the floor once.
#[derive(Debug, Clone)]
pub struct NoiseFloorCalibrator {
    buffer: Vec<f64>,
    capacity: usize,
    statistic: NoiseStatistic,
    floor: Option<f64>,
}

impl NoiseFloorCalibrator {
    pub fn new(capacity: usize, statistic: NoiseStatistic) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            statistic,
            floor: None,
        }
    }

    /// Feed one chunk energy. Returns `true` if this energy completed
    /// calibration. Energies after calibration are ignored.
    pub fn observe(&mut self, energy: f64) -> bool {
        if self.floor.is_some() {
            return false;
        }
        self.buffer.push(energy);
        if self.buffer.len() >= self.capacity {
            let floor = self.statistic.apply(&self.buffer);
            debug!(floor, statistic = ?self.statistic, "Noise floor calibrated");
            self.floor = Some(floor);
            return true;
        }
        false
    }

    pub fn floor(&self) -> Option<f64> {
        self.floor
    }

    pub fn is_calibrated(&self) -> bool {
        self.floor.is_some()
    }

    /// Energies collected so far (at most `capacity`).
    pub fn collected(&self) -> usize {
        self.buffer.len()
    }
}

/// Outcome of running VAD on one chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VadDecision {
    /// Absorbed into noise-floor calibration, no decision emitted.
    Calibrating { energy: f64 },
    /// Classified against the frozen floor. `loud` is the stricter gate
    /// used for pitch tracking and implies `speaking`.
    Classified {
        energy: f64,
        speaking: bool,
        loud: bool,
    },
}

/// Margins and calibration behaviour for the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VadSettings {
    pub calibration_chunks: usize,
    pub noise_statistic: NoiseStatistic,
    pub vad_margin_db: f64,
    pub loud_margin_db: f64,
    /// Whether the chunk that completes calibration is also classified.
    pub classify_calibration_chunk: bool,
}

#[derive(Debug, Clone)]
pub struct VoiceActivityDetector {
    settings: VadSettings,
    calibrator: NoiseFloorCalibrator,
}

impl VoiceActivityDetector {
    pub fn new(settings: VadSettings) -> Self {
        Self {
            calibrator: NoiseFloorCalibrator::new(
                settings.calibration_chunks,
                settings.noise_statistic,
            ),
            settings,
        }
    }

    /// Classify one chunk.
    pub fn process(&mut self, chunk: &[f32]) -> VadDecision {
        let energy = energy_db(chunk);

        let floor = match self.calibrator.floor() {
            Some(floor) => floor,
            None => {
                let completed = self.calibrator.observe(energy);
                match self.calibrator.floor() {
                    Some(floor) if completed && self.settings.classify_calibration_chunk => floor,
                    _ => return VadDecision::Calibrating { energy },
                }
            }
        };

        let speaking = energy > floor + self.settings.vad_margin_db;
        let loud = speaking && energy > floor + self.settings.loud_margin_db;
        VadDecision::Classified {
            energy,
            speaking,
            loud,
        }
    }

    pub fn noise_floor(&self) -> Option<f64> {
        self.calibrator.floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(stat: NoiseStatistic, classify: bool) -> VadSettings {
        VadSettings {
            calibration_chunks: 3,
            noise_statistic: stat,
            vad_margin_db: 2.0,
            loud_margin_db: 5.0,
            classify_calibration_chunk: classify,
        }
    }

    fn tone(amplitude: f32) -> Vec<f32> {
        (0..800)
            .map(|i| amplitude * (i as f32 * 0.1).sin())
            .collect()
    }

    #[test]
    fn test_noise_statistics() {
        assert_eq!(NoiseStatistic::Min.apply(&[3.0, -1.0, 2.0]), -1.0);
        assert_eq!(NoiseStatistic::Median.apply(&[3.0, -1.0, 2.0]), 2.0);
        assert_eq!(NoiseStatistic::Median.apply(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_calibrator_freezes_once() {
        let mut cal = NoiseFloorCalibrator::new(2, NoiseStatistic::Min);
        assert!(!cal.observe(-40.0));
        assert!(!cal.is_calibrated());
        assert!(cal.observe(-50.0));
        assert_eq!(cal.floor(), Some(-50.0));

        // Later energies never move the floor.
        assert!(!cal.observe(-90.0));
        assert!(!cal.observe(10.0));
        assert_eq!(cal.floor(), Some(-50.0));
        assert_eq!(cal.collected(), 2);
    }

    #[test]
    fn test_no_decision_before_calibration() {
        let mut vad = VoiceActivityDetector::new(settings(NoiseStatistic::Min, false));
        let quiet = vec![0.0f32; 800];
        assert!(matches!(vad.process(&quiet), VadDecision::Calibrating { .. }));
        assert!(matches!(vad.process(&quiet), VadDecision::Calibrating { .. }));
        // Completing chunk is absorbed when the policy says so.
        assert!(matches!(vad.process(&quiet), VadDecision::Calibrating { .. }));
        assert!(vad.noise_floor().is_some());
        assert!(matches!(
            vad.process(&tone(0.5)),
            VadDecision::Classified { speaking: true, loud: true, .. }
        ));
    }

    #[test]
    fn test_calibration_chunk_classified_when_enabled() {
        let mut vad = VoiceActivityDetector::new(settings(NoiseStatistic::Min, true));
        let quiet = vec![0.0f32; 800];
        vad.process(&quiet);
        vad.process(&quiet);
        assert!(matches!(
            vad.process(&quiet),
            VadDecision::Classified { speaking: false, loud: false, .. }
        ));
    }

    #[test]
    fn test_loud_gate_is_stricter() {
        let mut vad = VoiceActivityDetector::new(VadSettings {
            vad_margin_db: 2.0,
            loud_margin_db: 40.0,
            ..settings(NoiseStatistic::Min, false)
        });
        let floor_chunk = tone(0.01);
        for _ in 0..3 {
            vad.process(&floor_chunk);
        }
        // ~14 dB above the floor: speaking but not loud.
        match vad.process(&tone(0.05)) {
            VadDecision::Classified { speaking, loud, .. } => {
                assert!(speaking);
                assert!(!loud);
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }
}
