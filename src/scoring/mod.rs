//! Profile-weighted confidence scoring.
//!
//! Each clipped feature is normalised into [0, 1], penalty dimensions are
//! inverted, and the terms are averaged with the profile's absolute weights
//! into a 0-100 score.

pub mod profiles;

use std::fmt;

use serde::Serialize;

use crate::features::{Feature, Features};

pub use profiles::{ProfileInfo, ProfileRegistry, ScoringProfile, DEFAULT_PROFILE};

/// Weight of the newest score in streaming smoothing.
pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.4;

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceScorer {
    weights: [f64; 5],
}

impl ConfidenceScorer {
    pub fn new(profile: &ScoringProfile) -> Self {
        Self {
            weights: profile.weights,
        }
    }

    /// Score a feature vector. Always in [0, 100]; exactly 0 when every
    /// weight is zero.
    pub fn score(&self, features: &Features) -> f64 {
        let values = features.to_array();
        let mut weighted = 0.0;
        let mut total = 0.0;
        for f in Feature::ALL {
            let norm = f.normalize(values[f.index()]);
            let term = if f.is_penalty() { 1.0 - norm } else { norm };
            let w = self.weights[f.index()].abs();
            weighted += term * w;
            total += w;
        }
        if total <= 0.0 {
            return 0.0;
        }
        let confidence = weighted / total * 100.0;
        if confidence.is_nan() {
            return 0.0;
        }
        confidence.clamp(0.0, 100.0)
    }
}

/// Exponential smoothing across successive scores. The first score seeds
/// the carry unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Smoother {
    alpha: f64,
    prev: Option<f64>,
}

impl Smoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            prev: None,
        }
    }

    pub fn apply(&mut self, raw: f64) -> f64 {
        let smoothed = match self.prev {
            None => raw,
            Some(prev) => (1.0 - self.alpha) * prev + self.alpha * raw,
        }
        .clamp(0.0, 100.0);
        self.prev = Some(smoothed);
        smoothed
    }

    pub fn previous(&self) -> Option<f64> {
        self.prev
    }
}

/// Coarse label for a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Excellent,
    VeryGood,
    Good,
    Fair,
    NeedsWork,
}

impl Rating {
    /// Scale used by the live display.
    pub fn live(score: f64) -> Self {
        if score >= 70.0 {
            Self::Excellent
        } else if score >= 50.0 {
            Self::Good
        } else if score >= 30.0 {
            Self::Fair
        } else {
            Self::NeedsWork
        }
    }

    /// Scale used for finished answers and session summaries.
    pub fn answer(score: f64) -> Self {
        if score >= 85.0 {
            Self::Excellent
        } else if score >= 70.0 {
            Self::VeryGood
        } else if score >= 55.0 {
            Self::Good
        } else {
            Self::Fair
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excellent => write!(f, "EXCELLENT"),
            Self::VeryGood => write!(f, "VERY GOOD"),
            Self::Good => write!(f, "GOOD"),
            Self::Fair => write!(f, "FAIR"),
            Self::NeedsWork => write!(f, "NEEDS WORK"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer(weights: [f64; 5]) -> ConfidenceScorer {
        ConfidenceScorer::new(&ScoringProfile::new("t", "T", "", weights))
    }

    #[test]
    fn test_perfect_and_worst_vectors() {
        let s = scorer([-0.2, -0.15, -0.25, 0.15, -0.05]);
        let best = Features::from_array([0.0, 0.0, 0.0, 35.0, 0.0]);
        let worst = Features::from_array([150.0, 2.0, 0.95, 0.0, 25.0]);
        assert!((s.score(&best) - 100.0).abs() < 1e-9);
        assert!(s.score(&worst).abs() < 1e-9);
    }

    #[test]
    fn test_known_value() {
        // Normalised terms: 0.76, 0.75, 1 - 0.5/0.95, 0.8, 1.0
        let s = scorer([-0.2, -0.15, -0.25, 0.15, -0.05]);
        let f = Features::from_array([36.0, 0.5, 0.5, 28.0, 0.0]);
        let expected = (0.76 * 0.2
            + 0.75 * 0.15
            + (1.0 - 0.5 / 0.95) * 0.25
            + 0.8 * 0.15
            + 1.0 * 0.05)
            / 0.8
            * 100.0;
        assert!((s.score(&f) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_zero_weights_score_zero() {
        let s = scorer([0.0; 5]);
        assert_eq!(s.score(&Features::from_array([0.0, 0.0, 0.0, 35.0, 0.0])), 0.0);
    }

    #[test]
    fn test_sign_of_weight_is_ignored() {
        let f = Features::from_array([20.0, 0.7, 0.3, 12.0, 9.0]);
        let a = scorer([-0.2, -0.15, -0.25, 0.15, -0.05]).score(&f);
        let b = scorer([0.2, 0.15, 0.25, -0.15, 0.05]).score(&f);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_scale_invariance() {
        let f = Features::from_array([20.0, 0.7, 0.3, 12.0, 9.0]);
        let base = [-0.2, -0.15, -0.25, 0.15, -0.05];
        let a = scorer(base).score(&f);
        for k in [0.01, 3.0, 1000.0] {
            let scaled = base.map(|w| w * k);
            let b = scorer(scaled).score(&f);
            assert!((a - b).abs() < 1e-9, "k={k}: {a} vs {b}");
        }
    }

    #[test]
    fn test_out_of_range_inputs_stay_in_range() {
        let s = scorer([-0.2, -0.15, -0.25, 0.15, -0.05]);
        for f in [
            Features::from_array([-50.0, -1.0, -3.0, -9.0, -1.0]),
            Features::from_array([1e9, 1e9, 1e9, 1e9, 1e9]),
            Features::from_array([f64::NAN, f64::INFINITY, 0.2, f64::NEG_INFINITY, 3.0]),
        ] {
            let c = s.score(&f);
            assert!((0.0..=100.0).contains(&c), "{c}");
        }
    }

    #[test]
    fn test_smoother() {
        let mut sm = Smoother::new(DEFAULT_SMOOTHING_ALPHA);
        assert_eq!(sm.previous(), None);
        assert_eq!(sm.apply(50.0), 50.0);
        assert!((sm.apply(100.0) - 70.0).abs() < 1e-12);
        assert!((sm.apply(0.0) - 42.0).abs() < 1e-12);
    }

    #[test]
    fn test_ratings() {
        assert_eq!(Rating::live(72.0), Rating::Excellent);
        assert_eq!(Rating::live(50.0), Rating::Good);
        assert_eq!(Rating::live(31.0), Rating::Fair);
        assert_eq!(Rating::live(5.0), Rating::NeedsWork);
        assert_eq!(Rating::answer(90.0), Rating::Excellent);
        assert_eq!(Rating::answer(72.0), Rating::VeryGood);
        assert_eq!(Rating::answer(60.0), Rating::Good);
        assert_eq!(Rating::answer(10.0), Rating::Fair);
        assert_eq!(Rating::VeryGood.to_string(), "VERY GOOD");
    }
}
