//! Collaborator boundaries.
//!
//! The regression scorer, transcription service, and answer evaluator are
//! optional. Their failures are reported as absent fields and never affect
//! the heuristic confidence.

pub mod onnx;

use serde::{Deserialize, Serialize};

pub use onnx::OnnxRegressionScorer;

/// Lower and upper ends of the regression model's rating scale.
pub const REGRESSION_MIN: f64 = 1.0;
pub const REGRESSION_MAX: f64 = 5.0;

/// Pretrained regression model over the clipped feature vector.
pub trait RegressionScorer: Send {
    /// Raw model prediction for features in fixed order
    /// (`pause_freq`, `avg_pause`, `silence_ratio`, `speech_rate`, `pitch_std`).
    fn predict(&mut self, features: &[f64; 5]) -> anyhow::Result<f64>;

    /// Whether a model is actually loaded.
    fn is_available(&self) -> bool {
        true
    }
}

/// Map a 1-5 model prediction onto the 0-100 confidence scale. Returns
/// `None` for non-finite predictions.
pub fn remap_prediction(pred: f64) -> Option<f64> {
    if !pred.is_finite() {
        return None;
    }
    let clamped = pred.clamp(REGRESSION_MIN, REGRESSION_MAX);
    Some((clamped - REGRESSION_MIN) / (REGRESSION_MAX - REGRESSION_MIN) * 100.0)
}

/// Speech-to-text output for one answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub confidence: f64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Remote speech-to-text service.
pub trait Transcriber {
    fn is_available(&self) -> bool {
        true
    }

    /// Transcribe mono audio at `sample_rate`.
    fn transcribe(&self, audio: &[f32], sample_rate: u32) -> anyhow::Result<Transcript>;
}

/// Judgement of an answer's content against a reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Remote answer-evaluation service.
pub trait AnswerEvaluator {
    fn is_available(&self) -> bool {
        true
    }

    fn evaluate(
        &self,
        question: &str,
        answer: &str,
        reference: Option<&str>,
    ) -> anyhow::Result<Evaluation>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_prediction() {
        assert_eq!(remap_prediction(1.0), Some(0.0));
        assert_eq!(remap_prediction(3.0), Some(50.0));
        assert_eq!(remap_prediction(5.0), Some(100.0));
        assert_eq!(remap_prediction(-2.0), Some(0.0));
        assert_eq!(remap_prediction(9.0), Some(100.0));
        assert_eq!(remap_prediction(f64::NAN), None);
    }
}
