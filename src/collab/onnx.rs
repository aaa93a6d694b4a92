//! Regression scorer backed by an ONNX model via ONNX Runtime (ort crate).
//!
//! Expects a model exported with a single `float_input` tensor of shape
//! [1, 5] and a scalar prediction on the 1-5 scale as its first output.
//!
//! When the `onnx` feature is disabled, provides a stub that never loads,
//! so the engine reports no secondary score.

use std::path::Path;

use tracing::warn;
#[cfg(feature = "onnx")]
use tracing::info;

use super::RegressionScorer;

// -----------------------------------------------------------------------
// onnx: real ONNX implementation
// -----------------------------------------------------------------------
#[cfg(feature = "onnx")]
mod inner {
    use super::*;
    use ort::session::Session;

    pub struct OnnxRegressionScorer {
        session: Option<Session>,
    }

    impl OnnxRegressionScorer {
        /// Load the model at `path`. A missing or unloadable model yields
        /// an unavailable scorer rather than an error.
        pub fn load(path: &Path) -> Self {
            if !path.exists() {
                warn!(path = %path.display(), "Regression model not found");
                return Self { session: None };
            }

            match Session::builder()
                .and_then(|b| b.with_intra_threads(1))
                .and_then(|b| b.with_inter_threads(1))
                .and_then(|b| b.commit_from_file(path))
            {
                Ok(session) => {
                    info!(path = %path.display(), "Regression model loaded");
                    Self {
                        session: Some(session),
                    }
                }
                Err(e) => {
                    warn!("Failed to load regression model: {}", e);
                    Self { session: None }
                }
            }
        }
    }

    impl RegressionScorer for OnnxRegressionScorer {
        fn predict(&mut self, features: &[f64; 5]) -> anyhow::Result<f64> {
            let session = self
                .session
                .as_mut()
                .ok_or_else(|| anyhow::anyhow!("Regression model not loaded"))?;

            let input: Vec<f32> = features.iter().map(|&v| v as f32).collect();
            let tensor = ort::value::Value::from_array(([1usize, 5], input))
                .map_err(|e| anyhow::anyhow!("input value: {e}"))?;

            let outputs = session
                .run(ort::inputs!["float_input" => tensor])
                .map_err(|e| anyhow::anyhow!("inference: {e}"))?;

            let (_shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| anyhow::anyhow!("extract prediction: {e}"))?;
            let pred = *data
                .first()
                .ok_or_else(|| anyhow::anyhow!("empty prediction output"))?;
            Ok(pred as f64)
        }

        fn is_available(&self) -> bool {
            self.session.is_some()
        }
    }
}

// -----------------------------------------------------------------------
// Stub: no onnx feature
// -----------------------------------------------------------------------
#[cfg(not(feature = "onnx"))]
mod inner {
    use super::*;

    pub struct OnnxRegressionScorer {
        _private: (),
    }

    impl OnnxRegressionScorer {
        pub fn load(path: &Path) -> Self {
            warn!(
                path = %path.display(),
                "Regression scorer not available (onnx feature disabled)"
            );
            Self { _private: () }
        }
    }

    impl RegressionScorer for OnnxRegressionScorer {
        fn predict(&mut self, _features: &[f64; 5]) -> anyhow::Result<f64> {
            anyhow::bail!("onnx feature disabled")
        }

        fn is_available(&self) -> bool {
            false
        }
    }
}

pub use inner::OnnxRegressionScorer;
