//! Spectral analysis primitives.

pub mod pitch;

pub use pitch::{OctaveCorrection, PitchEstimator};
