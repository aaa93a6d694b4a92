//! Chunk energy in decibels.

/// Guard added to the RMS before taking the log.
pub const ENERGY_EPSILON: f64 = 1e-10;

/// Energy reported for silent or empty input (-200 dB).
pub const MIN_ENERGY_DB: f64 = -200.0;

/// Compute `20 * log10(rms + eps)` for an audio chunk.
///
/// Always finite. NaN and infinite samples are left out of the RMS; a
/// chunk with no finite samples reports [`MIN_ENERGY_DB`].
pub fn energy_db(chunk: &[f32]) -> f64 {
    let (sum_sq, count) = chunk
        .iter()
        .filter(|s| s.is_finite())
        .fold((0.0f64, 0usize), |(sum, n), &s| (sum + (s as f64) * (s as f64), n + 1));
    if count == 0 {
        return MIN_ENERGY_DB;
    }
    let rms = (sum_sq / count as f64).sqrt();
    let db = 20.0 * (rms + ENERGY_EPSILON).log10();
    if db.is_finite() {
        db
    } else {
        MIN_ENERGY_DB
    }
}
