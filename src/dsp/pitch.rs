//! FFT-based fundamental-frequency estimation.
//!
//! Picks the strongest spectral peak inside the human-voice fundamental band
//! and rejects chunks whose peak does not stand out from the band average.
//! Long chunks are Fourier-resampled to a bounded length first; the
//! effective sample rate is scaled with them so bin frequencies stay in Hz.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftDirection, FftPlanner};
use serde::{Deserialize, Serialize};

/// Chunks shorter than this never yield a pitch.
pub const MIN_PITCH_SAMPLES: usize = 512;

/// Chunks longer than this are resampled down to it before the FFT.
pub const MAX_FFT_SAMPLES: usize = 4096;

/// Lower edge of the voice fundamental band.
pub const PITCH_MIN_HZ: f64 = 50.0;

/// Upper edge of the voice fundamental band.
pub const PITCH_MAX_HZ: f64 = 320.0;

/// Minimum `peak / mean_band` magnitude ratio for a tonal chunk.
pub const TONALITY_MIN_RATIO: f64 = 3.0;

const SPECTRUM_EPSILON: f64 = 1e-10;

/// Sub-harmonic check that undoes octave-doubling errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OctaveCorrection {
    /// Only peaks above this frequency are checked.
    pub min_peak_hz: f64,
    /// Bins within this distance of half the peak frequency are inspected.
    pub tolerance_hz: f64,
    /// Half-frequency magnitude must exceed this fraction of the peak.
    pub ratio: f64,
}

impl Default for OctaveCorrection {
    fn default() -> Self {
        Self {
            min_peak_hz: 100.0,
            tolerance_hz: 2.0,
            ratio: 0.7,
        }
    }
}

/// FFT plans are cached per (length, inverse); chunk lengths are fixed per
/// session so the cache stays tiny.
pub struct PitchEstimator {
    plans: HashMap<(usize, bool), Arc<dyn Fft<f64>>>,
    octave_correction: Option<OctaveCorrection>,
}

impl PitchEstimator {
    pub fn new(octave_correction: Option<OctaveCorrection>) -> Self {
        Self {
            plans: HashMap::new(),
            octave_correction,
        }
    }

    fn plan(&mut self, len: usize, direction: FftDirection) -> Arc<dyn Fft<f64>> {
        let inverse = direction == FftDirection::Inverse;
        Arc::clone(
            self.plans
                .entry((len, inverse))
                .or_insert_with(|| FftPlanner::new().plan_fft(len, direction)),
        )
    }

    /// Estimate the fundamental frequency of `chunk` in Hz, or `None` when
    /// the chunk is too short, non-tonal, or has no in-band peak.
    pub fn estimate(&mut self, chunk: &[f32], sample_rate: u32) -> Option<f64> {
        if chunk.len() < MIN_PITCH_SAMPLES || sample_rate == 0 {
            return None;
        }
        if chunk.iter().any(|s| !s.is_finite()) {
            return None;
        }

        let mean = chunk.iter().map(|&s| s as f64).sum::<f64>() / chunk.len() as f64;
        let mut signal: Vec<f64> = chunk.iter().map(|&s| s as f64 - mean).collect();
        let mut rate = sample_rate as f64;

        if signal.len() > MAX_FFT_SAMPLES {
            rate *= MAX_FFT_SAMPLES as f64 / signal.len() as f64;
            signal = self.fourier_resample(&signal, MAX_FFT_SAMPLES);
        }

        let spectrum = self.magnitude_spectrum(&signal);
        let bin_hz = rate / signal.len() as f64;
        let freq_of = |k: usize| k as f64 * bin_hz;

        let band: Vec<usize> = (0..spectrum.len())
            .filter(|&k| (PITCH_MIN_HZ..=PITCH_MAX_HZ).contains(&freq_of(k)))
            .collect();
        if band.is_empty() {
            return None;
        }

        // First maximum wins on ties.
        let mut peak_bin = band[0];
        for &k in &band[1..] {
            if spectrum[k] > spectrum[peak_bin] {
                peak_bin = k;
            }
        }
        let peak_power = spectrum[peak_bin];
        let mean_power = band.iter().map(|&k| spectrum[k]).sum::<f64>() / band.len() as f64;
        if !peak_power.is_finite() || peak_power / (mean_power + SPECTRUM_EPSILON) < TONALITY_MIN_RATIO {
            return None;
        }

        let mut peak_freq = freq_of(peak_bin);

        if let Some(oc) = self.octave_correction {
            if peak_freq > oc.min_peak_hz {
                let half = peak_freq / 2.0;
                let half_power = (0..spectrum.len())
                    .filter(|&k| (freq_of(k) - half).abs() < oc.tolerance_hz)
                    .map(|k| spectrum[k])
                    .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
                if let Some(hp) = half_power {
                    if hp > oc.ratio * peak_power {
                        peak_freq = half;
                    }
                }
            }
        }

        if (PITCH_MIN_HZ..=PITCH_MAX_HZ).contains(&peak_freq) {
            Some(peak_freq)
        } else {
            None
        }
    }

    /// Hamming-windowed magnitude spectrum over non-negative frequencies.
    fn magnitude_spectrum(&mut self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        let mut buf: Vec<Complex<f64>> = signal
            .iter()
            .zip(hamming(n))
            .map(|(&s, w)| Complex::new(s * w, 0.0))
            .collect();
        self.plan(n, FftDirection::Forward).process(&mut buf);
        buf.iter().take(n / 2 + 1).map(|c| c.norm()).collect()
    }

    /// Band-limited resampling to `target` samples by truncating the
    /// spectrum. `target` must be smaller than `signal.len()`.
    fn fourier_resample(&mut self, signal: &[f64], target: usize) -> Vec<f64> {
        let n = signal.len();
        let mut spec: Vec<Complex<f64>> = signal.iter().map(|&v| Complex::new(v, 0.0)).collect();
        self.plan(n, FftDirection::Forward).process(&mut spec);

        let mut out = vec![Complex::new(0.0, 0.0); target];
        let half = target / 2;
        out[..half].copy_from_slice(&spec[..half]);
        for k in 1..half {
            out[target - k] = spec[n - k];
        }
        if target % 2 == 0 {
            // Fold both sides of the new Nyquist bin so the result stays real.
            out[half] = (spec[half] + spec[n - half]) * 0.5;
        } else {
            out[half] = spec[half];
            out[target - half] = spec[n - half];
        }

        self.plan(target, FftDirection::Inverse).process(&mut out);
        let scale = 1.0 / n as f64;
        out.iter().map(|c| c.re * scale).collect()
    }
}

fn hamming(n: usize) -> impl Iterator<Item = f64> {
    let denom = (n.max(2) - 1) as f64;
    (0..n).map(move |i| 0.54 - 0.46 * (2.0 * PI * i as f64 / denom).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, amp: f64, len: usize, rate: u32) -> Vec<f32> {
        (0..len)
            .map(|i| (amp * (2.0 * PI * freq * i as f64 / rate as f64).sin()) as f32)
            .collect()
    }

    #[test]
    fn test_short_chunk_rejected() {
        let mut est = PitchEstimator::new(None);
        assert_eq!(est.estimate(&sine(200.0, 0.5, 511, 16_000), 16_000), None);
    }

    #[test]
    fn test_silence_has_no_pitch() {
        let mut est = PitchEstimator::new(None);
        assert_eq!(est.estimate(&[0.0; 8000], 16_000), None);
        assert_eq!(est.estimate(&[0.25; 8000], 16_000), None);
    }

    #[test]
    fn test_non_finite_chunk_has_no_pitch() {
        let mut est = PitchEstimator::new(None);
        let mut chunk = sine(200.0, 0.5, 8000, 16_000);
        chunk[10] = f32::NAN;
        assert_eq!(est.estimate(&chunk, 16_000), None);
    }

    #[test]
    fn test_tone_in_long_chunk() {
        // 8000 samples are resampled to 4096; bins land on 2 Hz steps.
        let mut est = PitchEstimator::new(None);
        let f0 = est.estimate(&sine(200.0, 0.5, 8000, 16_000), 16_000).unwrap();
        assert!((f0 - 200.0).abs() <= 2.0, "got {f0}");
    }

    #[test]
    fn test_tone_in_short_chunk() {
        // 1600 samples at 16 kHz -> 10 Hz bins, no resampling.
        let mut est = PitchEstimator::new(None);
        let f0 = est.estimate(&sine(150.0, 0.5, 1600, 16_000), 16_000).unwrap();
        assert!((f0 - 150.0).abs() <= 10.0, "got {f0}");
    }

    #[test]
    fn test_octave_correction() {
        let rate = 16_000;
        let chunk: Vec<f32> = (0..8000)
            .map(|i| {
                let t = i as f64 / rate as f64;
                (0.3 * (2.0 * PI * 100.0 * t).sin() + 0.36 * (2.0 * PI * 200.0 * t).sin()) as f32
            })
            .collect();

        let mut plain = PitchEstimator::new(None);
        let f_plain = plain.estimate(&chunk, rate).unwrap();
        assert!((f_plain - 200.0).abs() <= 2.0, "got {f_plain}");

        let mut corrected = PitchEstimator::new(Some(OctaveCorrection::default()));
        let f_corr = corrected.estimate(&chunk, rate).unwrap();
        assert!((f_corr - 100.0).abs() <= 2.0, "got {f_corr}");
    }

    #[test]
    fn test_octave_correction_skips_weak_subharmonic() {
        let rate = 16_000;
        let chunk: Vec<f32> = (0..8000)
            .map(|i| {
                let t = i as f64 / rate as f64;
                (0.05 * (2.0 * PI * 100.0 * t).sin() + 0.5 * (2.0 * PI * 200.0 * t).sin()) as f32
            })
            .collect();
        let mut est = PitchEstimator::new(Some(OctaveCorrection::default()));
        let f0 = est.estimate(&chunk, rate).unwrap();
        assert!((f0 - 200.0).abs() <= 2.0, "got {f0}");
    }

    #[test]
    fn test_hamming_endpoints() {
        let w: Vec<f64> = hamming(5).collect();
        assert!((w[0] - 0.08).abs() < 1e-12);
        assert!((w[2] - 1.0).abs() < 1e-12);
        assert!((w[4] - 0.08).abs() < 1e-12);
    }
}
