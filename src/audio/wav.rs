//! WAV file input for batch scoring.

use std::path::Path;

use anyhow::{bail, Context};
use hound::SampleFormat;
use tracing::debug;

use super::chunk::{resample_linear, to_mono};

/// Read a WAV file as mono f32 in [-1, 1] at `target_rate`.
pub fn read_wav(path: &Path, target_rate: u32) -> anyhow::Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to decode float samples")?,
        (SampleFormat::Int, bits @ 8..=32) => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .context("Failed to decode integer samples")?
        }
        (format, bits) => bail!("Unsupported WAV sample format: {format:?} {bits}-bit"),
    };

    debug!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        bits = spec.bits_per_sample,
        "WAV file read"
    );

    let mono = to_mono(&interleaved, spec.channels);
    Ok(resample_linear(&mono, spec.sample_rate, target_rate))
}
