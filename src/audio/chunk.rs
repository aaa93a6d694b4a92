//! Fixed-length audio chunks and batch partitioning.

/// Default processing sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Default chunk length in seconds.
pub const DEFAULT_CHUNK_SECS: f64 = 0.5;

/// One atomic unit of processing: mono samples plus the stream offset of
/// the first sample.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    /// Samples since the start of the stream.
    pub start_sample: u64,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, start_sample: u64) -> Self {
        Self {
            samples,
            start_sample,
        }
    }

    pub fn start_secs(&self, sample_rate: u32) -> f64 {
        self.start_sample as f64 / sample_rate.max(1) as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Number of samples in one chunk at `sample_rate`.
pub fn chunk_samples(sample_rate: u32, chunk_secs: f64) -> usize {
    ((sample_rate as f64 * chunk_secs).round() as usize).max(1)
}

/// Split a finished recording into full chunks. A trailing partial chunk is
/// dropped.
pub fn partition(audio: &[f32], chunk_len: usize) -> impl Iterator<Item = AudioChunk> + '_ {
    let chunk_len = chunk_len.max(1);
    audio
        .chunks_exact(chunk_len)
        .enumerate()
        .map(move |(i, c)| AudioChunk::new(c.to_vec(), (i * chunk_len) as u64))
}

/// Down-mix interleaved multi-channel audio to mono by averaging channels.
pub fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let ch = channels as usize;
    samples
        .chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Simple linear resampler from `from_rate` to `to_rate`.
pub fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return input.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((input.len() as f64) / ratio).floor() as usize;
    let mut output = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_idx = i as f64 * ratio;
        let idx0 = src_idx.floor() as usize;
        let frac = (src_idx - idx0 as f64) as f32;
        let s0 = input.get(idx0).copied().unwrap_or(0.0);
        let s1 = input.get(idx0 + 1).copied().unwrap_or(s0);
        output.push(s0 + frac * (s1 - s0));
    }
    output
}
