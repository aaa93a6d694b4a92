//! Audio chunks, microphone capture, WAV input, and the capture-to-analysis
//! handoff.

pub mod capture;
pub mod chunk;
pub mod handoff;
pub mod wav;

pub use capture::{list_devices, record_for, start_capture};
pub use chunk::{chunk_samples, partition, AudioChunk, DEFAULT_CHUNK_SECS, DEFAULT_SAMPLE_RATE};
pub use handoff::{chunk_queue, ChunkConsumer, ChunkProducer, DEFAULT_QUEUE_CAPACITY};
pub use wav::read_wav;
