//! Lock-free SPSC chunk handoff between the capture callback and the
//! analysis loop.
//!
//! Uses the `ringbuf` crate so the cpal callback thread never blocks. The
//! queue is bounded: when it is full the incoming chunk is dropped and
//! counted, so memory stays bounded if the consumer stalls. Chunk offsets
//! are stamped on the producer side, which keeps the stream clock correct
//! across drops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};

use super::chunk::AudioChunk;

/// Default capacity: 64 chunks (32 seconds at 0.5 s chunks).
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Producer half, owned by the cpal audio callback thread.
pub struct ChunkProducer {
    inner: ringbuf::HeapProd<AudioChunk>,
    dropped: Arc<AtomicU64>,
    samples_seen: u64,
}

/// Consumer half, owned by the analysis loop.
pub struct ChunkConsumer {
    inner: ringbuf::HeapCons<AudioChunk>,
    dropped: Arc<AtomicU64>,
}

/// Create a matched producer/consumer pair holding at most `capacity` chunks.
pub fn chunk_queue(capacity: Option<usize>) -> (ChunkProducer, ChunkConsumer) {
    let cap = capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY).max(1);
    let rb = HeapRb::<AudioChunk>::new(cap);
    let (prod, cons) = rb.split();
    let dropped = Arc::new(AtomicU64::new(0));
    (
        ChunkProducer {
            inner: prod,
            dropped: Arc::clone(&dropped),
            samples_seen: 0,
        },
        ChunkConsumer {
            inner: cons,
            dropped,
        },
    )
}

impl ChunkProducer {
    /// Stamp `samples` with the current stream offset and enqueue them.
    /// Returns `false` if the queue was full and the chunk was dropped.
    pub fn push(&mut self, samples: Vec<f32>) -> bool {
        let start_sample = self.samples_seen;
        self.samples_seen += samples.len() as u64;
        match self.inner.try_push(AudioChunk::new(samples, start_sample)) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

impl ChunkConsumer {
    /// Pop the oldest queued chunk, if any.
    pub fn pop(&mut self) -> Option<AudioChunk> {
        self.inner.try_pop()
    }

    /// Number of chunks currently waiting.
    pub fn available(&self) -> usize {
        self.inner.occupied_len()
    }

    /// Total chunks dropped by the producer because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
