//! Live analysis loop: drains the chunk queue into a streaming engine.
//!
//! The analyzer is the only mutator of the engine. Profile switches and
//! resets arrive over a command channel and are applied between chunks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Duration;

use tracing::{info, warn};

use super::{ChunkDecision, ConfidenceEngine, ConfidenceResult};
use crate::audio::ChunkConsumer;
use crate::features::ReadinessStatus;

/// Idle wait when the queue is empty (under one chunk at 0.5 s chunks).
const POLL_INTERVAL: Duration = Duration::from_millis(40);

#[derive(Debug, Clone, PartialEq)]
pub enum StreamCommand {
    SwitchProfile(String),
    Reset,
}

impl StreamCommand {
    /// Parse one line of console input: `profile <key>` or `reset`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = match (words.next()?, words.next()) {
            ("profile", Some(key)) => Self::SwitchProfile(key.to_string()),
            ("reset", None) => Self::Reset,
            _ => return None,
        };
        words.next().is_none().then_some(command)
    }
}

/// Events emitted by the live loop.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamUpdate {
    /// A chunk was processed but the readiness gate is still closed.
    WarmingUp(ReadinessStatus),
    Score {
        inference: u64,
        result: ConfidenceResult,
    },
    ProfileChanged(String),
    SessionReset,
    /// Running total of chunks lost to a full queue.
    ChunksDropped(u64),
    Error(String),
}

pub struct LiveAnalyzer {
    engine: ConfidenceEngine,
    consumer: ChunkConsumer,
    commands: Receiver<StreamCommand>,
    reported_drops: u64,
    inferences: u64,
}

impl LiveAnalyzer {
    /// Wrap an engine and queue consumer. The returned sender controls the
    /// analyzer from other threads.
    pub fn new(engine: ConfidenceEngine, consumer: ChunkConsumer) -> (Self, Sender<StreamCommand>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                engine,
                consumer,
                commands: rx,
                reported_drops: 0,
                inferences: 0,
            },
            tx,
        )
    }

    pub fn engine(&self) -> &ConfidenceEngine {
        &self.engine
    }

    pub fn inferences(&self) -> u64 {
        self.inferences
    }

    fn apply_commands(&mut self, on_update: &mut impl FnMut(StreamUpdate)) {
        loop {
            match self.commands.try_recv() {
                Ok(StreamCommand::SwitchProfile(key)) => match self.engine.switch_profile(&key) {
                    Ok(()) => on_update(StreamUpdate::ProfileChanged(key)),
                    Err(e) => {
                        let known: Vec<String> = self
                            .engine
                            .available_profiles()
                            .into_iter()
                            .map(|p| p.key)
                            .collect();
                        warn!(available = ?known, "Profile switch rejected: {}", e);
                        on_update(StreamUpdate::Error(e.to_string()));
                    }
                },
                Ok(StreamCommand::Reset) => {
                    self.engine.reset();
                    info!("Live session reset");
                    on_update(StreamUpdate::SessionReset);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Apply pending commands, then process every queued chunk. Returns
    /// the number of chunks processed.
    pub fn pump(&mut self, on_update: &mut impl FnMut(StreamUpdate)) -> usize {
        self.apply_commands(on_update);

        let dropped = self.consumer.dropped();
        if dropped > self.reported_drops {
            warn!(
                dropped_total = dropped,
                new = dropped - self.reported_drops,
                "Analysis fell behind; chunks dropped"
            );
            self.reported_drops = dropped;
            on_update(StreamUpdate::ChunksDropped(dropped));
        }

        let mut processed = 0;
        while let Some(chunk) = self.consumer.pop() {
            processed += 1;
            if self.engine.process_chunk(&chunk) == ChunkDecision::Skipped {
                continue;
            }
            if !self.engine.features_ready() {
                on_update(StreamUpdate::WarmingUp(self.engine.readiness()));
                continue;
            }
            match self.engine.try_score() {
                Ok(result) => {
                    self.inferences += 1;
                    on_update(StreamUpdate::Score {
                        inference: self.inferences,
                        result,
                    });
                }
                Err(e) => on_update(StreamUpdate::Error(e.to_string())),
            }
        }
        processed
    }

    /// Run until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool, mut on_update: impl FnMut(StreamUpdate)) {
        info!(
            mode = %self.engine.policy().mode,
            profile = %self.engine.profile().key,
            "Live analysis loop started"
        );

        while running.load(Ordering::Relaxed) {
            if self.pump(&mut on_update) == 0 {
                std::thread::sleep(POLL_INTERVAL);
            }
        }

        info!(
            inferences = self.inferences,
            chunks = self.engine.session().chunks_processed(),
            dropped = self.consumer.dropped(),
            "Live analysis loop stopped"
        );
    }
}
