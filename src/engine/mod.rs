//! Confidence engine: one pipeline for both batch and streaming scoring.
//!
//! chunk -> VAD -> pause tracker + rolling histories -> (loud chunks) pitch
//! -> readiness -> feature extraction -> scorer
//!
//! The two modes differ only in their [`ModePolicy`]. All mutable
//! per-answer state lives in [`EngineSession`], which is rebuilt from
//! scratch on reset.

pub mod streaming;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audio::{chunk_samples, partition, AudioChunk, DEFAULT_CHUNK_SECS, DEFAULT_SAMPLE_RATE};
use crate::collab::{remap_prediction, RegressionScorer};
use crate::dsp::{OctaveCorrection, PitchEstimator};
use crate::error::{ConfigResult, SignalError};
use crate::features::{
    ExtractionSettings, FeatureSnapshot, Features, ReadinessPolicy, ReadinessStatus,
    RollingAggregator,
};
use crate::scoring::{
    ConfidenceScorer, ProfileInfo, ProfileRegistry, Rating, ScoringProfile, Smoother,
    DEFAULT_SMOOTHING_ALPHA,
};
use crate::vad::{NoiseStatistic, PauseTracker, VadDecision, VadSettings, VoiceActivityDetector};

pub use streaming::{LiveAnalyzer, StreamCommand, StreamUpdate};

/// Default analysis window in seconds.
pub const DEFAULT_ANALYSIS_WINDOW_SECS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Batch,
    Streaming,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Batch => write!(f, "batch"),
            Self::Streaming => write!(f, "streaming"),
        }
    }
}

impl Mode {
    /// Batch results are finished answers; streaming results feed the live
    /// display.
    pub fn rating(self, score: f64) -> Rating {
        match self {
            Self::Batch => Rating::answer(score),
            Self::Streaming => Rating::live(score),
        }
    }
}

/// Everything that differs between batch and streaming scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModePolicy {
    pub mode: Mode,
    pub vad: VadSettings,
    pub pause_debounce_secs: f64,
    pub octave_correction: Option<OctaveCorrection>,
    pub neutral_silence_ratio: f64,
    pub readiness: ReadinessPolicy,
    /// `None` disables smoothing (one score per utterance).
    pub smoothing_alpha: Option<f64>,
}

impl ModePolicy {
    /// One short pre-segmented answer.
    pub fn batch() -> Self {
        Self {
            mode: Mode::Batch,
            vad: VadSettings {
                calibration_chunks: 5,
                noise_statistic: NoiseStatistic::Min,
                vad_margin_db: 2.0,
                loud_margin_db: 5.0,
                classify_calibration_chunk: true,
            },
            pause_debounce_secs: 0.1,
            octave_correction: None,
            neutral_silence_ratio: 0.5,
            readiness: ReadinessPolicy::batch(),
            smoothing_alpha: None,
        }
    }

    /// An indefinitely running live feed.
    pub fn streaming() -> Self {
        Self {
            mode: Mode::Streaming,
            vad: VadSettings {
                calibration_chunks: 10,
                noise_statistic: NoiseStatistic::Median,
                vad_margin_db: 10.0,
                loud_margin_db: 15.0,
                classify_calibration_chunk: false,
            },
            pause_debounce_secs: 0.4,
            octave_correction: Some(OctaveCorrection::default()),
            neutral_silence_ratio: 0.0,
            readiness: ReadinessPolicy::streaming(),
            smoothing_alpha: Some(DEFAULT_SMOOTHING_ALPHA),
        }
    }
}

/// Stream geometry shared by both modes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub sample_rate: u32,
    pub chunk_secs: f64,
    pub analysis_window_secs: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_secs: DEFAULT_CHUNK_SECS,
            analysis_window_secs: DEFAULT_ANALYSIS_WINDOW_SECS,
        }
    }
}

impl EngineSettings {
    pub fn chunk_len(&self) -> usize {
        chunk_samples(self.sample_rate, self.chunk_secs)
    }

    /// Voiced-flag window capacity: analysis window over chunk length.
    pub fn window_chunks(&self) -> usize {
        if self.chunk_secs <= 0.0 {
            return 1;
        }
        ((self.analysis_window_secs / self.chunk_secs).floor() as usize).max(1)
    }
}

/// What happened to one chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChunkDecision {
    /// Empty chunk, ignored.
    Skipped,
    /// Absorbed into noise-floor calibration.
    Calibrating { energy: f64 },
    Classified {
        energy: f64,
        speaking: bool,
        pitch: Option<f64>,
    },
}

/// Per-answer (batch) or per-run (streaming) mutable state.
#[derive(Debug, Clone)]
pub struct EngineSession {
    vad: VoiceActivityDetector,
    pauses: PauseTracker,
    aggregator: RollingAggregator,
    smoother: Option<Smoother>,
    chunks: u64,
    audio_secs: f64,
}

impl EngineSession {
    pub fn new(policy: &ModePolicy, settings: &EngineSettings) -> Self {
        Self {
            vad: VoiceActivityDetector::new(policy.vad),
            pauses: PauseTracker::new(policy.pause_debounce_secs, settings.sample_rate),
            aggregator: RollingAggregator::new(settings.window_chunks()),
            smoother: policy.smoothing_alpha.map(Smoother::new),
            chunks: 0,
            audio_secs: 0.0,
        }
    }

    pub fn noise_floor(&self) -> Option<f64> {
        self.vad.noise_floor()
    }

    pub fn aggregator(&self) -> &RollingAggregator {
        &self.aggregator
    }

    pub fn chunks_processed(&self) -> u64 {
        self.chunks
    }

    /// Seconds of audio folded into this session.
    pub fn audio_secs(&self) -> f64 {
        self.audio_secs
    }
}

/// Output for one scored unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceResult {
    pub confidence: f64,
    pub raw_features: Features,
    pub clipped_features: Features,
    pub speech_detected: bool,
    pub audio_duration: f64,
    /// Secondary score from the regression collaborator, when wired in.
    pub ml_confidence: Option<f64>,
    pub profile: String,
    /// Label for `confidence` on the scale of the producing mode.
    pub rating: Rating,
}

impl ConfidenceResult {
    /// Structurally complete "no signal" result.
    pub fn no_signal(mode: Mode, profile: &str, audio_duration: f64) -> Self {
        Self {
            confidence: 0.0,
            raw_features: Features::default(),
            clipped_features: Features::default(),
            speech_detected: false,
            audio_duration,
            ml_confidence: None,
            profile: profile.to_string(),
            rating: mode.rating(0.0),
        }
    }
}

pub struct ConfidenceEngine {
    policy: ModePolicy,
    settings: EngineSettings,
    registry: ProfileRegistry,
    profile: ScoringProfile,
    scorer: ConfidenceScorer,
    pitch: PitchEstimator,
    regression: Option<Box<dyn RegressionScorer>>,
    session: EngineSession,
}

impl ConfidenceEngine {
    /// Build an engine using `profile_key` from `registry`. Unknown profiles
    /// are a fatal configuration error.
    pub fn new(
        policy: ModePolicy,
        settings: EngineSettings,
        registry: ProfileRegistry,
        profile_key: &str,
    ) -> ConfigResult<Self> {
        let profile = registry.get(profile_key)?.clone();
        info!(
            mode = %policy.mode,
            profile = %profile.key,
            sample_rate = settings.sample_rate,
            window_chunks = settings.window_chunks(),
            "Confidence engine created"
        );
        Ok(Self {
            scorer: ConfidenceScorer::new(&profile),
            pitch: PitchEstimator::new(policy.octave_correction),
            session: EngineSession::new(&policy, &settings),
            policy,
            settings,
            registry,
            profile,
            regression: None,
        })
    }

    pub fn batch(registry: ProfileRegistry, profile_key: &str) -> ConfigResult<Self> {
        Self::new(ModePolicy::batch(), EngineSettings::default(), registry, profile_key)
    }

    pub fn streaming(registry: ProfileRegistry, profile_key: &str) -> ConfigResult<Self> {
        Self::new(ModePolicy::streaming(), EngineSettings::default(), registry, profile_key)
    }

    /// Attach the optional regression collaborator.
    pub fn with_regression(mut self, scorer: Box<dyn RegressionScorer>) -> Self {
        self.regression = Some(scorer);
        self
    }

    pub fn regression_available(&self) -> bool {
        self.regression.as_ref().is_some_and(|r| r.is_available())
    }

    pub fn policy(&self) -> &ModePolicy {
        &self.policy
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn profile(&self) -> &ScoringProfile {
        &self.profile
    }

    pub fn available_profiles(&self) -> Vec<ProfileInfo> {
        self.registry.list()
    }

    pub fn session(&self) -> &EngineSession {
        &self.session
    }

    pub fn noise_floor(&self) -> Option<f64> {
        self.session.noise_floor()
    }

    /// Replace the active weights. VAD, pause, pitch history and the
    /// smoothing carry are kept.
    pub fn switch_profile(&mut self, key: &str) -> ConfigResult<()> {
        let profile = self.registry.get(key)?.clone();
        info!(from = %self.profile.key, to = %profile.key, "Scoring profile switched");
        self.scorer = ConfidenceScorer::new(&profile);
        self.profile = profile;
        Ok(())
    }

    /// Start a fresh session: new noise floor, empty histories, no
    /// smoothing carry. The profile and registry are kept.
    pub fn reset(&mut self) {
        debug!(chunks = self.session.chunks, "Engine session reset");
        self.session = EngineSession::new(&self.policy, &self.settings);
    }

    /// Fold one chunk into the session.
    pub fn process_chunk(&mut self, chunk: &AudioChunk) -> ChunkDecision {
        if chunk.is_empty() {
            return ChunkDecision::Skipped;
        }

        let session = &mut self.session;
        session.chunks += 1;
        session.audio_secs += chunk.len() as f64 / self.settings.sample_rate as f64;

        match session.vad.process(&chunk.samples) {
            VadDecision::Calibrating { energy } => ChunkDecision::Calibrating { energy },
            VadDecision::Classified {
                energy,
                speaking,
                loud,
            } => {
                session.aggregator.push_voiced(speaking);

                if let Some(pause) = session.pauses.update(speaking, chunk.start_sample) {
                    debug!(pause_secs = pause, "Pause recorded");
                    session.aggregator.push_pause(pause);
                }

                let pitch = if loud {
                    self.pitch.estimate(&chunk.samples, self.settings.sample_rate)
                } else {
                    None
                };
                if let Some(hz) = pitch {
                    session.aggregator.push_pitch(hz);
                }

                debug!(
                    at_secs = chunk.start_secs(self.settings.sample_rate),
                    energy,
                    speaking,
                    pitch = ?pitch,
                    "Chunk classified"
                );
                ChunkDecision::Classified {
                    energy,
                    speaking,
                    pitch,
                }
            }
        }
    }

    fn extraction_settings(&self) -> ExtractionSettings {
        ExtractionSettings {
            analysis_window_secs: self.settings.analysis_window_secs,
            neutral_silence_ratio: self.policy.neutral_silence_ratio,
        }
    }

    /// Warm-up progress against this mode's readiness targets.
    pub fn readiness(&self) -> ReadinessStatus {
        self.policy
            .readiness
            .status(&self.session.aggregator, self.session.vad.noise_floor().is_some())
    }

    /// Extract features, failing unless the readiness predicate holds.
    pub fn extract_features(&self) -> Result<FeatureSnapshot, SignalError> {
        let agg = &self.session.aggregator;
        let snapshot = agg.extract(&self.extraction_settings())?;
        self.policy
            .readiness
            .check(agg, self.session.vad.noise_floor().is_some(), &snapshot)?;
        Ok(snapshot)
    }

    pub fn features_ready(&self) -> bool {
        self.extract_features().is_ok()
    }

    /// Score the current session state. Streaming policies smooth the
    /// score into the session carry.
    pub fn try_score(&mut self) -> Result<ConfidenceResult, SignalError> {
        let snapshot = self.extract_features()?;
        let raw = self.scorer.score(&snapshot.clipped);
        let confidence = match self.session.smoother.as_mut() {
            Some(smoother) => smoother.apply(raw),
            None => raw,
        };

        let ml_confidence = self.regression_score(&snapshot.clipped);

        Ok(ConfidenceResult {
            confidence,
            raw_features: snapshot.raw,
            clipped_features: snapshot.clipped,
            speech_detected: true,
            audio_duration: self.session.audio_secs,
            ml_confidence,
            profile: self.profile.key.clone(),
            rating: self.policy.mode.rating(confidence),
        })
    }

    /// Like [`try_score`](Self::try_score), but every failure degrades to
    /// the "no signal" result.
    pub fn score_current(&mut self) -> ConfidenceResult {
        match self.try_score() {
            Ok(result) => result,
            Err(e) => {
                debug!(reason = %e, "No confidence signal");
                ConfidenceResult::no_signal(
                    self.policy.mode,
                    &self.profile.key,
                    self.session.audio_secs,
                )
            }
        }
    }

    /// Batch-score one finished recording in a fresh session.
    pub fn score_recording(&mut self, audio: &[f32]) -> ConfidenceResult {
        self.reset();
        if audio.is_empty() {
            debug!(reason = %SignalError::EmptyInput, "No confidence signal");
            return ConfidenceResult::no_signal(self.policy.mode, &self.profile.key, 0.0);
        }

        let duration = audio.len() as f64 / self.settings.sample_rate as f64;
        for chunk in partition(audio, self.settings.chunk_len()) {
            self.process_chunk(&chunk);
        }

        let mut result = self.score_current();
        result.audio_duration = duration;
        info!(
            confidence = format!("{:.1}", result.confidence),
            speech_detected = result.speech_detected,
            duration_secs = format!("{:.2}", duration),
            profile = %self.profile.key,
            "Recording scored"
        );
        result
    }

    fn regression_score(&mut self, clipped: &Features) -> Option<f64> {
        let model = self.regression.as_mut()?;
        if !model.is_available() {
            return None;
        }
        match model.predict(&clipped.to_array()) {
            Ok(pred) => remap_prediction(pred),
            Err(e) => {
                warn!("Regression scorer failed: {}", e);
                None
            }
        }
    }
}
