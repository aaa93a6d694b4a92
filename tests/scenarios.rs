//! End-to-end scoring scenarios on synthetic signals.

use std::f64::consts::PI;

use poise::audio::{chunk_queue, partition};
use poise::engine::{LiveAnalyzer, StreamCommand, StreamUpdate};
use poise::{ConfidenceEngine, ProfileRegistry};

const RATE: u32 = 16_000;
const CHUNK: usize = 8000;

fn tone(freq: f64, samples: usize) -> Vec<f32> {
    (0..samples)
        .map(|i| (0.5 * (2.0 * PI * freq * i as f64 / RATE as f64).sin()) as f32)
        .collect()
}

/// 0.5 s of 200 Hz tone followed by 0.5 s of silence, repeated.
fn alternating(total_secs: usize) -> Vec<f32> {
    let mut audio = Vec::new();
    for _ in 0..total_secs {
        audio.extend(tone(200.0, CHUNK));
        audio.extend(vec![0.0; CHUNK]);
    }
    audio
}

/// Deterministic low-level noise in [-amp, amp].
fn noise(samples: usize, amp: f32, seed: u64) -> Vec<f32> {
    let mut state = seed;
    (0..samples)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let unit = (state >> 40) as f32 / (1u64 << 24) as f32;
            (unit * 2.0 - 1.0) * amp
        })
        .collect()
}

fn batch(profile: &str) -> ConfidenceEngine {
    ConfidenceEngine::batch(ProfileRegistry::builtin(), profile).unwrap()
}

#[test]
fn test_all_silence_is_no_signal() {
    let mut engine = batch("balanced");
    let result = engine.score_recording(&vec![0.0; 5 * RATE as usize]);
    assert!(!result.speech_detected);
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.audio_duration, 5.0);
    assert_eq!(result.profile, "balanced");
}

#[test]
fn test_alternating_tone_scores_in_range() {
    let mut engine = batch("balanced");
    let result = engine.score_recording(&alternating(6));
    assert!(result.speech_detected);
    assert!(result.raw_features.pause_freq > 0.0);
    assert!(result.raw_features.pitch_std.is_finite());
    assert!(result.confidence > 0.0 && result.confidence < 100.0);
    assert_eq!(result.clipped_features, result.raw_features.clipped());
}

#[test]
fn test_batch_scoring_is_deterministic() {
    let audio = alternating(6);
    let mut engine = batch("presence");
    let first = engine.score_recording(&audio);
    let second = engine.score_recording(&audio);
    assert_eq!(first.confidence.to_bits(), second.confidence.to_bits());
    assert_eq!(first, second);

    let mut fresh = batch("presence");
    assert_eq!(fresh.score_recording(&audio), first);
}

#[test]
fn test_profiles_weigh_pitch_and_silence_differently() {
    // Calibration silence, then continuous speech with a wandering pitch.
    let mut audio = vec![0.0; 5 * CHUNK];
    for freq in [100.0, 300.0, 120.0, 280.0, 140.0, 260.0, 160.0, 240.0, 180.0, 220.0] {
        audio.extend(tone(freq, CHUNK));
    }

    let stable = batch("vocal_stability").score_recording(&audio);
    let content = batch("content_focus").score_recording(&audio);

    assert!(stable.speech_detected && content.speech_detected);
    assert_eq!(stable.raw_features, content.raw_features);
    assert_eq!(stable.clipped_features.silence_ratio, 0.0);
    assert_eq!(stable.clipped_features.pitch_std, 25.0);
    assert!((stable.confidence - 10.0).abs() < 1e-9);
    assert!((content.confidence - 90.0).abs() < 1e-9);
}

#[test]
fn test_background_noise_does_not_shift_features() {
    let clean = alternating(6);
    let noisy: Vec<f32> = clean
        .iter()
        .zip(noise(clean.len(), 1e-3, 7))
        .map(|(s, n)| s + n)
        .collect();

    let a = batch("balanced").score_recording(&clean);
    let b = batch("balanced").score_recording(&noisy);
    assert!(b.speech_detected);
    assert_eq!(a.raw_features.silence_ratio, b.raw_features.silence_ratio);
    assert_eq!(a.raw_features.pause_freq, b.raw_features.pause_freq);
    assert_eq!(a.raw_features.speech_rate, b.raw_features.speech_rate);
    assert!((a.confidence - b.confidence).abs() < 1e-6);
}

#[test]
fn test_trailing_partial_chunk_is_ignored() {
    let mut audio = alternating(6);
    let full = batch("balanced").score_recording(&audio);
    audio.extend(tone(200.0, CHUNK / 2));
    let padded = batch("balanced").score_recording(&audio);
    assert_eq!(full.raw_features, padded.raw_features);
    assert!(padded.audio_duration > full.audio_duration);
}

#[test]
fn test_streaming_gate_and_profile_switch() {
    let (mut producer, consumer) = chunk_queue(Some(256));
    let engine = ConfidenceEngine::streaming(ProfileRegistry::builtin(), "balanced").unwrap();
    let (mut live, commands) = LiveAnalyzer::new(engine, consumer);

    for chunk in partition(&alternating(30), CHUNK) {
        assert!(producer.push(chunk.samples));
    }

    let mut warming = 0;
    let mut scores = Vec::new();
    live.pump(&mut |u| match u {
        StreamUpdate::WarmingUp(_) => warming += 1,
        StreamUpdate::Score { result, .. } => scores.push(result),
        other => panic!("unexpected {other:?}"),
    });

    // Ten calibration chunks plus a full window before the first score.
    assert!(warming >= 20, "{warming}");
    assert!(!scores.is_empty());
    for r in &scores {
        assert!(r.speech_detected);
        assert!((0.0..=100.0).contains(&r.confidence));
        assert!(r.clipped_features.silence_ratio <= 0.8);
    }
    let features_before = scores[scores.len() - 1].raw_features;
    let pauses_before = live.engine().session().aggregator().pauses().len();

    commands
        .send(StreamCommand::SwitchProfile("vocal_stability".into()))
        .unwrap();
    for chunk in partition(&alternating(1), CHUNK) {
        producer.push(chunk.samples);
    }

    let mut after = Vec::new();
    live.pump(&mut |u| after.push(u));
    assert_eq!(
        after[0],
        StreamUpdate::ProfileChanged("vocal_stability".into())
    );
    assert!(live.engine().session().aggregator().pauses().len() >= pauses_before);
    let last = after
        .iter()
        .rev()
        .find_map(|u| match u {
            StreamUpdate::Score { result, .. } => Some(result),
            _ => None,
        })
        .unwrap();
    assert_eq!(last.profile, "vocal_stability");
    assert_eq!(last.raw_features.silence_ratio, features_before.silence_ratio);
}
