//! Per-answer records, session summaries, and their JSON persistence.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::collab::{AnswerEvaluator, Evaluation, Transcriber, Transcript};
use crate::engine::ConfidenceResult;
use crate::scoring::Rating;

/// One scored interview answer.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Local>,
    pub question_number: u32,
    pub question: String,
    pub profile: String,
    pub confidence: ConfidenceResult,
    pub rating: Rating,
    pub transcript: Option<Transcript>,
    pub evaluation: Option<Evaluation>,
}

/// Question being answered.
#[derive(Debug, Clone, Copy)]
pub struct Question<'a> {
    pub number: u32,
    pub text: &'a str,
    pub reference: Option<&'a str>,
}

/// Build a record for a scored answer, consulting the optional
/// collaborators. Their failures land in the `error` fields; the
/// confidence result is never touched.
pub fn assemble_answer(
    question: Question<'_>,
    audio: &[f32],
    sample_rate: u32,
    result: ConfidenceResult,
    transcriber: Option<&dyn Transcriber>,
    evaluator: Option<&dyn AnswerEvaluator>,
) -> AnswerRecord {
    let transcript = transcriber
        .filter(|t| t.is_available())
        .map(|t| match t.transcribe(audio, sample_rate) {
            Ok(t) => t,
            Err(e) => {
                warn!("Transcription failed: {:#}", e);
                Transcript {
                    error: Some(format!("{e:#}")),
                    ..Transcript::default()
                }
            }
        });

    let answer_text = transcript
        .as_ref()
        .filter(|t| t.error.is_none() && !t.text.trim().is_empty())
        .map(|t| t.text.as_str());

    let evaluation = match (evaluator.filter(|e| e.is_available()), answer_text) {
        (Some(ev), Some(text)) => Some(match ev.evaluate(question.text, text, question.reference) {
            Ok(e) => e,
            Err(e) => {
                warn!("Answer evaluation failed: {:#}", e);
                Evaluation {
                    error: Some(format!("{e:#}")),
                    ..Evaluation::default()
                }
            }
        }),
        _ => None,
    };

    AnswerRecord {
        id: Uuid::new_v4(),
        timestamp: Local::now(),
        question_number: question.number,
        question: question.text.to_string(),
        profile: result.profile.clone(),
        rating: Rating::answer(result.confidence),
        confidence: result,
        transcript,
        evaluation,
    }
}

/// Aggregate over all answers in one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub timestamp: DateTime<Local>,
    pub answers: usize,
    pub average_confidence: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
    pub rating: Rating,
    pub scores: Vec<f64>,
    pub records: Vec<AnswerRecord>,
}

impl SessionSummary {
    /// `None` for an empty session.
    pub fn from_records(records: Vec<AnswerRecord>) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let scores: Vec<f64> = records.iter().map(|r| r.confidence.confidence).collect();
        let average = scores.iter().sum::<f64>() / scores.len() as f64;
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            id: Uuid::new_v4(),
            timestamp: Local::now(),
            answers: records.len(),
            average_confidence: average,
            min_confidence: min,
            max_confidence: max,
            rating: Rating::answer(average),
            scores,
            records,
        })
    }
}

/// Destination for finished records.
pub trait ResultSink {
    fn save_answer(&mut self, record: &AnswerRecord) -> anyhow::Result<PathBuf>;
    fn save_summary(&mut self, summary: &SessionSummary) -> anyhow::Result<PathBuf>;
}

/// Writes pretty-printed JSON files into a directory.
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write<T: Serialize>(&self, name: String, value: &T) -> anyhow::Result<PathBuf> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value).context("Failed to serialize record")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Result saved");
        Ok(path)
    }
}

impl ResultSink for JsonFileSink {
    fn save_answer(&mut self, record: &AnswerRecord) -> anyhow::Result<PathBuf> {
        let name = format!(
            "answer_q{}_{}.json",
            record.question_number,
            record.timestamp.format("%Y%m%d_%H%M%S")
        );
        self.write(name, record)
    }

    fn save_summary(&mut self, summary: &SessionSummary) -> anyhow::Result<PathBuf> {
        let name = format!("session_{}.json", summary.timestamp.format("%Y%m%d_%H%M%S"));
        self.write(name, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Mode;

    struct EchoTranscriber;

    impl Transcriber for EchoTranscriber {
        fn transcribe(&self, audio: &[f32], _sample_rate: u32) -> anyhow::Result<Transcript> {
            Ok(Transcript {
                text: format!("{} samples", audio.len()),
                confidence: 0.9,
                error: None,
            })
        }
    }

    struct FailingTranscriber;

    impl Transcriber for FailingTranscriber {
        fn transcribe(&self, _audio: &[f32], _sample_rate: u32) -> anyhow::Result<Transcript> {
            anyhow::bail!("service unreachable")
        }
    }

    struct StrictEvaluator;

    impl AnswerEvaluator for StrictEvaluator {
        fn evaluate(
            &self,
            _question: &str,
            answer: &str,
            reference: Option<&str>,
        ) -> anyhow::Result<Evaluation> {
            Ok(Evaluation {
                is_correct: Some(reference == Some(answer)),
                score: Some(50.0),
                ..Evaluation::default()
            })
        }
    }

    fn result(confidence: f64) -> ConfidenceResult {
        ConfidenceResult {
            confidence,
            ..ConfidenceResult::no_signal(Mode::Batch, "balanced", 3.0)
        }
    }

    const QUESTION: Question<'static> = Question {
        number: 2,
        text: "Tell me about yourself",
        reference: Some("4 samples"),
    };

    #[test]
    fn test_assemble_without_collaborators() {
        let rec = assemble_answer(QUESTION, &[0.0; 4], 16_000, result(72.0), None, None);
        assert_eq!(rec.question_number, 2);
        assert_eq!(rec.profile, "balanced");
        assert_eq!(rec.rating, Rating::VeryGood);
        assert!(rec.transcript.is_none());
        assert!(rec.evaluation.is_none());
    }

    #[test]
    fn test_assemble_with_collaborators() {
        let rec = assemble_answer(
            QUESTION,
            &[0.0; 4],
            16_000,
            result(40.0),
            Some(&EchoTranscriber as &dyn Transcriber),
            Some(&StrictEvaluator as &dyn AnswerEvaluator),
        );
        assert_eq!(rec.transcript.as_ref().unwrap().text, "4 samples");
        assert_eq!(rec.evaluation.as_ref().unwrap().is_correct, Some(true));
        assert_eq!(rec.confidence.confidence, 40.0);
    }

    #[test]
    fn test_collaborator_failure_is_recorded() {
        let rec = assemble_answer(
            QUESTION,
            &[0.0; 4],
            16_000,
            result(64.0),
            Some(&FailingTranscriber as &dyn Transcriber),
            Some(&StrictEvaluator as &dyn AnswerEvaluator),
        );
        let t = rec.transcript.unwrap();
        assert!(t.error.unwrap().contains("unreachable"));
        // No usable transcript, nothing to evaluate.
        assert!(rec.evaluation.is_none());
        assert_eq!(rec.confidence.confidence, 64.0);
    }

    #[test]
    fn test_summary_stats() {
        assert!(SessionSummary::from_records(Vec::new()).is_none());
        let records = [60.0, 90.0, 75.0]
            .into_iter()
            .enumerate()
            .map(|(i, c)| {
                let q = Question {
                    number: i as u32 + 1,
                    ..QUESTION
                };
                assemble_answer(q, &[], 16_000, result(c), None, None)
            })
            .collect();
        let s = SessionSummary::from_records(records).unwrap();
        assert_eq!(s.answers, 3);
        assert_eq!(s.min_confidence, 60.0);
        assert_eq!(s.max_confidence, 90.0);
        assert!((s.average_confidence - 75.0).abs() < 1e-12);
        assert_eq!(s.rating, Rating::VeryGood);
    }

    #[test]
    fn test_json_sink_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonFileSink::new(dir.path().join("out")).unwrap();
        let rec = assemble_answer(QUESTION, &[], 16_000, result(55.0), None, None);
        let path = sink.save_answer(&rec).unwrap();
        assert_eq!(path.parent(), Some(sink.dir()));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["question_number"], 2);
        assert_eq!(json["confidence"]["profile"], "balanced");
        assert_eq!(json["rating"], "good");

        let summary = SessionSummary::from_records(vec![rec]).unwrap();
        let path = sink.save_summary(&summary).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("session_"));
    }
}
