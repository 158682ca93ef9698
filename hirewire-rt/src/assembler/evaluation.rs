//! Answer evaluations and their scalar quality score

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weight of clarity in `score_answer`
pub const CLARITY_WEIGHT: f64 = 0.4;
/// Weight of correctness in `score_answer`
pub const CORRECTNESS_WEIGHT: f64 = 0.4;
/// Weight of depth in `score_answer`
pub const DEPTH_WEIGHT: f64 = 0.2;

/// Evaluation of one candidate answer
///
/// Dimensions are in [0, 1]. Immutable once appended to an `EvaluationLog`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvaluation {
    pub clarity: f64,
    pub correctness: f64,
    pub depth: f64,
    /// Skill tokens mentioned in the answer
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl AnswerEvaluation {
    pub fn new(clarity: f64, correctness: f64, depth: f64) -> Self {
        Self {
            clarity: clarity.clamp(0.0, 1.0),
            correctness: correctness.clamp(0.0, 1.0),
            depth: depth.clamp(0.0, 1.0),
            tokens: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens = tokens.into_iter().map(Into::into).collect();
        self
    }
}

/// Single quality signal for one answer
pub fn score_answer(evaluation: &AnswerEvaluation) -> f64 {
    CLARITY_WEIGHT * evaluation.clarity
        + CORRECTNESS_WEIGHT * evaluation.correctness
        + DEPTH_WEIGHT * evaluation.depth
}

/// Append-only evaluation history, oldest first
///
/// Owned by the caller of the assembler; the session only reads snapshots.
#[derive(Debug, Clone, Default)]
pub struct EvaluationLog {
    entries: Arc<RwLock<Vec<AnswerEvaluation>>>,
}

impl EvaluationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, evaluation: AnswerEvaluation) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(evaluation);
    }

    pub fn snapshot(&self) -> Vec<AnswerEvaluation> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<AnswerEvaluation>> for EvaluationLog {
    fn from(entries: Vec<AnswerEvaluation>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let perfect = AnswerEvaluation::new(1.0, 1.0, 1.0);
        assert!((score_answer(&perfect) - 1.0).abs() < 1e-9);
        assert_eq!(score_answer(&AnswerEvaluation::new(0.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn score_is_monotonic_in_each_dimension() {
        let steps: Vec<f64> = (0..=10).map(|i| i as f64 / 10.0).collect();
        for &fixed in &steps {
            for pair in steps.windows(2) {
                let (lo, hi) = (pair[0], pair[1]);
                assert!(
                    score_answer(&AnswerEvaluation::new(hi, fixed, fixed))
                        > score_answer(&AnswerEvaluation::new(lo, fixed, fixed))
                );
                assert!(
                    score_answer(&AnswerEvaluation::new(fixed, hi, fixed))
                        > score_answer(&AnswerEvaluation::new(fixed, lo, fixed))
                );
                assert!(
                    score_answer(&AnswerEvaluation::new(fixed, fixed, hi))
                        > score_answer(&AnswerEvaluation::new(fixed, fixed, lo))
                );
            }
        }
    }

    #[test]
    fn log_clones_share_entries() {
        let log = EvaluationLog::new();
        let reader = log.clone();
        log.append(AnswerEvaluation::new(0.5, 0.5, 0.5));
        assert_eq!(reader.len(), 1);
        assert!(!reader.is_empty());
    }

    #[test]
    fn deserializes_without_optional_fields() {
        let eval: AnswerEvaluation =
            serde_json::from_str(r#"{"clarity":0.8,"correctness":0.7,"depth":0.6}"#).unwrap();
        assert!(eval.tokens.is_empty());
    }
}
