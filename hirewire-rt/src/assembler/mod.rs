//! Adaptive questioning context assembler
//!
//! Turns the answer-evaluation history and a job's required skills into:
//! - a difficulty tier for the next question (two-answer window)
//! - the set of required skills not yet demonstrated
//! - a token-budgeted bundle of prompt fragments
//!
//! Every call is stateless; callers persist whatever they need.

mod evaluation;
mod fragment;

pub use evaluation::{score_answer, AnswerEvaluation, EvaluationLog};
pub use fragment::{estimate_tokens, ContextFragment};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Lowest difficulty tier
pub const MIN_TIER: u8 = 1;
/// Highest difficulty tier
pub const MAX_TIER: u8 = 5;
/// Tier used before any history exists
pub const DEFAULT_TIER: u8 = 3;

/// Number of recent answers summarised
const SUMMARY_WINDOW: usize = 3;

const SYSTEM_DIRECTIVE: &str = "You are conducting a structured job interview. \
Ask exactly one question at a time, wait for the candidate to finish, \
and keep questions relevant to the role's required skills.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierAction {
    Escalate,
    Demote,
    Retain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyDecision {
    pub tier: u8,
    pub action: TierAction,
    pub rationale: String,
}

/// Descriptive summary of the most recent answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSummary {
    pub answers_considered: usize,
    pub avg_clarity: f64,
    pub avg_correctness: f64,
    pub avg_depth: f64,
    /// Union of the answers' tokens, first-seen order
    pub tokens: Vec<String>,
}

/// What to do when the full fragment set exceeds the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimPolicy {
    /// Drop summary and gap fragments, keep system and difficulty
    #[default]
    DropOptional,
    /// Never trim; the caller accepts an over-budget bundle
    KeepAll,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextSettings {
    pub escalate_threshold: f64,
    pub demote_threshold: f64,
    /// Minimum correctness for an answer's tokens to count as demonstrated
    pub coverage_threshold: f64,
    pub max_tokens: usize,
    pub trim_policy: TrimPolicy,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            escalate_threshold: 0.7,
            demote_threshold: 0.4,
            coverage_threshold: 0.6,
            max_tokens: 800,
            trim_policy: TrimPolicy::DropOptional,
        }
    }
}

/// Result of one assembly call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextBundle {
    pub difficulty: DifficultyDecision,
    pub missing_skills: Vec<String>,
    pub fragments: Vec<ContextFragment>,
    pub estimated_tokens: usize,
    /// True when optional fragments were dropped to fit the budget
    pub trimmed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    settings: ContextSettings,
}

impl ContextAssembler {
    pub fn new(settings: ContextSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    /// Decide the next tier from the two most recent answers
    pub fn compute_difficulty_tier(
        &self,
        answers: &[AnswerEvaluation],
        previous_tier: u8,
    ) -> DifficultyDecision {
        let previous = previous_tier.clamp(MIN_TIER, MAX_TIER);

        if answers.len() < 2 {
            return DifficultyDecision {
                tier: previous,
                action: TierAction::Retain,
                rationale: format!(
                    "insufficient history ({} answer(s)); retaining tier {}",
                    answers.len(),
                    previous
                ),
            };
        }

        let last = score_answer(&answers[answers.len() - 1]);
        let before = score_answer(&answers[answers.len() - 2]);

        if last >= self.settings.escalate_threshold && before >= self.settings.escalate_threshold
        {
            let tier = (previous + 1).min(MAX_TIER);
            DifficultyDecision {
                tier,
                action: TierAction::Escalate,
                rationale: format!(
                    "escalate: last two scores {:.2} and {:.2} >= {:.2}",
                    before, last, self.settings.escalate_threshold
                ),
            }
        } else if last <= self.settings.demote_threshold
            && before <= self.settings.demote_threshold
        {
            let tier = previous.saturating_sub(1).max(MIN_TIER);
            DifficultyDecision {
                tier,
                action: TierAction::Demote,
                rationale: format!(
                    "demote: last two scores {:.2} and {:.2} <= {:.2}",
                    before, last, self.settings.demote_threshold
                ),
            }
        } else {
            DifficultyDecision {
                tier: previous,
                action: TierAction::Retain,
                rationale: format!(
                    "retain: last two scores {:.2} and {:.2} are mixed",
                    before, last
                ),
            }
        }
    }

    /// Required skills not demonstrated by any sufficiently correct answer
    ///
    /// Output follows the order of `required`; duplicates collapse.
    pub fn detect_skill_gaps(
        &self,
        answers: &[AnswerEvaluation],
        required: &[String],
    ) -> Vec<String> {
        let covered: HashSet<String> = answers
            .iter()
            .filter(|a| a.correctness >= self.settings.coverage_threshold)
            .flat_map(|a| a.tokens.iter().map(|t| normalize_skill(t)))
            .filter(|t| !t.is_empty())
            .collect();

        let mut seen = HashSet::new();
        required
            .iter()
            .filter(|skill| {
                let key = normalize_skill(skill);
                !key.is_empty() && !covered.contains(&key) && seen.insert(key)
            })
            .cloned()
            .collect()
    }

    /// Build the fragment bundle for the next question
    pub fn assemble(
        &self,
        answers: &[AnswerEvaluation],
        required: &[String],
        previous_tier: u8,
        max_tokens: Option<usize>,
    ) -> ContextBundle {
        let budget = max_tokens.unwrap_or(self.settings.max_tokens);
        let difficulty = self.compute_difficulty_tier(answers, previous_tier);
        let missing_skills = self.detect_skill_gaps(answers, required);

        let mut fragments = vec![ContextFragment::system(SYSTEM_DIRECTIVE)];
        if let Some(summary) = summarize_answers(answers) {
            fragments.push(ContextFragment::answer_summary(summary));
        }
        if !missing_skills.is_empty() {
            fragments.push(ContextFragment::gap(missing_skills.clone()));
        }
        fragments.push(ContextFragment::difficulty(
            difficulty.tier,
            difficulty.action,
            difficulty.rationale.clone(),
        ));

        let mut estimated_tokens = estimate_tokens(&fragments);
        let mut trimmed = false;
        if estimated_tokens > budget && self.settings.trim_policy == TrimPolicy::DropOptional {
            fragments.retain(ContextFragment::is_essential);
            let reduced = estimate_tokens(&fragments);
            debug!(
                budget = budget,
                before = estimated_tokens,
                after = reduced,
                "Context over budget; dropped summary and gap fragments"
            );
            estimated_tokens = reduced;
            trimmed = true;
        }

        ContextBundle {
            difficulty,
            missing_skills,
            fragments,
            estimated_tokens,
            trimmed,
        }
    }
}

/// Difficulty decision with default thresholds
pub fn compute_difficulty_tier(
    answers: &[AnswerEvaluation],
    previous_tier: u8,
) -> DifficultyDecision {
    ContextAssembler::default().compute_difficulty_tier(answers, previous_tier)
}

/// Skill gaps with the default coverage threshold
pub fn detect_skill_gaps(answers: &[AnswerEvaluation], required: &[String]) -> Vec<String> {
    ContextAssembler::default().detect_skill_gaps(answers, required)
}

/// Summarise the last three answers; None without history
pub fn summarize_answers(answers: &[AnswerEvaluation]) -> Option<AnswerSummary> {
    if answers.is_empty() {
        return None;
    }
    let window = &answers[answers.len().saturating_sub(SUMMARY_WINDOW)..];
    let n = window.len() as f64;

    let mut seen = HashSet::new();
    let tokens = window
        .iter()
        .flat_map(|a| a.tokens.iter())
        .filter(|t| seen.insert(normalize_skill(t)))
        .cloned()
        .collect();

    Some(AnswerSummary {
        answers_considered: window.len(),
        avg_clarity: window.iter().map(|a| a.clarity).sum::<f64>() / n,
        avg_correctness: window.iter().map(|a| a.correctness).sum::<f64>() / n,
        avg_depth: window.iter().map(|a| a.depth).sum::<f64>() / n,
        tokens,
    })
}

/// Lowercase and collapse internal whitespace
pub fn normalize_skill(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
