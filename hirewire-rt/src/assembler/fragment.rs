//! Prompt context fragments
//!
//! Fragments are produced fresh by every assembly call and carry no identity
//! across calls.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AnswerSummary, TierAction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextFragment {
    /// Baseline interviewer directive; never trimmed
    System { id: String, directive: String },
    /// Descriptive summary of recent answers
    AnswerSummary { id: String, summary: AnswerSummary },
    /// Required skills not yet demonstrated
    Gap { id: String, skills: Vec<String> },
    /// Target difficulty for the next question; never trimmed
    Difficulty {
        id: String,
        tier: u8,
        action: TierAction,
        rationale: String,
    },
}

impl ContextFragment {
    pub fn system(directive: impl Into<String>) -> Self {
        ContextFragment::System {
            id: fresh_id(),
            directive: directive.into(),
        }
    }

    pub fn answer_summary(summary: AnswerSummary) -> Self {
        ContextFragment::AnswerSummary {
            id: fresh_id(),
            summary,
        }
    }

    pub fn gap(skills: Vec<String>) -> Self {
        ContextFragment::Gap {
            id: fresh_id(),
            skills,
        }
    }

    pub fn difficulty(tier: u8, action: TierAction, rationale: impl Into<String>) -> Self {
        ContextFragment::Difficulty {
            id: fresh_id(),
            tier,
            action,
            rationale: rationale.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ContextFragment::System { id, .. }
            | ContextFragment::AnswerSummary { id, .. }
            | ContextFragment::Gap { id, .. }
            | ContextFragment::Difficulty { id, .. } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ContextFragment::System { .. } => "system",
            ContextFragment::AnswerSummary { .. } => "answer_summary",
            ContextFragment::Gap { .. } => "gap",
            ContextFragment::Difficulty { .. } => "difficulty",
        }
    }

    /// Fragments that survive budget trimming
    pub fn is_essential(&self) -> bool {
        matches!(
            self,
            ContextFragment::System { .. } | ContextFragment::Difficulty { .. }
        )
    }
}

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// Coarse token estimate: serialized characters / 4, rounded up
///
/// A proxy for budgeting, not a tokenizer.
pub fn estimate_tokens(fragments: &[ContextFragment]) -> usize {
    let chars = serde_json::to_string(fragments)
        .map(|s| s.chars().count())
        .unwrap_or(0);
    chars.div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_fresh_per_fragment() {
        let a = ContextFragment::system("x");
        let b = ContextFragment::system("x");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn estimate_grows_with_content() {
        let small = vec![ContextFragment::gap(vec!["rust".to_string()])];
        let large = vec![ContextFragment::gap(
            (0..50).map(|i| format!("skill-{}", i)).collect(),
        )];
        assert!(estimate_tokens(&large) > estimate_tokens(&small));
        assert_eq!(estimate_tokens(&[]), 1);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(ContextFragment::gap(vec!["sql".to_string()])).unwrap();
        assert_eq!(json["kind"], "gap");
        assert_eq!(json["skills"][0], "sql");
    }
}
