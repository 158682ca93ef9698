//! Local fallback score
//!
//! Used when a score request gets no terminal response in time. The
//! coefficients are a placeholder policy, configurable under `[scoring]`.

use super::state::ScoreBreakdown;

#[derive(Debug, Clone, PartialEq)]
pub struct FallbackScoring {
    pub base: f64,
    pub per_question: f64,
    pub per_tier: f64,
    /// Questions beyond this count add nothing
    pub question_cap: u32,
}

impl Default for FallbackScoring {
    fn default() -> Self {
        let section = hirewire_common::config::ScoringSection::default();
        Self::from(&section)
    }
}

impl From<&hirewire_common::config::ScoringSection> for FallbackScoring {
    fn from(section: &hirewire_common::config::ScoringSection) -> Self {
        Self {
            base: section.base,
            per_question: section.per_question,
            per_tier: section.per_tier,
            question_cap: section.question_cap,
        }
    }
}

impl FallbackScoring {
    /// Deterministic score (0-100, whole number) and matching breakdown
    pub fn score(&self, questions_asked: u32, difficulty_tier: u8) -> (f64, ScoreBreakdown) {
        let questions = questions_asked.min(self.question_cap) as f64;
        let tier_bonus = difficulty_tier.saturating_sub(1) as f64;
        let score = (self.base + self.per_question * questions + self.per_tier * tier_bonus)
            .clamp(0.0, 100.0)
            .round();
        let fraction = score / 100.0;
        (score, ScoreBreakdown::new(fraction, fraction, fraction))
    }
}
