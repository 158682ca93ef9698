//! Transport and interview phase enums
//!
//! The two phases are independent: transport tracks connection establishment,
//! interview tracks logical progress through the conversation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection-establishment lifecycle of a realtime session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportPhase {
    /// No session started yet
    #[default]
    Idle,
    /// Fetching the ephemeral credential
    Token,
    /// Negotiating (or re-negotiating after an ICE restart)
    Connecting,
    /// Media and control channel established
    Connected,
    /// Connect deadline elapsed and the degraded path is enabled
    Fallback,
    /// Unrecoverable failure for this attempt
    Error,
}

impl TransportPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportPhase::Idle => "idle",
            TransportPhase::Token => "token",
            TransportPhase::Connecting => "connecting",
            TransportPhase::Connected => "connected",
            TransportPhase::Fallback => "fallback",
            TransportPhase::Error => "error",
        }
    }
}

impl fmt::Display for TransportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical interview progress
///
/// Variants are declared in progression order; the derived `Ord` is the
/// forward-only ordering used to reject regressions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum InterviewPhase {
    #[default]
    PreStart,
    Intro,
    Conducting,
    Scoring,
    Completed,
}

impl InterviewPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewPhase::PreStart => "pre_start",
            InterviewPhase::Intro => "intro",
            InterviewPhase::Conducting => "conducting",
            InterviewPhase::Scoring => "scoring",
            InterviewPhase::Completed => "completed",
        }
    }

    /// True when moving from `self` to `next` does not go backwards
    pub fn can_advance_to(&self, next: InterviewPhase) -> bool {
        next >= *self
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InterviewPhase::Completed)
    }
}

impl fmt::Display for InterviewPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interview_phase_order_is_forward_only() {
        let order = [
            InterviewPhase::PreStart,
            InterviewPhase::Intro,
            InterviewPhase::Conducting,
            InterviewPhase::Scoring,
            InterviewPhase::Completed,
        ];
        for pair in order.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].can_advance_to(pair[1]));
            assert!(!pair[1].can_advance_to(pair[0]));
        }
    }

    #[test]
    fn phases_serialize_snake_case() {
        let json = serde_json::to_string(&InterviewPhase::PreStart).unwrap();
        assert_eq!(json, "\"pre_start\"");
        let json = serde_json::to_string(&TransportPhase::Connected).unwrap();
        assert_eq!(json, "\"connected\"");
    }
}
