//! Session state snapshot and partial updates
//!
//! `SessionState` is only mutated through `apply`, which enforces the
//! forward-only interview phase. `StateUpdate` is the partial update produced
//! by the transition function; absent fields mean "unchanged".

use hirewire_common::{InterviewPhase, TransportPhase};
use serde::{Deserialize, Serialize};

use crate::assembler::{ContextFragment, DEFAULT_TIER};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDiagnostics {
    pub ice_state: Option<String>,
    pub connection_state: Option<String>,
    pub round_trip_ms: Option<f64>,
    /// Time from answer application to the first remote audio track
    pub first_audio_frame_ms: Option<f64>,
    /// Rolling average of inbound audio jitter
    pub jitter_avg_ms: Option<f64>,
    pub ice_restarts: u32,
}

/// Per-dimension score, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub clarity: f64,
    pub correctness: f64,
    pub depth: f64,
}

impl ScoreBreakdown {
    pub fn new(clarity: f64, correctness: f64, depth: f64) -> Self {
        Self {
            clarity: clarity.clamp(0.0, 1.0),
            correctness: correctness.clamp(0.0, 1.0),
            depth: depth.clamp(0.0, 1.0),
        }
    }

    /// Same breakdown scaled to whole percentages for display
    pub fn as_percentages(&self) -> ScoreBreakdown {
        ScoreBreakdown {
            clarity: (self.clarity * 100.0).round(),
            correctness: (self.correctness * 100.0).round(),
            depth: (self.depth * 100.0).round(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub transport_phase: TransportPhase,
    pub interview_phase: InterviewPhase,
    pub diagnostics: ConnectionDiagnostics,
    pub turn_active: bool,
    pub ai_speaking: bool,
    pub current_question_index: u32,
    pub difficulty_tier: u8,
    pub missing_skills: Vec<String>,
    pub context_fragments: Vec<ContextFragment>,
    /// 0-100
    pub final_score: Option<f64>,
    pub final_score_breakdown: Option<ScoreBreakdown>,
    /// True when the final score came from the local heuristic
    pub fallback_score: bool,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            transport_phase: TransportPhase::Idle,
            interview_phase: InterviewPhase::PreStart,
            diagnostics: ConnectionDiagnostics::default(),
            turn_active: false,
            ai_speaking: false,
            current_question_index: 0,
            difficulty_tier: DEFAULT_TIER,
            missing_skills: Vec::new(),
            context_fragments: Vec::new(),
            final_score: None,
            final_score_breakdown: None,
            fallback_score: false,
            error: None,
        }
    }
}

/// Partial update to a `SessionState`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub transport_phase: Option<TransportPhase>,
    pub interview_phase: Option<InterviewPhase>,
    pub ice_state: Option<String>,
    pub connection_state: Option<String>,
    pub round_trip_ms: Option<f64>,
    pub first_audio_frame_ms: Option<f64>,
    pub jitter_avg_ms: Option<f64>,
    pub ice_restarts: Option<u32>,
    pub turn_active: Option<bool>,
    pub ai_speaking: Option<bool>,
    pub current_question_index: Option<u32>,
    pub difficulty_tier: Option<u8>,
    pub missing_skills: Option<Vec<String>>,
    pub context_fragments: Option<Vec<ContextFragment>>,
    pub final_score: Option<f64>,
    pub final_score_breakdown: Option<ScoreBreakdown>,
    pub fallback_score: Option<bool>,
    /// `Some(None)` clears the error
    pub error: Option<Option<String>>,
}

impl StateUpdate {
    pub fn is_empty(&self) -> bool {
        *self == StateUpdate::default()
    }

    pub fn transport(phase: TransportPhase) -> Self {
        Self {
            transport_phase: Some(phase),
            ..Self::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            transport_phase: Some(TransportPhase::Error),
            error: Some(Some(message.into())),
            ..Self::default()
        }
    }
}

impl SessionState {
    /// Merge an update; returns true if anything changed
    ///
    /// An interview phase that would move backwards is ignored.
    pub fn apply(&mut self, update: StateUpdate) -> bool {
        let before = self.clone();

        if let Some(phase) = update.transport_phase {
            self.transport_phase = phase;
        }
        if let Some(phase) = update.interview_phase {
            if self.interview_phase.can_advance_to(phase) {
                self.interview_phase = phase;
            } else {
                tracing::debug!(
                    current = %self.interview_phase,
                    requested = %phase,
                    "Ignoring interview phase regression"
                );
            }
        }
        if let Some(state) = update.ice_state {
            self.diagnostics.ice_state = Some(state);
        }
        if let Some(state) = update.connection_state {
            self.diagnostics.connection_state = Some(state);
        }
        if let Some(rtt) = update.round_trip_ms {
            self.diagnostics.round_trip_ms = Some(rtt);
        }
        if let Some(latency) = update.first_audio_frame_ms {
            self.diagnostics.first_audio_frame_ms = Some(latency);
        }
        if let Some(jitter) = update.jitter_avg_ms {
            self.diagnostics.jitter_avg_ms = Some(jitter);
        }
        if let Some(restarts) = update.ice_restarts {
            self.diagnostics.ice_restarts = restarts;
        }
        if let Some(active) = update.turn_active {
            self.turn_active = active;
        }
        if let Some(speaking) = update.ai_speaking {
            self.ai_speaking = speaking;
        }
        if let Some(index) = update.current_question_index {
            self.current_question_index = index;
        }
        if let Some(tier) = update.difficulty_tier {
            self.difficulty_tier = tier;
        }
        if let Some(skills) = update.missing_skills {
            self.missing_skills = skills;
        }
        if let Some(fragments) = update.context_fragments {
            self.context_fragments = fragments;
        }
        if let Some(score) = update.final_score {
            self.final_score = Some(score.clamp(0.0, 100.0));
        }
        if let Some(breakdown) = update.final_score_breakdown {
            self.final_score_breakdown = Some(breakdown);
        }
        if let Some(fallback) = update.fallback_score {
            self.fallback_score = fallback;
        }
        if let Some(error) = update.error {
            self.error = error;
        }

        *self != before
    }

    /// Explicit external reset of interview progress
    ///
    /// The only path that moves `interview_phase` backwards. Transport state
    /// and diagnostics are kept.
    pub fn reset_interview(&mut self) {
        self.interview_phase = InterviewPhase::PreStart;
        self.turn_active = false;
        self.ai_speaking = false;
        self.current_question_index = 0;
        self.difficulty_tier = DEFAULT_TIER;
        self.missing_skills.clear();
        self.context_fragments.clear();
        self.final_score = None;
        self.final_score_breakdown = None;
        self.fallback_score = false;
        self.error = None;
    }

    pub fn is_connected(&self) -> bool {
        self.transport_phase == TransportPhase::Connected
    }
}
