//! Pure control-event transition function
//!
//! `transition(prev, event)` returns the partial update one control event
//! produces. It never proposes an interview phase behind `prev`, so applying
//! its output can only move the interview forward.

use hirewire_common::InterviewPhase;

use super::control::{ControlEvent, ControlEventKind};
use super::state::{ScoreBreakdown, SessionState, StateUpdate};

/// Fallback user-visible message for `error` events without one
const DEFAULT_ERROR_MESSAGE: &str = "The interview service reported an error";

/// Question indices above this are treated as missing
const MAX_QUESTION_INDEX: f64 = 10_000.0;

pub fn transition(prev: &SessionState, event: &ControlEvent) -> StateUpdate {
    let mut update = StateUpdate::default();

    match &event.kind {
        ControlEventKind::TurnStart => update.turn_active = Some(true),
        ControlEventKind::TurnEnd => update.turn_active = Some(false),

        ControlEventKind::QuestionReady => {
            let index = event
                .payload_f64("index")
                .or_else(|| event.payload_f64("questionIndex"))
                .filter(|i| (0.0..=MAX_QUESTION_INDEX).contains(i))
                .map(|i| i as u32)
                .unwrap_or_else(|| prev.current_question_index.saturating_add(1));
            update.current_question_index = Some(index);
            // The first question ends the intro; later questions leave the phase alone
            if prev.interview_phase == InterviewPhase::Intro {
                update.interview_phase = Some(InterviewPhase::Conducting);
            }
        }

        ControlEventKind::AiState => {
            update.ai_speaking = event
                .payload_bool("speaking")
                .or_else(|| event.payload_str("state").map(|s| s == "speaking"));
        }

        ControlEventKind::InterviewGreet => {
            if prev.interview_phase < InterviewPhase::Intro {
                update.interview_phase = Some(InterviewPhase::Intro);
            }
        }

        ControlEventKind::InterviewScore => {
            if let Some(score) = event.payload_f64("score") {
                update.final_score = Some(score.clamp(0.0, 100.0));
            }
            update.final_score_breakdown = parse_breakdown(event);
            update.fallback_score = Some(false);
            update.interview_phase = Some(InterviewPhase::Completed);
        }

        ControlEventKind::InterviewDone => {
            update.interview_phase = Some(InterviewPhase::Completed);
        }

        ControlEventKind::Error => {
            let message = event
                .payload_str("message")
                .or_else(|| event.payload_str("error"))
                .unwrap_or(DEFAULT_ERROR_MESSAGE);
            update.error = Some(Some(message.to_string()));
        }

        ControlEventKind::LatencyPing => {
            if let Some(sent_at) = event.payload_f64("sentAt") {
                let rtt = event.received_at_ms as f64 - sent_at;
                if rtt >= 0.0 {
                    update.round_trip_ms = Some(rtt);
                }
            }
        }

        ControlEventKind::Other(_) => {}
    }

    update
}

/// Breakdown accepted either in [0, 1] or as percentages
fn parse_breakdown(event: &ControlEvent) -> Option<ScoreBreakdown> {
    let breakdown = event.payload.get("breakdown")?;
    let read = |key: &str| -> Option<f64> {
        let value = breakdown.get(key)?.as_f64()?;
        Some(if value > 1.0 { value / 100.0 } else { value })
    };
    Some(ScoreBreakdown::new(
        read("clarity")?,
        read("correctness")?,
        read("depth")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(kind: ControlEventKind, payload: serde_json::Value) -> ControlEvent {
        ControlEvent::new(kind, payload)
    }

    fn state_in(phase: InterviewPhase) -> SessionState {
        SessionState {
            interview_phase: phase,
            ..SessionState::default()
        }
    }

    #[test]
    fn turn_events_toggle_turn_active() {
        let prev = SessionState::default();
        assert_eq!(
            transition(&prev, &event(ControlEventKind::TurnStart, json!({}))).turn_active,
            Some(true)
        );
        assert_eq!(
            transition(&prev, &event(ControlEventKind::TurnEnd, json!({}))).turn_active,
            Some(false)
        );
    }

    #[test]
    fn first_question_ends_intro() {
        let update = transition(
            &state_in(InterviewPhase::Intro),
            &event(ControlEventKind::QuestionReady, json!({"index": 1})),
        );
        assert_eq!(update.interview_phase, Some(InterviewPhase::Conducting));
        assert_eq!(update.current_question_index, Some(1));
    }

    #[test]
    fn later_questions_leave_phase_key_absent() {
        let update = transition(
            &state_in(InterviewPhase::Conducting),
            &event(ControlEventKind::QuestionReady, json!({"index": 3})),
        );
        assert_eq!(update.interview_phase, None);
        assert_eq!(update.current_question_index, Some(3));
    }

    #[test]
    fn question_without_index_increments() {
        let prev = SessionState {
            current_question_index: 4,
            interview_phase: InterviewPhase::Conducting,
            ..SessionState::default()
        };
        let update = transition(&prev, &event(ControlEventKind::QuestionReady, json!({})));
        assert_eq!(update.current_question_index, Some(5));
    }

    #[test]
    fn out_of_range_question_index_is_ignored() {
        let prev = SessionState {
            current_question_index: 2,
            interview_phase: InterviewPhase::Conducting,
            ..SessionState::default()
        };
        let huge = transition(
            &prev,
            &event(ControlEventKind::QuestionReady, json!({"index": 1e12})),
        );
        assert_eq!(huge.current_question_index, Some(3));

        let saturated = SessionState {
            current_question_index: u32::MAX,
            ..prev
        };
        let next = transition(&saturated, &event(ControlEventKind::QuestionReady, json!({})));
        assert_eq!(next.current_question_index, Some(u32::MAX));
    }

    #[test]
    fn ai_state_reads_flag_or_state_string() {
        let prev = SessionState::default();
        let on = transition(&prev, &event(ControlEventKind::AiState, json!({"speaking": true})));
        let off = transition(&prev, &event(ControlEventKind::AiState, json!({"state": "listening"})));
        let none = transition(&prev, &event(ControlEventKind::AiState, json!({})));
        assert_eq!(on.ai_speaking, Some(true));
        assert_eq!(off.ai_speaking, Some(false));
        assert!(none.is_empty());
    }

    #[test]
    fn greet_enters_intro_only_from_pre_start() {
        let from_start = transition(
            &state_in(InterviewPhase::PreStart),
            &event(ControlEventKind::InterviewGreet, json!({})),
        );
        assert_eq!(from_start.interview_phase, Some(InterviewPhase::Intro));

        let late = transition(
            &state_in(InterviewPhase::Conducting),
            &event(ControlEventKind::InterviewGreet, json!({})),
        );
        assert_eq!(late.interview_phase, None);
    }

    #[test]
    fn score_event_completes_with_score() {
        let update = transition(
            &state_in(InterviewPhase::Scoring),
            &event(ControlEventKind::InterviewScore, json!({"score": 87})),
        );
        assert_eq!(update.interview_phase, Some(InterviewPhase::Completed));
        assert_eq!(update.final_score, Some(87.0));

        let mut state = state_in(InterviewPhase::Scoring);
        state.apply(update);
        assert_eq!(state.interview_phase, InterviewPhase::Completed);
        assert_eq!(state.final_score, Some(87.0));
    }

    #[test]
    fn score_event_without_number_still_completes() {
        let update = transition(
            &state_in(InterviewPhase::Conducting),
            &event(ControlEventKind::InterviewScore, json!({"score": "n/a"})),
        );
        assert_eq!(update.interview_phase, Some(InterviewPhase::Completed));
        assert_eq!(update.final_score, None);
    }

    #[test]
    fn score_breakdown_accepts_fractions_and_percentages() {
        let update = transition(
            &state_in(InterviewPhase::Scoring),
            &event(
                ControlEventKind::InterviewScore,
                json!({"score": 70, "breakdown": {"clarity": 80, "correctness": 0.6, "depth": 50}}),
            ),
        );
        let breakdown = update.final_score_breakdown.unwrap();
        assert!((breakdown.clarity - 0.8).abs() < 1e-9);
        assert!((breakdown.correctness - 0.6).abs() < 1e-9);
        assert!((breakdown.depth - 0.5).abs() < 1e-9);
    }

    #[test]
    fn done_completes_without_score() {
        let update = transition(
            &state_in(InterviewPhase::Conducting),
            &event(ControlEventKind::InterviewDone, json!({})),
        );
        assert_eq!(update.interview_phase, Some(InterviewPhase::Completed));
        assert!(update.final_score.is_none());
    }

    #[test]
    fn error_sets_message_without_phase_change() {
        let update = transition(
            &state_in(InterviewPhase::Conducting),
            &event(ControlEventKind::Error, json!({"message": "model overloaded"})),
        );
        assert_eq!(update.error, Some(Some("model overloaded".to_string())));
        assert_eq!(update.interview_phase, None);
        assert_eq!(update.transport_phase, None);
    }

    #[test]
    fn latency_ping_measures_round_trip() {
        let mut ping = event(ControlEventKind::LatencyPing, json!({"sentAt": 1_000.0}));
        ping.received_at_ms = 1_120;
        assert_eq!(
            transition(&SessionState::default(), &ping).round_trip_ms,
            Some(120.0)
        );
    }

    #[test]
    fn unknown_events_are_no_ops() {
        let update = transition(
            &SessionState::default(),
            &event(ControlEventKind::Other("x.y".to_string()), json!({"a": 1})),
        );
        assert!(update.is_empty());
    }

    #[test]
    fn no_event_sequence_regresses_phase() {
        let kinds = [
            ControlEventKind::InterviewGreet,
            ControlEventKind::QuestionReady,
            ControlEventKind::TurnStart,
            ControlEventKind::InterviewGreet,
            ControlEventKind::QuestionReady,
            ControlEventKind::Error,
            ControlEventKind::InterviewDone,
            ControlEventKind::InterviewGreet,
            ControlEventKind::QuestionReady,
            ControlEventKind::InterviewScore,
        ];
        // Every rotation of the sequence, applied from every starting phase
        for start in [
            InterviewPhase::PreStart,
            InterviewPhase::Intro,
            InterviewPhase::Conducting,
            InterviewPhase::Scoring,
            InterviewPhase::Completed,
        ] {
            for offset in 0..kinds.len() {
                let mut state = state_in(start);
                for kind in kinds.iter().cycle().skip(offset).take(kinds.len()) {
                    let update = transition(&state, &event(kind.clone(), json!({})));
                    if let Some(next) = update.interview_phase {
                        assert!(next >= state.interview_phase);
                    }
                    let before = state.interview_phase;
                    state.apply(update);
                    assert!(state.interview_phase >= before);
                }
            }
        }
    }
}
