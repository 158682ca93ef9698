//! Control channel wire format
//!
//! Inbound messages are `{ "type", "timestamp", "payload" }` objects.
//! Anything that is not a JSON object with a string `type` is dropped.

use serde::Serialize;
use serde_json::Value;

use crate::assembler::ContextBundle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEventKind {
    TurnStart,
    TurnEnd,
    QuestionReady,
    AiState,
    InterviewGreet,
    InterviewScore,
    InterviewDone,
    Error,
    LatencyPing,
    /// Unrecognized type, kept for forward compatibility
    Other(String),
}

impl ControlEventKind {
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "turn.start" => ControlEventKind::TurnStart,
            "turn.end" => ControlEventKind::TurnEnd,
            "question.ready" => ControlEventKind::QuestionReady,
            "ai.state" => ControlEventKind::AiState,
            "interview.greet" => ControlEventKind::InterviewGreet,
            "interview.score" => ControlEventKind::InterviewScore,
            "interview.done" => ControlEventKind::InterviewDone,
            "error" => ControlEventKind::Error,
            "latency.ping" => ControlEventKind::LatencyPing,
            other => ControlEventKind::Other(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            ControlEventKind::TurnStart => "turn.start",
            ControlEventKind::TurnEnd => "turn.end",
            ControlEventKind::QuestionReady => "question.ready",
            ControlEventKind::AiState => "ai.state",
            ControlEventKind::InterviewGreet => "interview.greet",
            ControlEventKind::InterviewScore => "interview.score",
            ControlEventKind::InterviewDone => "interview.done",
            ControlEventKind::Error => "error",
            ControlEventKind::LatencyPing => "latency.ping",
            ControlEventKind::Other(kind) => kind,
        }
    }

    /// Events that end the interview
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ControlEventKind::InterviewScore | ControlEventKind::InterviewDone
        )
    }
}

/// One inbound control event
#[derive(Debug, Clone, PartialEq)]
pub struct ControlEvent {
    pub kind: ControlEventKind,
    /// Sender timestamp (epoch ms), if provided
    pub timestamp: Option<i64>,
    pub payload: Value,
    /// Local receive time (epoch ms)
    pub received_at_ms: i64,
}

impl ControlEvent {
    pub fn new(kind: ControlEventKind, payload: Value) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            kind,
            timestamp: Some(now),
            payload,
            received_at_ms: now,
        }
    }

    /// Parse a raw channel message; None if malformed
    pub fn parse(raw: &str, received_at_ms: i64) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        let object = value.as_object()?;
        let kind = object.get("type")?.as_str()?;
        if kind.is_empty() {
            return None;
        }

        let payload = match object.get("payload") {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(payload @ Value::Object(_)) => payload.clone(),
            Some(_) => return None,
        };

        Some(Self {
            kind: ControlEventKind::from_wire(kind),
            timestamp: object.get("timestamp").and_then(Value::as_i64),
            payload,
            received_at_ms,
        })
    }

    pub fn payload_f64(&self, key: &str) -> Option<f64> {
        self.payload.get(key).and_then(Value::as_f64)
    }

    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    pub fn payload_bool(&self, key: &str) -> Option<bool> {
        self.payload.get(key).and_then(Value::as_bool)
    }
}

/// Messages the session sends on the control channel
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Ask the interviewer to greet the candidate
    #[serde(rename = "interview.greet.request")]
    GreetingTrigger { timestamp: i64 },

    /// Ask the interviewer for the final score
    #[serde(rename = "interview.score.request")]
    ScoreRequest {
        timestamp: i64,
        #[serde(rename = "questionCount")]
        question_count: u32,
    },

    /// Context for the next question
    #[serde(rename = "context.update")]
    ContextUpdate {
        timestamp: i64,
        payload: ContextBundle,
    },
}

impl OutboundMessage {
    pub fn greeting() -> Self {
        OutboundMessage::GreetingTrigger {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn score_request(question_count: u32) -> Self {
        OutboundMessage::ScoreRequest {
            timestamp: chrono::Utc::now().timestamp_millis(),
            question_count,
        }
    }

    pub fn context_update(bundle: ContextBundle) -> Self {
        OutboundMessage::ContextUpdate {
            timestamp: chrono::Utc::now().timestamp_millis(),
            payload: bundle,
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
