//! Event types for the HireWire session event bus
//!
//! Each interview session owns one `EventBus`; components register typed
//! listeners against that instance rather than a process-global channel.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::phase::{InterviewPhase, TransportPhase};

/// Interview session events
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to a UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InterviewEvent {
    /// Local camera/microphone acquired
    PermissionsReady {
        session_id: Uuid,
        audio: bool,
        video: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Remote AI media stream arrived on the peer connection
    ///
    /// The stream itself is stored on the session context; this event only
    /// announces it.
    RemoteStreamReady {
        session_id: Uuid,
        stream_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Raw control-channel message, parsed or not
    RtcEvent {
        session_id: Uuid,
        raw: String,
        /// False when the message could not be parsed (no state change happened)
        parsed: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transport phase changed
    TransportPhaseChanged {
        session_id: Uuid,
        old_phase: TransportPhase,
        new_phase: TransportPhase,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Interview phase advanced
    InterviewPhaseChanged {
        session_id: Uuid,
        old_phase: InterviewPhase,
        new_phase: InterviewPhase,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Recorder produced a chunk
    ChunkRecorded {
        session_id: Uuid,
        sequence_index: u64,
        bytes: usize,
    },

    /// Upload coordinator stored a block remotely
    ChunkUploaded {
        session_id: Uuid,
        block_id: String,
        sequence_index: u64,
    },

    /// Upload committed
    UploadFinalized {
        session_id: Uuid,
        committed_blocks: usize,
        /// Blocks still pending when the finalize wait window elapsed
        pending_blocks: usize,
    },

    /// Interview reached its terminal phase
    InterviewCompleted {
        session_id: Uuid,
        final_score: Option<f64>,
        /// True when the score came from the local fallback heuristic
        fallback_score: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Content safety filter rewrote a model response
    ContentViolation {
        session_id: Uuid,
        terms: Vec<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl InterviewEvent {
    /// Event name for UI transport
    pub fn event_type(&self) -> &'static str {
        match self {
            InterviewEvent::PermissionsReady { .. } => "interview:permissions_ready",
            InterviewEvent::RemoteStreamReady { .. } => "interview:remote_stream_ready",
            InterviewEvent::RtcEvent { .. } => "interview:rtc_event",
            InterviewEvent::TransportPhaseChanged { .. } => "interview:transport_phase",
            InterviewEvent::InterviewPhaseChanged { .. } => "interview:phase",
            InterviewEvent::ChunkRecorded { .. } => "interview:chunk_recorded",
            InterviewEvent::ChunkUploaded { .. } => "interview:chunk_uploaded",
            InterviewEvent::UploadFinalized { .. } => "interview:upload_finalized",
            InterviewEvent::InterviewCompleted { .. } => "interview:completed",
            InterviewEvent::ContentViolation { .. } => "interview:content_violation",
        }
    }

    /// Session the event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            InterviewEvent::PermissionsReady { session_id, .. }
            | InterviewEvent::RemoteStreamReady { session_id, .. }
            | InterviewEvent::RtcEvent { session_id, .. }
            | InterviewEvent::TransportPhaseChanged { session_id, .. }
            | InterviewEvent::InterviewPhaseChanged { session_id, .. }
            | InterviewEvent::ChunkRecorded { session_id, .. }
            | InterviewEvent::ChunkUploaded { session_id, .. }
            | InterviewEvent::UploadFinalized { session_id, .. }
            | InterviewEvent::InterviewCompleted { session_id, .. }
            | InterviewEvent::ContentViolation { session_id, .. } => *session_id,
        }
    }
}

/// Per-session publish/subscribe bus
///
/// Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<InterviewEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers
    ///   start dropping the oldest ones
    ///
    /// # Examples
    ///
    /// ```
    /// use hirewire_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<InterviewEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: InterviewEvent,
    ) -> Result<usize, broadcast::error::SendError<InterviewEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: InterviewEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
