//! Per-session shared context
//!
//! Built once at session start and handed by reference to every component
//! that needs the media streams, the event bus or the chunk counter. Dropping
//! the last reference (after `teardown`) ends the session's resources.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use hirewire_common::events::{EventBus, InterviewEvent};
use tracing::{debug, info};
use uuid::Uuid;

use crate::media::{MediaTrack, SharedStream};

/// Monotonic 1-based chunk counter scoped to one session
///
/// Lives on the session context rather than inside the recorder so a
/// recorder restart can never reset numbering.
#[derive(Debug, Clone, Default)]
pub struct ChunkSequence {
    last: Arc<AtomicU64>,
}

impl ChunkSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next index (first call returns 1)
    pub fn next_index(&self) -> u64 {
        self.last.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Last index handed out, 0 if none
    pub fn current(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }
}

pub struct SessionContext {
    session_id: Uuid,
    application_id: String,
    local_stream: SharedStream,
    remote_stream: RwLock<Option<SharedStream>>,
    events: EventBus,
    chunk_sequence: ChunkSequence,
}

impl SessionContext {
    pub fn new(
        session_id: Uuid,
        application_id: impl Into<String>,
        local_stream: SharedStream,
        event_capacity: usize,
    ) -> Arc<Self> {
        let context = Arc::new(Self {
            session_id,
            application_id: application_id.into(),
            local_stream,
            remote_stream: RwLock::new(None),
            events: EventBus::new(event_capacity),
            chunk_sequence: ChunkSequence::new(),
        });
        info!(session_id = %session_id, "Session context created");
        context
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn local_stream(&self) -> &SharedStream {
        &self.local_stream
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn chunk_sequence(&self) -> &ChunkSequence {
        &self.chunk_sequence
    }

    /// Announce that camera/microphone are available
    pub fn announce_permissions(&self) {
        let audio = !self.local_stream.audio_tracks().is_empty();
        let video = !self.local_stream.video_tracks().is_empty();
        self.events.emit_lossy(InterviewEvent::PermissionsReady {
            session_id: self.session_id,
            audio,
            video,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Store the remote AI stream and notify subscribers
    pub fn set_remote_stream(&self, stream: SharedStream) {
        let stream_id = stream.id();
        {
            let mut slot = self
                .remote_stream
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *slot = Some(stream);
        }
        debug!(session_id = %self.session_id, stream_id = %stream_id, "Remote stream stored");
        self.events.emit_lossy(InterviewEvent::RemoteStreamReady {
            session_id: self.session_id,
            stream_id,
            timestamp: chrono::Utc::now(),
        });
    }

    pub fn remote_stream(&self) -> Option<SharedStream> {
        self.remote_stream
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// First live audio track of the remote stream
    pub fn remote_audio_track(&self) -> Option<MediaTrack> {
        self.remote_stream()?
            .audio_tracks()
            .into_iter()
            .find(MediaTrack::is_live)
    }

    /// First live microphone track
    pub fn microphone_track(&self) -> Option<MediaTrack> {
        self.local_stream
            .audio_tracks()
            .into_iter()
            .find(MediaTrack::is_live)
    }

    /// Release local and remote media at session end
    pub fn teardown(&self) {
        self.local_stream.stop_all();
        if let Some(remote) = self.remote_stream() {
            remote.stop_all();
        }
        info!(session_id = %self.session_id, "Session context torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaStream;

    fn context() -> Arc<SessionContext> {
        let local = SharedStream::new(MediaStream::with_tracks(vec![
            MediaTrack::video("cam"),
            MediaTrack::audio("mic"),
        ]));
        SessionContext::new(Uuid::new_v4(), "app-1", local, 16)
    }

    #[test]
    fn chunk_sequence_is_one_based_and_shared() {
        let seq = ChunkSequence::new();
        let clone = seq.clone();
        assert_eq!(seq.current(), 0);
        assert_eq!(seq.next_index(), 1);
        assert_eq!(clone.next_index(), 2);
        assert_eq!(seq.current(), 2);
    }

    #[tokio::test]
    async fn remote_stream_announces_on_bus() {
        let ctx = context();
        let mut rx = ctx.events().subscribe();
        let remote = SharedStream::new(MediaStream::with_tracks(vec![MediaTrack::audio("ai")]));
        let remote_id = remote.id();

        ctx.set_remote_stream(remote);

        match rx.recv().await.unwrap() {
            InterviewEvent::RemoteStreamReady { stream_id, .. } => assert_eq!(stream_id, remote_id),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(ctx.remote_audio_track().is_some());
    }

    #[test]
    fn teardown_stops_all_tracks() {
        let ctx = context();
        let mic = ctx.microphone_track().unwrap();
        ctx.teardown();
        assert!(!mic.is_live());
        assert!(!ctx.local_stream().has_live_tracks());
    }
}
