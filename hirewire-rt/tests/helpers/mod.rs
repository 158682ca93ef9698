//! Test helper modules for hirewire-rt integration tests
//!
//! Provides in-process stand-ins for everything the core consumes:
//! - FakePeer / FakeSignaling: scripted peer connection and credential service
//! - FakeCapture: region capture and encoder double
//! - FakeBlockStore / FakeLifecycle: remote storage and session endpoints
//! - spawn_server: axum router on an ephemeral port for the HTTP clients

#![allow(dead_code)]

pub mod fake_capture;
pub mod fake_peer;
pub mod fake_store;
pub mod test_server;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hirewire_rt::media::{MediaStream, MediaTrack, SharedStream};
use hirewire_rt::session::{SessionState, StateCallback};
use hirewire_rt::SessionContext;
use uuid::Uuid;

pub use fake_capture::{FakeCapture, RegionMode};
pub use fake_peer::{FakePeer, FakePeerFactory, FakeSignaling};
pub use fake_store::{FakeBlockStore, FakeLifecycle};
pub use test_server::spawn_server;

/// Session context with a live camera and microphone
pub fn interview_context() -> Arc<SessionContext> {
    let local = SharedStream::new(MediaStream::with_tracks(vec![
        MediaTrack::video("camera"),
        MediaTrack::audio("microphone"),
    ]));
    SessionContext::new(Uuid::new_v4(), "app-123", local, 64)
}

/// Remote AI voice as it arrives from the peer
pub fn ai_stream() -> MediaStream {
    MediaStream::with_tracks(vec![MediaTrack::audio("ai-voice")])
}

/// State callback that keeps every state it is handed
pub fn state_log() -> (StateCallback, Arc<Mutex<Vec<SessionState>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let callback: StateCallback = Arc::new(move |state: &SessionState| {
        sink.lock().unwrap().push(state.clone());
    });
    (callback, log)
}

/// Let spawned tasks run until `condition` holds
///
/// Yields first, then sleeps in small steps; returns the final check.
pub async fn eventually<F: FnMut() -> bool>(mut condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
