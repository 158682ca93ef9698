//! Media track and stream primitives
//!
//! A `MediaStream` is a set of tracks. Streams that several components read
//! (local camera/microphone, remote AI audio, recorder output) are wrapped in
//! a `SharedStream`, whose track set is only ever replaced under a single
//! write lock so readers never see a transiently empty set.

pub mod mixer;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

pub use mixer::{AudioMixGraph, MixerInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Handle to one media track
///
/// Clones share the same live flag, so stopping any clone ends the track for
/// every holder.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    id: Uuid,
    kind: TrackKind,
    label: String,
    live: Arc<AtomicBool>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            label: label.into(),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn audio(label: impl Into<String>) -> Self {
        Self::new(TrackKind::Audio, label)
    }

    pub fn video(label: impl Into<String>) -> Self {
        Self::new(TrackKind::Video, label)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// End the track; idempotent
    pub fn stop(&self) {
        self.live.store(false, Ordering::Release);
    }
}

impl PartialEq for MediaTrack {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MediaTrack {}

#[derive(Debug, Clone)]
pub struct MediaStream {
    id: Uuid,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new() -> Self {
        Self::with_tracks(Vec::new())
    }

    pub fn with_tracks(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tracks,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn add_track(&mut self, track: MediaTrack) {
        if !self.tracks.contains(&track) {
            self.tracks.push(track);
        }
    }

    pub fn audio_tracks(&self) -> Vec<MediaTrack> {
        self.tracks_of(TrackKind::Audio)
    }

    pub fn video_tracks(&self) -> Vec<MediaTrack> {
        self.tracks_of(TrackKind::Video)
    }

    fn tracks_of(&self, kind: TrackKind) -> Vec<MediaTrack> {
        self.tracks
            .iter()
            .filter(|t| t.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn has_live_tracks(&self) -> bool {
        self.tracks.iter().any(MediaTrack::is_live)
    }

    /// Stop every track in the stream
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    /// Swap every audio track for `replacement` in one step
    ///
    /// Returns the tracks that were removed.
    pub fn replace_audio_tracks(&mut self, replacement: Vec<MediaTrack>) -> Vec<MediaTrack> {
        let (removed, mut kept): (Vec<_>, Vec<_>) = self
            .tracks
            .drain(..)
            .partition(|t| t.kind() == TrackKind::Audio);
        kept.extend(replacement);
        self.tracks = kept;
        removed
    }
}

impl Default for MediaStream {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream shared between components
#[derive(Debug, Clone)]
pub struct SharedStream {
    id: Uuid,
    inner: Arc<RwLock<MediaStream>>,
}

impl SharedStream {
    pub fn new(stream: MediaStream) -> Self {
        Self {
            id: stream.id(),
            inner: Arc::new(RwLock::new(stream)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Copy of the current track set
    pub fn snapshot(&self) -> MediaStream {
        self.read().clone()
    }

    pub fn audio_tracks(&self) -> Vec<MediaTrack> {
        self.read().audio_tracks()
    }

    pub fn video_tracks(&self) -> Vec<MediaTrack> {
        self.read().video_tracks()
    }

    pub fn has_live_tracks(&self) -> bool {
        self.read().has_live_tracks()
    }

    pub fn add_track(&self, track: MediaTrack) {
        self.write().add_track(track);
    }

    /// Atomically replace the audio tracks, see `MediaStream::replace_audio_tracks`
    pub fn replace_audio_tracks(&self, replacement: Vec<MediaTrack>) -> Vec<MediaTrack> {
        self.write().replace_audio_tracks(replacement)
    }

    pub fn stop_all(&self) {
        self.read().stop_all();
    }

    fn read(&self) -> RwLockReadGuard<'_, MediaStream> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MediaStream> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
