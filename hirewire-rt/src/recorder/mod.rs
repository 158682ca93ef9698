//! Composite interview recorder
//!
//! **Purpose:** Produce an ordered sequence of timed chunks covering the
//! interview: candidate video plus one mixed audio track (microphone and AI
//! voice).
//!
//! **Capture paths:**
//! - Composite: region capture of the interview stage at the target frame rate
//! - Camera fallback: the local camera track, used whenever region capture
//!   fails or is unsupported
//!
//! Both paths record the mixed audio from an [`AudioMixGraph`].
//!
//! **States:** `Idle → Recording ⇄ DrainingForSwap → Stopped`. The swap state
//! covers late AI audio injection: the encoder is drained and replaced while
//! chunk numbering continues from the session's `ChunkSequence`.

pub mod backend;
pub mod mime;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use hirewire_common::config::RecorderSection;
use hirewire_common::events::InterviewEvent;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use backend::{CaptureBackend, RecorderSink};
pub use mime::{container_format, mime_essence, select_mime_type, BASELINE_MIME_TYPE};

use crate::error::{Error, Result};
use crate::media::mixer::AudioMixGraph;
use crate::media::{MediaStream, MediaTrack, SharedStream};
use crate::session_context::SessionContext;

#[derive(Debug, Clone, PartialEq)]
pub struct RecorderSettings {
    pub chunk_interval: Duration,
    pub frame_rate: u32,
    /// Page region captured on the composite path
    pub region_selector: String,
    /// Reported in upload metadata, e.g. "1280x720"
    pub resolution: String,
    pub microphone_gain: f32,
    pub ai_gain: f32,
}

impl From<&RecorderSection> for RecorderSettings {
    fn from(section: &RecorderSection) -> Self {
        Self {
            chunk_interval: Duration::from_millis(section.chunk_interval_ms.max(1)),
            frame_rate: section.frame_rate,
            region_selector: section.region_selector.clone(),
            resolution: section.resolution.clone(),
            microphone_gain: section.microphone_gain,
            ai_gain: section.ai_gain,
        }
    }
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self::from(&RecorderSection::default())
    }
}

/// One timed piece of the recording
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingChunk {
    pub session_id: Uuid,
    /// 1-based, unique and gap-free within a session
    pub sequence_index: u64,
    pub data: Vec<u8>,
    /// Encoder MIME type the data was produced with
    pub mime_type: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    DrainingForSwap,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    Composite,
    CameraFallback,
}

struct Inner {
    state: RecorderState,
    source: Option<CaptureSource>,
    mime_type: &'static str,
    output: MediaStream,
    /// Tracks created by region capture; the camera belongs to the session
    owned_tracks: Vec<MediaTrack>,
    mixer: Option<AudioMixGraph>,
    sink: Option<Box<dyn RecorderSink>>,
    ticker: Option<CancellationToken>,
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
    /// AI voice handed over before recording started
    pending_ai: Option<MediaTrack>,
}

struct Shared {
    context: Arc<SessionContext>,
    inner: Mutex<Inner>,
    chunks: mpsc::UnboundedSender<RecordingChunk>,
    retained: Mutex<Vec<RecordingChunk>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ticker callback: emit whatever the encoder produced since the last tick
    fn flush(&self) {
        let mut inner = self.lock();
        if inner.state != RecorderState::Recording {
            return;
        }
        let data = match inner.sink.as_mut().map(|sink| sink.take_data()) {
            Some(Ok(data)) => data,
            Some(Err(e)) => {
                warn!(session_id = %self.context.session_id(), error = %e, "Encoder data request failed");
                return;
            }
            None => return,
        };
        self.emit(data, inner.mime_type);
    }

    // Caller holds the state lock so indices follow emission order
    fn emit(&self, data: Vec<u8>, mime_type: &str) {
        if data.is_empty() {
            return;
        }
        let session_id = self.context.session_id();
        let sequence_index = self.context.chunk_sequence().next_index();
        let bytes = data.len();
        let chunk = RecordingChunk {
            session_id,
            sequence_index,
            data,
            mime_type: mime_type.to_string(),
            recorded_at: Utc::now(),
        };

        self.retained
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(chunk.clone());
        if self.chunks.send(chunk).is_err() {
            debug!(session_id = %session_id, sequence_index, "Chunk receiver dropped");
        }
        self.context.events().emit_lossy(InterviewEvent::ChunkRecorded {
            session_id,
            sequence_index,
            bytes,
        });
        debug!(session_id = %session_id, sequence_index, bytes, "Chunk recorded");
    }
}

pub struct CompositeRecorder {
    shared: Arc<Shared>,
    backend: Arc<dyn CaptureBackend>,
    settings: RecorderSettings,
}

impl CompositeRecorder {
    /// Create an idle recorder; chunks arrive on the returned receiver
    pub fn new(
        context: Arc<SessionContext>,
        backend: Arc<dyn CaptureBackend>,
        settings: RecorderSettings,
    ) -> (Self, mpsc::UnboundedReceiver<RecordingChunk>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            context,
            inner: Mutex::new(Inner {
                state: RecorderState::Idle,
                source: None,
                mime_type: BASELINE_MIME_TYPE,
                output: MediaStream::new(),
                owned_tracks: Vec::new(),
                mixer: None,
                sink: None,
                ticker: None,
                started_at: None,
                stopped_at: None,
                pending_ai: None,
            }),
            chunks: tx,
            retained: Mutex::new(Vec::new()),
        });
        (
            Self {
                shared,
                backend,
                settings,
            },
            rx,
        )
    }

    pub fn state(&self) -> RecorderState {
        self.shared.lock().state
    }

    pub fn source(&self) -> Option<CaptureSource> {
        self.shared.lock().source
    }

    pub fn mime_type(&self) -> &'static str {
        self.shared.lock().mime_type
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    /// Stream currently fed to the encoder
    pub fn output_stream(&self) -> MediaStream {
        self.shared.lock().output.clone()
    }

    /// Recording time so far, or total once stopped
    pub fn duration(&self) -> Duration {
        let inner = self.shared.lock();
        match (inner.started_at, inner.stopped_at) {
            (Some(start), Some(stop)) => stop.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Start capturing; Composite when region capture works, else camera
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(&self) -> Result<CaptureSource> {
        let context = &self.shared.context;
        let mut inner = self.shared.lock();
        match inner.state {
            RecorderState::Idle => {}
            RecorderState::Stopped => {
                return Err(Error::InvalidState("recorder already stopped".to_string()))
            }
            RecorderState::Recording | RecorderState::DrainingForSwap => {
                return Err(Error::InvalidState("recorder already running".to_string()))
            }
        }

        let (video, owned, source) = self.acquire_video();

        let ai_voice = inner
            .pending_ai
            .take()
            .or_else(|| context.remote_audio_track());
        let mut mixer = AudioMixGraph::for_interview(
            context.microphone_track().as_ref(),
            ai_voice.as_ref(),
            self.settings.microphone_gain,
            self.settings.ai_gain,
        )?;

        let mut output = MediaStream::with_tracks(video);
        if !mixer.inputs().is_empty() {
            output.add_track(mixer.output_track());
        }
        if output.tracks().is_empty() {
            owned.iter().for_each(MediaTrack::stop);
            mixer.close();
            return Err(Error::Recorder("no video or audio to record".to_string()));
        }

        let mime_type = select_mime_type(self.backend.as_ref());
        let sink = match self.backend.create_recorder(&output, mime_type) {
            Ok(sink) => sink,
            Err(e) => {
                owned.iter().for_each(MediaTrack::stop);
                mixer.close();
                return Err(e);
            }
        };

        let ticker = CancellationToken::new();
        inner.state = RecorderState::Recording;
        inner.source = Some(source);
        inner.mime_type = mime_type;
        inner.output = output;
        inner.owned_tracks = owned;
        inner.mixer = Some(mixer);
        inner.sink = Some(sink);
        inner.ticker = Some(ticker.clone());
        inner.started_at = Some(Instant::now());
        drop(inner);

        self.spawn_ticker(ticker);

        info!(
            session_id = %context.session_id(),
            source = ?source,
            mime_type = mime_type,
            interval_ms = self.settings.chunk_interval.as_millis() as u64,
            "Recording started"
        );
        Ok(source)
    }

    /// Video tracks to record, the subset we own, and which path produced them
    fn acquire_video(&self) -> (Vec<MediaTrack>, Vec<MediaTrack>, CaptureSource) {
        let session_id = self.shared.context.session_id();
        match self
            .backend
            .capture_region(&self.settings.region_selector, self.settings.frame_rate)
        {
            Ok(Some(stream)) if !stream.video_tracks().is_empty() => {
                return (
                    stream.video_tracks(),
                    stream.tracks().to_vec(),
                    CaptureSource::Composite,
                );
            }
            Ok(Some(stream)) => {
                stream.stop_all();
                warn!(session_id = %session_id, "Region capture produced no video; using camera");
            }
            Ok(None) => {
                warn!(session_id = %session_id, "Region capture unsupported; using camera");
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Region capture failed; using camera");
            }
        }

        let camera: Vec<MediaTrack> = self
            .shared
            .context
            .local_stream()
            .video_tracks()
            .into_iter()
            .filter(MediaTrack::is_live)
            .collect();
        (camera, Vec::new(), CaptureSource::CameraFallback)
    }

    fn spawn_ticker(&self, cancel: CancellationToken) {
        let shared = Arc::clone(&self.shared);
        let period = self.settings.chunk_interval;
        tokio::spawn(async move {
            let mut ticks = time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticks.tick() => shared.flush(),
                }
            }
        });
    }

    /// Mix the AI voice into the running recording
    ///
    /// The encoder is drained, the audio track swapped in one step, and a new
    /// encoder started on the same output stream. Chunk numbering continues.
    /// Before `start`, the track is remembered for the initial mix.
    pub fn add_ai_audio_stream(&self, stream: &SharedStream) -> Result<()> {
        let session_id = self.shared.context.session_id();
        let ai_voice = stream
            .audio_tracks()
            .into_iter()
            .find(MediaTrack::is_live)
            .ok_or_else(|| Error::Recorder("AI stream has no live audio track".to_string()))?;

        let mut inner = self.shared.lock();
        match inner.state {
            RecorderState::Idle => {
                debug!(session_id = %session_id, "AI audio stored for recording start");
                inner.pending_ai = Some(ai_voice);
                return Ok(());
            }
            RecorderState::Stopped => {
                return Err(Error::InvalidState("recorder already stopped".to_string()))
            }
            RecorderState::DrainingForSwap => {
                return Err(Error::InvalidState("audio swap in progress".to_string()))
            }
            RecorderState::Recording => {}
        }
        if inner
            .mixer
            .as_ref()
            .is_some_and(|m| m.inputs().iter().any(|i| i.track == ai_voice))
        {
            debug!(session_id = %session_id, "AI audio already mixed");
            return Ok(());
        }

        inner.state = RecorderState::DrainingForSwap;
        if let Some(mut sink) = inner.sink.take() {
            match sink.stop() {
                Ok(data) => self.shared.emit(data, inner.mime_type),
                Err(e) => warn!(session_id = %session_id, error = %e, "Encoder drain failed"),
            }
        }

        let context = &self.shared.context;
        let mixer = AudioMixGraph::for_interview(
            context.microphone_track().as_ref(),
            Some(&ai_voice),
            self.settings.microphone_gain,
            self.settings.ai_gain,
        );
        let mixer = match mixer {
            Ok(mixer) => mixer,
            Err(e) => {
                release(&mut inner);
                return Err(e);
            }
        };
        inner.output.replace_audio_tracks(vec![mixer.output_track()]);
        if let Some(mut old) = inner.mixer.replace(mixer) {
            old.close();
        }

        let sink = match self.backend.create_recorder(&inner.output, inner.mime_type) {
            Ok(sink) => sink,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Encoder restart failed; recording stopped");
                release(&mut inner);
                return Err(e);
            }
        };
        inner.sink = Some(sink);
        inner.state = RecorderState::Recording;

        info!(
            session_id = %session_id,
            next_index = context.chunk_sequence().current() + 1,
            "AI audio mixed into recording"
        );
        Ok(())
    }

    /// Stop recording and release capture resources; idempotent
    pub fn stop(&self) {
        let mut inner = self.shared.lock();
        match inner.state {
            RecorderState::Stopped => return,
            RecorderState::Idle => {
                inner.state = RecorderState::Stopped;
                return;
            }
            RecorderState::Recording | RecorderState::DrainingForSwap => {}
        }

        if let Some(mut sink) = inner.sink.take() {
            match sink.stop() {
                Ok(data) => self.shared.emit(data, inner.mime_type),
                Err(e) => warn!(
                    session_id = %self.shared.context.session_id(),
                    error = %e,
                    "Final encoder flush failed"
                ),
            }
        }
        release(&mut inner);

        info!(
            session_id = %self.shared.context.session_id(),
            chunks = self.shared.context.chunk_sequence().current(),
            "Recording stopped"
        );
    }

    /// Every chunk emitted so far, in order
    pub fn recorded_chunks(&self) -> Vec<RecordingChunk> {
        self.shared
            .retained
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Concatenate retained chunks into one local file body
    pub fn assemble_local(&self) -> Vec<u8> {
        let retained = self
            .shared
            .retained
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut body = Vec::with_capacity(retained.iter().map(|c| c.data.len()).sum());
        for chunk in retained.iter() {
            body.extend_from_slice(&chunk.data);
        }
        body
    }
}

/// Cancel the ticker, stop owned tracks, close the mixer
fn release(inner: &mut Inner) {
    if let Some(ticker) = inner.ticker.take() {
        ticker.cancel();
    }
    inner.sink = None;
    for track in inner.owned_tracks.drain(..) {
        track.stop();
    }
    if let Some(mut mixer) = inner.mixer.take() {
        mixer.close();
    }
    inner.stopped_at = Some(Instant::now());
    inner.state = RecorderState::Stopped;
}

impl Drop for CompositeRecorder {
    fn drop(&mut self) {
        self.stop();
    }
}
