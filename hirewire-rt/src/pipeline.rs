//! Interview pipeline
//!
//! Wires one session's components together through its event bus:
//!
//! - transport connected → start the recorder
//! - remote AI stream ready → mix it into the recording
//! - recorder chunk → upload queue
//! - interview completed → stop recording, finalize the upload, report the
//!   result, close the session

use std::sync::Arc;

use hirewire_common::events::InterviewEvent;
use hirewire_common::TransportPhase;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::recorder::{
    container_format, CaptureBackend, CompositeRecorder, RecorderSettings, RecorderState,
    RecordingChunk,
};
use crate::session::RealtimeSession;
use crate::session_context::SessionContext;
use crate::signaling::{SessionLifecycle, SessionResult};
use crate::upload::{BlockStore, FinalizeReport, UploadCoordinator, UploadMetadata, UploadSettings};

/// What a finished pipeline run produced
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub final_score: Option<f64>,
    pub fallback_score: bool,
    /// `None` when the commit call failed
    pub upload: Option<FinalizeReport>,
    pub lifecycle_reported: bool,
}

pub struct InterviewPipeline {
    context: Arc<SessionContext>,
    events: broadcast::Receiver<InterviewEvent>,
    recorder: CompositeRecorder,
    chunks: mpsc::UnboundedReceiver<RecordingChunk>,
    uploader: UploadCoordinator,
    lifecycle: Option<Arc<dyn SessionLifecycle>>,
}

impl InterviewPipeline {
    /// Build the pipeline; subscribes immediately so it sees every event
    /// emitted after construction. Create it before starting the session.
    pub fn new(
        context: Arc<SessionContext>,
        capture: Arc<dyn CaptureBackend>,
        recorder_settings: RecorderSettings,
        store: Arc<dyn BlockStore>,
        upload_settings: UploadSettings,
    ) -> Self {
        let events = context.events().subscribe();
        let (recorder, chunks) =
            CompositeRecorder::new(Arc::clone(&context), capture, recorder_settings);
        let uploader = UploadCoordinator::new(
            context.session_id(),
            store,
            upload_settings,
            context.events().clone(),
        );
        Self {
            context,
            events,
            recorder,
            chunks,
            uploader,
            lifecycle: None,
        }
    }

    /// Report the final result to the lifecycle endpoint on completion
    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn SessionLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    pub fn recorder(&self) -> &CompositeRecorder {
        &self.recorder
    }

    pub fn uploader(&self) -> &UploadCoordinator {
        &self.uploader
    }

    /// Drive the session until the interview completes
    pub async fn run(mut self, session: &RealtimeSession) -> Result<PipelineOutcome> {
        let session_id = self.context.session_id();
        info!(session_id = %session_id, "Interview pipeline running");

        if session.snapshot().is_connected() {
            self.start_recording();
        }

        let (final_score, fallback_score) = loop {
            tokio::select! {
                Some(chunk) = self.chunks.recv() => {
                    self.uploader.enqueue(chunk);
                }
                event = self.events.recv() => match event {
                    Ok(InterviewEvent::TransportPhaseChanged { new_phase: TransportPhase::Connected, .. }) => {
                        self.start_recording();
                    }
                    Ok(InterviewEvent::RemoteStreamReady { .. }) => self.inject_ai_audio(),
                    Ok(InterviewEvent::InterviewCompleted { final_score, fallback_score, .. }) => {
                        break (final_score, fallback_score);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(session_id = %session_id, skipped = skipped, "Pipeline lagged behind session events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(Error::InvalidState("session event bus closed".to_string()));
                    }
                },
            }
        };

        self.finish(session, final_score, fallback_score).await
    }

    fn start_recording(&self) {
        if self.recorder.state() != RecorderState::Idle {
            return;
        }
        if let Err(e) = self.recorder.start() {
            error!(session_id = %self.context.session_id(), error = %e, "Recorder failed to start");
        }
    }

    fn inject_ai_audio(&self) {
        let Some(stream) = self.context.remote_stream() else {
            return;
        };
        if let Err(e) = self.recorder.add_ai_audio_stream(&stream) {
            warn!(session_id = %self.context.session_id(), error = %e, "AI audio not mixed into recording");
        }
    }

    async fn finish(
        mut self,
        session: &RealtimeSession,
        final_score: Option<f64>,
        fallback_score: bool,
    ) -> Result<PipelineOutcome> {
        let session_id = self.context.session_id();

        self.recorder.stop();
        while let Ok(chunk) = self.chunks.try_recv() {
            self.uploader.enqueue(chunk);
        }

        let settings = self.recorder.settings();
        let metadata = UploadMetadata {
            duration: self.recorder.duration(),
            format: container_format(self.recorder.mime_type()).to_string(),
            resolution: settings.resolution.clone(),
            frame_rate: settings.frame_rate,
        };
        let upload = match self.uploader.finalize(metadata).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Upload commit failed");
                None
            }
        };

        let state = session.snapshot();
        let mut lifecycle_reported = false;
        if let Some(lifecycle) = &self.lifecycle {
            let result = SessionResult {
                session_id,
                final_score,
                breakdown: state
                    .final_score_breakdown
                    .as_ref()
                    .map(|b| b.as_percentages()),
                fallback_score,
                questions_asked: state.current_question_index,
            };
            match lifecycle.end_session(&result).await {
                Ok(()) => lifecycle_reported = true,
                Err(e) => warn!(session_id = %session_id, error = %e, "Session result not reported"),
            }
        }

        session.close().await;
        self.context.teardown();
        debug!(session_id = %session_id, "Interview pipeline finished");

        Ok(PipelineOutcome {
            final_score,
            fallback_score,
            upload,
            lifecycle_reported,
        })
    }
}
