//! Realtime session state machine
//!
//! **Responsibilities:**
//! - Negotiate one peer connection plus one control channel per interview
//! - Apply control-channel events, in arrival order, through `transition`
//! - Supervise the connection: connect deadline, bounded ICE restarts,
//!   periodic statistics sampling
//! - Degrade to a local fallback score when a score request goes unanswered
//!
//! # Ordering
//!
//! A single driver task owns the peer event receiver. Every event is handled
//! to completion before the next is read, and each produces at most one state
//! update, so UI callbacks observe updates in transport order.
//!
//! # Timers
//!
//! The connect deadline, the score grace deadline and the statistics interval
//! live inside the driver loop. Closing the session ends the loop, which drops
//! all of them.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use hirewire_common::config::SessionSection;
use hirewire_common::events::{EventBus, InterviewEvent};
use hirewire_common::{InterviewPhase, TransportPhase};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::control::{ControlEvent, ControlEventKind, OutboundMessage};
use super::diagnostics::RollingAverage;
use super::scoring::FallbackScoring;
use super::state::{SessionState, StateUpdate};
use super::transition::transition;
use crate::assembler::{AnswerEvaluation, ContextAssembler, ContextBundle, EvaluationLog};
use crate::error::{Error, Result};
use crate::media::SharedStream;
use crate::peer::{
    DataChannel, IceConnectionState, PeerConnection, PeerConnectionState, PeerEvent, PeerFactory,
    CONTROL_CHANNEL_LABEL,
};
use crate::session_context::SessionContext;
use crate::signaling::{Credential, Signaling};

/// Invoked synchronously on every state change; must not block
pub type StateCallback = Arc<dyn Fn(&SessionState) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Deadline for reaching `Connected` after the answer is applied
    pub connect_timeout: Duration,
    /// Wait for a terminal response after a score request
    pub score_grace: Duration,
    pub max_ice_restarts: u32,
    pub stats_interval: Duration,
    /// Bound on waiting for the control channel before abandoning a message
    pub channel_open_timeout: Duration,
    /// Enter `Fallback` instead of `Error` when the connect deadline passes
    pub fallback_enabled: bool,
}

impl From<&SessionSection> for SessionSettings {
    fn from(section: &SessionSection) -> Self {
        Self {
            connect_timeout: Duration::from_secs(section.connect_timeout_secs),
            score_grace: Duration::from_secs(section.score_grace_secs),
            max_ice_restarts: section.max_ice_restarts,
            stats_interval: Duration::from_secs(section.stats_interval_secs.max(1)),
            channel_open_timeout: Duration::from_millis(section.channel_open_timeout_ms),
            fallback_enabled: section.fallback_enabled,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&SessionSection::default())
    }
}

/// Per-start inputs owned by the caller
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub required_skills: Vec<String>,
    pub evaluations: EvaluationLog,
    pub max_context_tokens: Option<usize>,
    /// Overrides `SessionSettings::fallback_enabled`
    pub fallback_enabled: Option<bool>,
}

/// Owner of the session state; the only place it is mutated
struct StateStore {
    session_id: Uuid,
    state: Mutex<SessionState>,
    on_change: StateCallback,
    events: EventBus,
}

impl StateStore {
    fn new(session_id: Uuid, events: EventBus, on_change: StateCallback) -> Self {
        Self {
            session_id,
            state: Mutex::new(SessionState::default()),
            on_change,
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    fn transport_phase(&self) -> TransportPhase {
        self.lock().transport_phase
    }

    fn apply(&self, update: StateUpdate) -> bool {
        if update.is_empty() {
            return false;
        }
        let (changed, old_transport, old_phase, snapshot) = {
            let mut state = self.lock();
            let old_transport = state.transport_phase;
            let old_phase = state.interview_phase;
            let changed = state.apply(update);
            (changed, old_transport, old_phase, state.clone())
        };
        if changed {
            self.notify(old_transport, old_phase, &snapshot);
        }
        changed
    }

    fn reset_interview(&self) {
        let (old_transport, old_phase, snapshot) = {
            let mut state = self.lock();
            let old_transport = state.transport_phase;
            let old_phase = state.interview_phase;
            state.reset_interview();
            (old_transport, old_phase, state.clone())
        };
        info!(session_id = %self.session_id, from = %old_phase, "Interview reset");
        self.notify(old_transport, old_phase, &snapshot);
    }

    // Runs outside the state lock
    fn notify(&self, old_transport: TransportPhase, old_phase: InterviewPhase, state: &SessionState) {
        (self.on_change)(state);

        let timestamp = chrono::Utc::now();
        if state.transport_phase != old_transport {
            self.events.emit_lossy(InterviewEvent::TransportPhaseChanged {
                session_id: self.session_id,
                old_phase: old_transport,
                new_phase: state.transport_phase,
                timestamp,
            });
        }
        if state.interview_phase != old_phase {
            self.events.emit_lossy(InterviewEvent::InterviewPhaseChanged {
                session_id: self.session_id,
                old_phase,
                new_phase: state.interview_phase,
                timestamp,
            });
        }
    }
}

enum DriverCommand {
    ScoreRequested,
    ResetInterview,
}

/// Starts realtime sessions
pub struct SessionManager {
    signaling: Arc<dyn Signaling>,
    peers: Arc<dyn PeerFactory>,
    settings: SessionSettings,
    assembler: ContextAssembler,
    scoring: FallbackScoring,
}

struct Negotiated {
    peer: Arc<dyn PeerConnection>,
    channel: Arc<dyn DataChannel>,
    events: mpsc::UnboundedReceiver<PeerEvent>,
    credential: Credential,
}

impl SessionManager {
    pub fn new(
        signaling: Arc<dyn Signaling>,
        peers: Arc<dyn PeerFactory>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            signaling,
            peers,
            settings,
            assembler: ContextAssembler::default(),
            scoring: FallbackScoring::default(),
        }
    }

    pub fn with_assembler(mut self, assembler: ContextAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_scoring(mut self, scoring: FallbackScoring) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Negotiate a session for `context`
    ///
    /// Single round trip: credential, local offer, SDP exchange, remote
    /// answer. On any failure the state moves to `Error` with a message and
    /// the error is returned; the caller may call `start` again.
    pub async fn start(
        &self,
        context: Arc<SessionContext>,
        on_state_change: StateCallback,
        options: SessionOptions,
    ) -> Result<RealtimeSession> {
        let session_id = context.session_id();
        let store = Arc::new(StateStore::new(
            session_id,
            context.events().clone(),
            on_state_change,
        ));

        if !context.local_stream().has_live_tracks() {
            warn!(session_id = %session_id, "Refusing to start without local media");
            store.apply(StateUpdate::failure(Error::NoLocalStream.to_string()));
            return Err(Error::NoLocalStream);
        }
        context.announce_permissions();

        info!(
            session_id = %session_id,
            application_id = context.application_id(),
            "Starting realtime session"
        );
        store.apply(StateUpdate {
            transport_phase: Some(TransportPhase::Token),
            error: Some(None),
            ..StateUpdate::default()
        });

        let negotiated = match self.negotiate(&context, &store).await {
            Ok(negotiated) => negotiated,
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Session start failed");
                store.apply(StateUpdate::failure(e.to_string()));
                return Err(e);
            }
        };
        let answer_applied_at = Instant::now();
        debug!(session_id = %session_id, "Remote answer applied");

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = watch::channel(negotiated.channel.is_open());
        let cancel = CancellationToken::new();

        let driver = SessionDriver {
            context: Arc::clone(&context),
            store: Arc::clone(&store),
            peer: Arc::clone(&negotiated.peer),
            channel: Arc::clone(&negotiated.channel),
            signaling: Arc::clone(&self.signaling),
            credential: negotiated.credential,
            settings: self.settings.clone(),
            fallback_enabled: options
                .fallback_enabled
                .unwrap_or(self.settings.fallback_enabled),
            assembler: self.assembler.clone(),
            scoring: self.scoring.clone(),
            options: options.clone(),
            events: negotiated.events,
            commands: command_rx,
            channel_ready: ready_tx,
            cancel: cancel.clone(),
            answer_applied_at,
            connect_deadline: Some(answer_applied_at + self.settings.connect_timeout),
            score_deadline: None,
            jitter: RollingAverage::default(),
            ice_restarts: 0,
            restart_in_flight: false,
            first_audio_seen: false,
        };
        let handle = tokio::spawn(driver.run());

        Ok(RealtimeSession {
            context,
            peer: negotiated.peer,
            channel: negotiated.channel,
            store,
            commands: command_tx,
            channel_ready: ready_rx,
            channel_open_timeout: self.settings.channel_open_timeout,
            evaluations: options.evaluations,
            cancel,
            driver: tokio::sync::Mutex::new(Some(handle)),
        })
    }

    async fn negotiate(
        &self,
        context: &SessionContext,
        store: &StateStore,
    ) -> Result<Negotiated> {
        let credential = self
            .signaling
            .fetch_credential(context.application_id())
            .await?;
        store.apply(StateUpdate::transport(TransportPhase::Connecting));

        let peer = self.peers.create()?;
        match self.negotiate_peer(&peer, context, &credential).await {
            Ok((channel, events)) => Ok(Negotiated {
                peer,
                channel,
                events,
                credential,
            }),
            Err(e) => {
                peer.close().await;
                Err(e)
            }
        }
    }

    async fn negotiate_peer(
        &self,
        peer: &Arc<dyn PeerConnection>,
        context: &SessionContext,
        credential: &Credential,
    ) -> Result<(Arc<dyn DataChannel>, mpsc::UnboundedReceiver<PeerEvent>)> {
        let events = peer
            .take_event_receiver()
            .ok_or_else(|| Error::Negotiation("peer event stream already taken".to_string()))?;

        let local = context.local_stream().snapshot();
        for track in local.tracks() {
            peer.add_track(track, &local)?;
        }
        peer.add_recvonly_audio_transceiver()?;
        let channel = peer.create_data_channel(CONTROL_CHANNEL_LABEL)?;

        let offer = peer.create_offer(false).await?;
        peer.set_local_description(&offer).await?;
        let answer = self.signaling.exchange_sdp(credential, &offer).await?;
        peer.set_remote_description(&answer).await?;

        Ok((channel, events))
    }
}

/// Handle to a running session
pub struct RealtimeSession {
    context: Arc<SessionContext>,
    peer: Arc<dyn PeerConnection>,
    channel: Arc<dyn DataChannel>,
    store: Arc<StateStore>,
    commands: mpsc::UnboundedSender<DriverCommand>,
    channel_ready: watch::Receiver<bool>,
    channel_open_timeout: Duration,
    evaluations: EvaluationLog,
    cancel: CancellationToken,
    driver: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeSession {
    pub fn session_id(&self) -> Uuid {
        self.context.session_id()
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    pub fn peer(&self) -> &Arc<dyn PeerConnection> {
        &self.peer
    }

    pub fn control_channel(&self) -> &Arc<dyn DataChannel> {
        &self.channel
    }

    /// Current state
    pub fn snapshot(&self) -> SessionState {
        self.store.snapshot()
    }

    pub fn evaluations(&self) -> &EvaluationLog {
        &self.evaluations
    }

    /// Append an answer evaluation for the next context assembly
    pub fn record_evaluation(&self, evaluation: AnswerEvaluation) {
        self.evaluations.append(evaluation);
    }

    /// Resolve once the control channel is open, bounded by the open timeout
    pub async fn wait_until_channel_open(&self) -> Result<()> {
        let mut ready = self.channel_ready.clone();
        let opened = matches!(
            time::timeout(self.channel_open_timeout, ready.wait_for(|open| *open)).await,
            Ok(Ok(_))
        );
        if opened {
            Ok(())
        } else {
            Err(Error::ChannelNotOpen(self.channel_open_timeout))
        }
    }

    async fn send(&self, message: OutboundMessage) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Transport("session closed".to_string()));
        }
        let payload = message.to_json()?;
        if let Err(e) = self.wait_until_channel_open().await {
            warn!(
                session_id = %self.session_id(),
                "Control channel never opened; outbound message abandoned"
            );
            return Err(e);
        }
        self.channel.send_text(payload).await
    }

    /// Ask the interviewer to greet the candidate
    pub async fn send_greeting_trigger(&self) -> Result<()> {
        self.send(OutboundMessage::greeting()).await?;
        info!(session_id = %self.session_id(), "Greeting trigger sent");
        Ok(())
    }

    /// Ask for the final score and arm the fallback deadline
    ///
    /// The deadline is armed even when the request could not be sent, so the
    /// interview always reaches `Completed`.
    pub async fn send_score_request(&self) -> Result<()> {
        let questions = self.snapshot().current_question_index;
        let result = self.send(OutboundMessage::score_request(questions)).await;
        if self.commands.send(DriverCommand::ScoreRequested).is_err() {
            warn!(session_id = %self.session_id(), "Session driver gone; score deadline not armed");
        }
        if result.is_ok() {
            info!(session_id = %self.session_id(), questions = questions, "Score request sent");
        }
        result
    }

    /// Explicit external reset back to `PreStart`
    pub fn reset_interview(&self) {
        if self.commands.send(DriverCommand::ResetInterview).is_err() {
            warn!(session_id = %self.session_id(), "Session driver gone; reset dropped");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the driver and close the peer connection; idempotent
    pub async fn close(&self) {
        self.cancel.cancel();
        let handle = self.driver.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(session_id = %self.session_id(), error = %e, "Session driver ended abnormally");
            }
        }
    }
}

impl Drop for RealtimeSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct SessionDriver {
    context: Arc<SessionContext>,
    store: Arc<StateStore>,
    peer: Arc<dyn PeerConnection>,
    channel: Arc<dyn DataChannel>,
    signaling: Arc<dyn Signaling>,
    credential: Credential,
    settings: SessionSettings,
    fallback_enabled: bool,
    assembler: ContextAssembler,
    scoring: FallbackScoring,
    options: SessionOptions,
    events: mpsc::UnboundedReceiver<PeerEvent>,
    commands: mpsc::UnboundedReceiver<DriverCommand>,
    channel_ready: watch::Sender<bool>,
    cancel: CancellationToken,
    answer_applied_at: Instant,
    connect_deadline: Option<Instant>,
    score_deadline: Option<Instant>,
    jitter: RollingAverage,
    ice_restarts: u32,
    restart_in_flight: bool,
    first_audio_seen: bool,
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

impl SessionDriver {
    fn session_id(&self) -> Uuid {
        self.context.session_id()
    }

    async fn run(mut self) {
        let period = self.settings.stats_interval;
        let mut stats = time::interval_at(Instant::now() + period, period);
        stats.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let connected = self.store.transport_phase() == TransportPhase::Connected;

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!(session_id = %self.session_id(), "Session driver cancelled");
                    break;
                }

                event = self.events.recv() => match event {
                    Some(event) => {
                        if !self.handle_peer_event(event).await {
                            break;
                        }
                    }
                    None => {
                        debug!(session_id = %self.session_id(), "Peer event stream ended");
                        break;
                    }
                },

                Some(command) = self.commands.recv() => self.handle_command(command),

                _ = wait_until(self.connect_deadline) => self.on_connect_timeout(),

                _ = wait_until(self.score_deadline) => self.on_score_timeout(),

                _ = stats.tick(), if connected => self.sample_stats().await,
            }
        }

        self.shutdown().await;
    }

    /// Returns false when the connection is gone
    async fn handle_peer_event(&mut self, event: PeerEvent) -> bool {
        match event {
            PeerEvent::IceConnectionStateChange(state) => {
                self.store.apply(StateUpdate {
                    ice_state: Some(state.as_str().to_string()),
                    ..StateUpdate::default()
                });
                match state {
                    IceConnectionState::Connected | IceConnectionState::Completed => {
                        self.mark_connected()
                    }
                    IceConnectionState::Disconnected | IceConnectionState::Failed => {
                        self.attempt_ice_restart().await
                    }
                    IceConnectionState::Closed => return false,
                    IceConnectionState::New | IceConnectionState::Checking => {}
                }
            }
            PeerEvent::ConnectionStateChange(state) => {
                self.store.apply(StateUpdate {
                    connection_state: Some(state.as_str().to_string()),
                    ..StateUpdate::default()
                });
                match state {
                    PeerConnectionState::Connected => self.mark_connected(),
                    PeerConnectionState::Closed => return false,
                    _ => {}
                }
            }
            PeerEvent::RemoteTrack(stream) => {
                let shared = SharedStream::new(stream);
                if !self.first_audio_seen && !shared.audio_tracks().is_empty() {
                    self.first_audio_seen = true;
                    let latency_ms = self.answer_applied_at.elapsed().as_secs_f64() * 1000.0;
                    debug!(session_id = %self.session_id(), latency_ms = latency_ms, "First remote audio");
                    self.store.apply(StateUpdate {
                        first_audio_frame_ms: Some(latency_ms),
                        ..StateUpdate::default()
                    });
                }
                self.context.set_remote_stream(shared);
            }
            PeerEvent::ChannelOpen => {
                info!(session_id = %self.session_id(), "Control channel open");
                self.channel_ready.send_replace(true);
            }
            PeerEvent::ChannelMessage(raw) => self.handle_control_message(raw).await,
            PeerEvent::ChannelClosed => {
                warn!(session_id = %self.session_id(), "Control channel closed");
                self.channel_ready.send_replace(false);
            }
        }
        true
    }

    fn mark_connected(&mut self) {
        self.connect_deadline = None;
        self.restart_in_flight = false;
        if self.store.transport_phase() != TransportPhase::Connected {
            info!(session_id = %self.session_id(), "Realtime connection established");
            self.store
                .apply(StateUpdate::transport(TransportPhase::Connected));
        }
    }

    async fn attempt_ice_restart(&mut self) {
        if self.restart_in_flight {
            debug!(session_id = %self.session_id(), "ICE restart already in flight");
            return;
        }
        if self.ice_restarts >= self.settings.max_ice_restarts {
            warn!(
                session_id = %self.session_id(),
                restarts = self.ice_restarts,
                "ICE restart budget exhausted; leaving connection failed"
            );
            return;
        }

        self.ice_restarts += 1;
        self.restart_in_flight = true;
        info!(session_id = %self.session_id(), attempt = self.ice_restarts, "Attempting ICE restart");
        self.store.apply(StateUpdate {
            transport_phase: Some(TransportPhase::Connecting),
            ice_restarts: Some(self.ice_restarts),
            ..StateUpdate::default()
        });

        match self.renegotiate().await {
            Ok(()) => {
                self.connect_deadline = Some(Instant::now() + self.settings.connect_timeout);
            }
            Err(e) => {
                warn!(session_id = %self.session_id(), error = %e, "ICE restart failed");
                self.restart_in_flight = false;
                self.store
                    .apply(StateUpdate::failure(format!("ICE restart failed: {}", e)));
            }
        }
    }

    async fn renegotiate(&self) -> Result<()> {
        let offer = self.peer.create_offer(true).await?;
        self.peer.set_local_description(&offer).await?;
        let answer = self.signaling.exchange_sdp(&self.credential, &offer).await?;
        self.peer.set_remote_description(&answer).await
    }

    async fn handle_control_message(&mut self, raw: String) {
        let received_at = chrono::Utc::now().timestamp_millis();
        let parsed = ControlEvent::parse(&raw, received_at);

        self.context.events().emit_lossy(InterviewEvent::RtcEvent {
            session_id: self.session_id(),
            raw,
            parsed: parsed.is_some(),
            timestamp: chrono::Utc::now(),
        });

        let Some(event) = parsed else {
            debug!(session_id = %self.session_id(), "Dropping malformed control message");
            return;
        };

        let prev = self.store.snapshot();
        let mut update = transition(&prev, &event);

        let bundle = if event.kind == ControlEventKind::QuestionReady {
            let bundle = self.assembler.assemble(
                &self.options.evaluations.snapshot(),
                &self.options.required_skills,
                prev.difficulty_tier,
                self.options.max_context_tokens,
            );
            update.difficulty_tier = Some(bundle.difficulty.tier);
            update.missing_skills = Some(bundle.missing_skills.clone());
            update.context_fragments = Some(bundle.fragments.clone());
            Some(bundle)
        } else {
            None
        };

        if event.kind.is_terminal() {
            self.score_deadline = None;
        }

        let completes = update.interview_phase == Some(InterviewPhase::Completed)
            && !prev.interview_phase.is_terminal();
        self.store.apply(update);

        if completes {
            let state = self.store.snapshot();
            info!(
                session_id = %self.session_id(),
                final_score = ?state.final_score,
                "Interview completed"
            );
            self.context.events().emit_lossy(InterviewEvent::InterviewCompleted {
                session_id: self.session_id(),
                final_score: state.final_score,
                fallback_score: false,
                timestamp: chrono::Utc::now(),
            });
        }

        if let Some(bundle) = bundle {
            self.send_context(bundle).await;
        }
    }

    async fn send_context(&self, bundle: ContextBundle) {
        if !self.channel.is_open() {
            warn!(session_id = %self.session_id(), "Control channel closed; context update skipped");
            return;
        }
        let tier = bundle.difficulty.tier;
        let message = match OutboundMessage::context_update(bundle).to_json() {
            Ok(message) => message,
            Err(e) => {
                error!(session_id = %self.session_id(), error = %e, "Failed to encode context update");
                return;
            }
        };
        match self.channel.send_text(message).await {
            Ok(()) => debug!(session_id = %self.session_id(), tier = tier, "Context update sent"),
            Err(e) => warn!(session_id = %self.session_id(), error = %e, "Context update not sent"),
        }
    }

    fn handle_command(&mut self, command: DriverCommand) {
        match command {
            DriverCommand::ScoreRequested => {
                if self.store.snapshot().interview_phase.is_terminal() {
                    debug!(session_id = %self.session_id(), "Score requested after completion; ignoring");
                    return;
                }
                self.store.apply(StateUpdate {
                    interview_phase: Some(InterviewPhase::Scoring),
                    ..StateUpdate::default()
                });
                self.score_deadline = Some(Instant::now() + self.settings.score_grace);
            }
            DriverCommand::ResetInterview => {
                self.score_deadline = None;
                self.store.reset_interview();
            }
        }
    }

    fn on_connect_timeout(&mut self) {
        self.connect_deadline = None;
        self.restart_in_flight = false;
        if self.store.transport_phase() == TransportPhase::Connected {
            return;
        }
        let secs = self.settings.connect_timeout.as_secs_f64();
        if self.fallback_enabled {
            warn!(session_id = %self.session_id(), timeout_secs = secs, "Connect deadline passed; entering fallback");
            self.store
                .apply(StateUpdate::transport(TransportPhase::Fallback));
        } else {
            error!(session_id = %self.session_id(), timeout_secs = secs, "Connect deadline passed");
            self.store.apply(StateUpdate::failure(format!(
                "Connection not established within {}s",
                secs
            )));
        }
    }

    fn on_score_timeout(&mut self) {
        self.score_deadline = None;
        let state = self.store.snapshot();
        if state.interview_phase.is_terminal() {
            return;
        }

        let (score, breakdown) = self
            .scoring
            .score(state.current_question_index, state.difficulty_tier);
        warn!(
            session_id = %self.session_id(),
            score = score,
            questions = state.current_question_index,
            tier = state.difficulty_tier,
            "No score response within grace period; using fallback score"
        );
        self.store.apply(StateUpdate {
            interview_phase: Some(InterviewPhase::Completed),
            final_score: Some(score),
            final_score_breakdown: Some(breakdown),
            fallback_score: Some(true),
            ..StateUpdate::default()
        });
        self.context.events().emit_lossy(InterviewEvent::InterviewCompleted {
            session_id: self.session_id(),
            final_score: Some(score),
            fallback_score: true,
            timestamp: chrono::Utc::now(),
        });
    }

    async fn sample_stats(&mut self) {
        match self.peer.get_stats().await {
            Ok(stats) => {
                let mut update = StateUpdate::default();
                if let Some(jitter) = stats.inbound_audio_jitter {
                    update.jitter_avg_ms = self.jitter.push(jitter * 1000.0);
                }
                if let Some(rtt) = stats.round_trip_time {
                    update.round_trip_ms = Some(rtt * 1000.0);
                }
                self.store.apply(update);
            }
            Err(e) => debug!(session_id = %self.session_id(), error = %e, "Stats sample failed"),
        }
    }

    async fn shutdown(self) {
        self.channel_ready.send_replace(false);
        self.peer.close().await;
        info!(session_id = %self.session_id(), "Realtime session closed");
    }
}
