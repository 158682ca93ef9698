//! Peer connection seam
//!
//! The realtime session talks to a WebRTC stack only through these traits.
//! All asynchronous notifications (ICE and connection state, remote tracks,
//! control-channel open/message/close) arrive on ONE ordered event receiver so
//! the session driver sees them in the order the transport delivered them.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::media::{MediaStream, MediaTrack};

/// Label of the interview control channel
pub const CONTROL_CHANNEL_LABEL: &str = "interview-control";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

impl IceConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IceConnectionState::New => "new",
            IceConnectionState::Checking => "checking",
            IceConnectionState::Connected => "connected",
            IceConnectionState::Completed => "completed",
            IceConnectionState::Disconnected => "disconnected",
            IceConnectionState::Failed => "failed",
            IceConnectionState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl PeerConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerConnectionState::New => "new",
            PeerConnectionState::Connecting => "connecting",
            PeerConnectionState::Connected => "connected",
            PeerConnectionState::Disconnected => "disconnected",
            PeerConnectionState::Failed => "failed",
            PeerConnectionState::Closed => "closed",
        }
    }
}

/// Notification from the peer connection or its control channel
#[derive(Debug, Clone)]
pub enum PeerEvent {
    IceConnectionStateChange(IceConnectionState),
    ConnectionStateChange(PeerConnectionState),
    /// Remote media arrived (the AI voice)
    RemoteTrack(MediaStream),
    ChannelOpen,
    ChannelMessage(String),
    ChannelClosed,
}

/// Subset of connection statistics the session samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionStats {
    /// Inbound audio jitter in seconds
    pub inbound_audio_jitter: Option<f64>,
    /// Current round-trip time in seconds
    pub round_trip_time: Option<f64>,
    pub packets_lost: Option<i64>,
}

/// Reliable, ordered control channel
#[async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> &str;

    fn is_open(&self) -> bool;

    async fn send_text(&self, text: String) -> Result<()>;
}

#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Attach a local track for sending
    fn add_track(&self, track: &MediaTrack, stream: &MediaStream) -> Result<()>;

    /// Add a receive-only audio transceiver
    ///
    /// Required explicitly: some peers ignore the legacy receive-audio offer flag.
    fn add_recvonly_audio_transceiver(&self) -> Result<()>;

    fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>>;

    async fn create_offer(&self, ice_restart: bool) -> Result<String>;

    async fn set_local_description(&self, sdp: &str) -> Result<()>;

    async fn set_remote_description(&self, sdp: &str) -> Result<()>;

    async fn get_stats(&self) -> Result<ConnectionStats>;

    /// Ordered event stream; can be taken once
    fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<PeerEvent>>;

    /// Close the connection; must be idempotent
    async fn close(&self);
}

/// Creates one peer connection per session start
pub trait PeerFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn PeerConnection>>;
}
