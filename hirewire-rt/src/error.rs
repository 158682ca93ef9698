//! Error types for hirewire-rt
//!
//! Module-specific error type using thiserror for clear error propagation.

use std::time::Duration;
use thiserror::Error;

/// Main error type for hirewire-rt
#[derive(Error, Debug)]
pub enum Error {
    /// Network-level HTTP failure (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Credential or SDP endpoint answered with a non-success status
    #[error("Signaling error {status}: {body}")]
    Signaling { status: u16, body: String },

    /// Session lifecycle endpoint answered with a non-success status
    #[error("Session API error {status}: {body}")]
    SessionApi { status: u16, body: String },

    /// Offer/answer negotiation failed inside the peer connection
    #[error("Negotiation error: {0}")]
    Negotiation(String),

    /// Peer transport failure after negotiation, or use after close
    #[error("Transport error: {0}")]
    Transport(String),

    /// Control channel never became ready for an outbound message
    #[error("Control channel not open after {0:?}")]
    ChannelNotOpen(Duration),

    /// Session refused to start without local media
    #[error("No local media stream available")]
    NoLocalStream,

    /// Media capture or encoding errors
    #[error("Recorder error: {0}")]
    Recorder(String),

    /// Block upload or commit failure
    #[error("Upload error {status}: {body}")]
    Upload { status: u16, body: String },

    /// JSON encode/decode errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Convenience Result type using hirewire-rt Error
pub type Result<T> = std::result::Result<T, Error>;
