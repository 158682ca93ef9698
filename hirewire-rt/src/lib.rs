//! # HireWire Realtime Interview Core (hirewire-rt)
//!
//! Orchestrates one live AI-conducted interview in the candidate's browser
//! session.
//!
//! **Components:**
//! - `session`: peer negotiation, control-channel state machine, supervision
//! - `assembler`: adaptive difficulty and skill-gap context for the interviewer
//! - `safety`: keeps model/provider identity out of spoken responses
//! - `recorder`: composite capture into timed chunks
//! - `upload`: ordered progressive chunk upload and commit
//! - `pipeline`: wires the above together per session
//!
//! Browser capabilities (peer connections, element capture, encoders) are
//! consumed through traits in `peer` and `recorder::backend`.

pub mod assembler;
pub mod config;
pub mod error;
pub mod media;
pub mod peer;
pub mod pipeline;
pub mod recorder;
pub mod safety;
pub mod session;
pub mod session_context;
pub mod signaling;
pub mod upload;

pub use error::{Error, Result};
pub use pipeline::{InterviewPipeline, PipelineOutcome};
pub use session::{RealtimeSession, SessionManager, SessionState};
pub use session_context::SessionContext;
