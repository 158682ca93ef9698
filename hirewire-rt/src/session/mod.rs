//! Realtime interview session
//!
//! - `state`: session snapshot and partial updates
//! - `control`: control-channel wire format
//! - `transition`: pure event → update function
//! - `machine`: negotiation and the supervising driver task
//! - `scoring`: local fallback score
//! - `diagnostics`: rolling connection statistics

pub mod control;
pub mod diagnostics;
pub mod machine;
pub mod scoring;
pub mod state;
pub mod transition;

pub use control::{ControlEvent, ControlEventKind, OutboundMessage};
pub use machine::{RealtimeSession, SessionManager, SessionOptions, SessionSettings, StateCallback};
pub use scoring::FallbackScoring;
pub use state::{ConnectionDiagnostics, ScoreBreakdown, SessionState, StateUpdate};
pub use transition::transition;
