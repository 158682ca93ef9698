//! # HireWire Common Library
//!
//! Shared code for the HireWire interview services including:
//! - Error type
//! - TOML configuration loading and path resolution
//! - Interview phase enums shared by every component
//! - Session event bus (InterviewEvent enum)

pub mod config;
pub mod error;
pub mod events;
pub mod phase;

pub use error::{Error, Result};
pub use phase::{InterviewPhase, TransportPhase};
