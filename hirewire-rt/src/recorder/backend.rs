//! Capture and encoder seams
//!
//! The recorder never touches page elements or encoders directly. A
//! `CaptureBackend` provides region capture and encoders; a `RecorderSink`
//! is one running encoder.

use crate::error::Result;
use crate::media::MediaStream;

pub trait CaptureBackend: Send + Sync {
    /// Capture the page region matched by `selector`
    ///
    /// `Ok(None)` means region capture is unsupported here.
    fn capture_region(&self, selector: &str, frame_rate: u32) -> Result<Option<MediaStream>>;

    fn is_mime_supported(&self, mime_type: &str) -> bool;

    /// Start encoding `stream`
    fn create_recorder(
        &self,
        stream: &MediaStream,
        mime_type: &str,
    ) -> Result<Box<dyn RecorderSink>>;
}

/// A running encoder
///
/// Encoders do not tolerate track swaps; replacing an input means stopping
/// this sink and creating another.
pub trait RecorderSink: Send {
    /// Encoded bytes produced since the previous call
    fn take_data(&mut self) -> Result<Vec<u8>>;

    /// Stop encoding and return the final bytes
    fn stop(&mut self) -> Result<Vec<u8>>;
}
