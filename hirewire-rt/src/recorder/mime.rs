//! Container/codec selection

use super::backend::CaptureBackend;

/// Supported by every encoder we target
pub const BASELINE_MIME_TYPE: &str = "video/webm";

/// Candidates in descending preference
pub const MIME_PREFERENCES: &[&str] = &[
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm;codecs=h264,opus",
    "video/mp4;codecs=avc1,mp4a",
    "video/mp4",
];

pub fn select_mime_type(backend: &dyn CaptureBackend) -> &'static str {
    select_from(MIME_PREFERENCES, |mime| backend.is_mime_supported(mime))
}

/// First supported candidate, else the baseline
pub fn select_from(candidates: &[&'static str], supported: impl Fn(&str) -> bool) -> &'static str {
    candidates
        .iter()
        .copied()
        .find(|mime| supported(mime))
        .unwrap_or(BASELINE_MIME_TYPE)
}

/// MIME type without codec parameters ("video/webm")
pub fn mime_essence(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or(mime_type).trim()
}

/// Container name for upload metadata ("webm", "mp4")
pub fn container_format(mime_type: &str) -> &str {
    let essence = mime_essence(mime_type);
    essence.strip_prefix("video/").unwrap_or(essence)
}
