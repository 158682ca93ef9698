//! Upload block identity

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::recorder::RecordingChunk;

/// Digits of zero padding before encoding; keeps every id the same length
pub const BLOCK_INDEX_WIDTH: usize = 6;

/// Block id for a chunk: base64 of its zero-padded sequence index
pub fn block_id_for(sequence_index: u64) -> String {
    STANDARD.encode(format!("{:0width$}", sequence_index, width = BLOCK_INDEX_WIDTH))
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadBlock {
    pub block_id: String,
    pub sequence_index: u64,
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl From<RecordingChunk> for UploadBlock {
    fn from(chunk: RecordingChunk) -> Self {
        Self {
            block_id: block_id_for(chunk.sequence_index),
            sequence_index: chunk.sequence_index,
            data: chunk.data,
            mime_type: chunk.mime_type,
        }
    }
}
