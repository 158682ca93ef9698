//! Progressive upload coordinator
//!
//! **Ordering:** chunks enter a FIFO drained by exactly one worker task, so
//! uploads complete in capture order and never overlap.
//!
//! **Failure model:** a failed chunk is logged and dropped from the final
//! manifest; the queue keeps draining. Finalization waits a bounded time for
//! in-flight blocks and then commits whatever made it.

pub mod block;
pub mod store;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use hirewire_common::config::UploadSection;
use hirewire_common::events::{EventBus, InterviewEvent};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use block::{block_id_for, UploadBlock};
pub use store::{BlockStore, FinalizeRequest, HttpBlockStore};

use crate::error::{Error, Result};
use crate::recorder::RecordingChunk;

#[derive(Debug, Clone, PartialEq)]
pub struct UploadSettings {
    pub chunk_endpoint: String,
    pub finalize_endpoint: String,
    /// Longest finalize waits for pending blocks before committing
    pub finalize_wait: Duration,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl From<&UploadSection> for UploadSettings {
    fn from(section: &UploadSection) -> Self {
        Self {
            chunk_endpoint: section.chunk_endpoint.clone(),
            finalize_endpoint: section.finalize_endpoint.clone(),
            finalize_wait: Duration::from_secs(section.finalize_wait_secs),
            poll_interval: Duration::from_millis(section.poll_interval_ms.max(1)),
            request_timeout: Duration::from_secs(section.request_timeout_secs),
        }
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self::from(&UploadSection::default())
    }
}

/// Recording facts sent with the commit
#[derive(Debug, Clone, PartialEq)]
pub struct UploadMetadata {
    pub duration: Duration,
    pub format: String,
    pub resolution: String,
    pub frame_rate: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeReport {
    /// Block ids in the commit, capture order
    pub committed: Vec<String>,
    /// Blocks still queued or in flight when the commit was issued
    pub pending_at_commit: usize,
    pub file_size: u64,
}

impl FinalizeReport {
    pub fn is_complete(&self) -> bool {
        self.pending_at_commit == 0
    }
}

#[derive(Debug, Default)]
struct Ledger {
    uploaded: Vec<String>,
    uploaded_ids: HashSet<String>,
    pending: HashSet<String>,
    failed: usize,
    bytes: u64,
}

pub struct UploadCoordinator {
    session_id: Uuid,
    store: Arc<dyn BlockStore>,
    settings: UploadSettings,
    queue: mpsc::UnboundedSender<UploadBlock>,
    ledger: Arc<Mutex<Ledger>>,
    events: EventBus,
    finalized: AtomicBool,
}

fn lock(ledger: &Mutex<Ledger>) -> MutexGuard<'_, Ledger> {
    ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl UploadCoordinator {
    /// Create the coordinator and spawn its single upload worker
    pub fn new(
        session_id: Uuid,
        store: Arc<dyn BlockStore>,
        settings: UploadSettings,
        events: EventBus,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let ledger = Arc::new(Mutex::new(Ledger::default()));

        tokio::spawn(upload_worker(
            session_id,
            Arc::clone(&store),
            Arc::clone(&ledger),
            events.clone(),
            rx,
        ));

        Self {
            session_id,
            store,
            settings,
            queue: tx,
            ledger,
            events,
            finalized: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Queue a chunk; returns its block id, or `None` when skipped
    pub fn enqueue(&self, chunk: RecordingChunk) -> Option<String> {
        if self.finalized.load(Ordering::Acquire) {
            warn!(
                session_id = %self.session_id,
                sequence_index = chunk.sequence_index,
                "Chunk arrived after finalize; dropped"
            );
            return None;
        }

        let block = UploadBlock::from(chunk);
        let block_id = block.block_id.clone();
        {
            let mut ledger = lock(&self.ledger);
            if ledger.uploaded_ids.contains(&block_id) || ledger.pending.contains(&block_id) {
                debug!(session_id = %self.session_id, block_id = %block_id, "Duplicate block skipped");
                return None;
            }
            ledger.pending.insert(block_id.clone());
        }

        if self.queue.send(block).is_err() {
            warn!(session_id = %self.session_id, block_id = %block_id, "Upload worker gone; block dropped");
            lock(&self.ledger).pending.remove(&block_id);
            return None;
        }
        debug!(session_id = %self.session_id, block_id = %block_id, "Block queued");
        Some(block_id)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.ledger).pending.len()
    }

    /// Uploaded block ids in capture order
    pub fn uploaded_blocks(&self) -> Vec<String> {
        lock(&self.ledger).uploaded.clone()
    }

    pub fn failed_count(&self) -> usize {
        lock(&self.ledger).failed
    }

    /// Wait for pending uploads (bounded), then commit the uploaded blocks
    ///
    /// Running out of wait time is not an error: the commit goes out with the
    /// blocks that made it and the shortfall is logged and reported.
    pub async fn finalize(&self, metadata: UploadMetadata) -> Result<FinalizeReport> {
        if self.finalized.swap(true, Ordering::AcqRel) {
            return Err(Error::InvalidState("upload already finalized".to_string()));
        }

        let deadline = Instant::now() + self.settings.finalize_wait;
        loop {
            let pending = self.pending_count();
            if pending == 0 {
                break;
            }
            if Instant::now() >= deadline {
                warn!(
                    session_id = %self.session_id,
                    pending = pending,
                    wait_secs = self.settings.finalize_wait.as_secs(),
                    "Finalize window elapsed with uploads pending; committing partial recording"
                );
                break;
            }
            time::sleep(self.settings.poll_interval).await;
        }

        let (committed, pending_at_commit, file_size) = {
            let ledger = lock(&self.ledger);
            (ledger.uploaded.clone(), ledger.pending.len(), ledger.bytes)
        };

        let request = FinalizeRequest {
            session_id: self.session_id,
            block_ids: committed.clone(),
            duration: metadata.duration.as_secs_f64(),
            file_size,
            format: metadata.format,
            resolution: metadata.resolution,
            frame_rate: metadata.frame_rate,
        };
        self.store.commit(&request).await?;

        info!(
            session_id = %self.session_id,
            blocks = committed.len(),
            pending = pending_at_commit,
            bytes = file_size,
            "Upload finalized"
        );
        self.events.emit_lossy(InterviewEvent::UploadFinalized {
            session_id: self.session_id,
            committed_blocks: committed.len(),
            pending_blocks: pending_at_commit,
        });

        Ok(FinalizeReport {
            committed,
            pending_at_commit,
            file_size,
        })
    }
}

async fn upload_worker(
    session_id: Uuid,
    store: Arc<dyn BlockStore>,
    ledger: Arc<Mutex<Ledger>>,
    events: EventBus,
    mut queue: mpsc::UnboundedReceiver<UploadBlock>,
) {
    debug!(session_id = %session_id, "Upload worker started");

    while let Some(block) = queue.recv().await {
        if lock(&ledger).uploaded_ids.contains(&block.block_id) {
            lock(&ledger).pending.remove(&block.block_id);
            continue;
        }

        match store.put_block(session_id, &block).await {
            Ok(()) => {
                {
                    let mut ledger = lock(&ledger);
                    ledger.pending.remove(&block.block_id);
                    ledger.uploaded_ids.insert(block.block_id.clone());
                    ledger.uploaded.push(block.block_id.clone());
                    ledger.bytes += block.data.len() as u64;
                }
                events.emit_lossy(InterviewEvent::ChunkUploaded {
                    session_id,
                    block_id: block.block_id.clone(),
                    sequence_index: block.sequence_index,
                });
                debug!(session_id = %session_id, block_id = %block.block_id, "Chunk uploaded");
            }
            Err(e) => {
                let mut ledger = lock(&ledger);
                ledger.pending.remove(&block.block_id);
                ledger.failed += 1;
                warn!(
                    session_id = %session_id,
                    block_id = %block.block_id,
                    sequence_index = block.sequence_index,
                    error = %e,
                    "Chunk upload failed; block left out of the recording"
                );
            }
        }
    }

    debug!(session_id = %session_id, "Upload worker stopped");
}
