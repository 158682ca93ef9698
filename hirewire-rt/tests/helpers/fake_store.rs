//! Remote storage and session endpoint doubles

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use hirewire_rt::signaling::{SessionLifecycle, SessionResult};
use hirewire_rt::upload::{BlockStore, FinalizeRequest, UploadBlock};
use hirewire_rt::{Error, Result};

#[derive(Default)]
pub struct FakeBlockStore {
    stored: Mutex<Vec<u64>>,
    attempts: Mutex<Vec<u64>>,
    commits: Mutex<Vec<FinalizeRequest>>,
    failing: Mutex<HashSet<u64>>,
    hanging: Mutex<HashSet<u64>>,
    delays: Mutex<HashMap<u64, Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads of these sequence indices fail
    pub fn fail_on(self, indices: &[u64]) -> Self {
        self.failing.lock().unwrap().extend(indices);
        self
    }

    /// Uploads of these sequence indices never complete
    pub fn hang_on(self, indices: &[u64]) -> Self {
        self.hanging.lock().unwrap().extend(indices);
        self
    }

    pub fn delay(self, index: u64, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(index, delay);
        self
    }

    /// Sequence indices stored, in completion order
    pub fn stored(&self) -> Vec<u64> {
        self.stored.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> Vec<u64> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn commits(&self) -> Vec<FinalizeRequest> {
        self.commits.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockStore for FakeBlockStore {
    async fn put_block(&self, _session_id: Uuid, block: &UploadBlock) -> Result<()> {
        let index = block.sequence_index;
        self.attempts.lock().unwrap().push(index);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let hang = self.hanging.lock().unwrap().contains(&index);
        if hang {
            std::future::pending::<()>().await;
        }
        let delay = self.delays.lock().unwrap().get(&index).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&index) {
            return Err(Error::Upload {
                status: 500,
                body: "storage unavailable".to_string(),
            });
        }
        self.stored.lock().unwrap().push(index);
        Ok(())
    }

    async fn commit(&self, request: &FinalizeRequest) -> Result<()> {
        self.commits.lock().unwrap().push(request.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeLifecycle {
    ended: Mutex<Vec<SessionResult>>,
}

impl FakeLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ended(&self) -> Vec<SessionResult> {
        self.ended.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionLifecycle for FakeLifecycle {
    async fn start_session(&self, _application_id: &str) -> Result<Uuid> {
        Ok(Uuid::new_v4())
    }

    async fn end_session(&self, result: &SessionResult) -> Result<()> {
        self.ended.lock().unwrap().push(result.clone());
        Ok(())
    }
}
