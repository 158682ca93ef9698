//! Scripted peer connection, control channel and signaling service

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use hirewire_rt::media::{MediaStream, MediaTrack};
use hirewire_rt::peer::{
    ConnectionStats, DataChannel, IceConnectionState, PeerConnection, PeerEvent, PeerFactory,
};
use hirewire_rt::signaling::{Credential, Signaling};
use hirewire_rt::{Error, Result};

pub struct FakeDataChannel {
    label: String,
    open: AtomicBool,
    sent: Mutex<Vec<String>>,
}

impl FakeDataChannel {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            open: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect()
    }

    pub fn sent_types(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|v| v["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

#[async_trait]
impl DataChannel for FakeDataChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send_text(&self, text: String) -> Result<()> {
        if !self.is_open() {
            return Err(Error::Transport("channel not open".to_string()));
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }
}

pub struct FakePeer {
    events_tx: mpsc::UnboundedSender<PeerEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<PeerEvent>>>,
    channel: Mutex<Option<Arc<FakeDataChannel>>>,
    added_tracks: Mutex<Vec<MediaTrack>>,
    recvonly_audio: AtomicBool,
    offers: Mutex<Vec<bool>>,
    local_descriptions: Mutex<Vec<String>>,
    remote_descriptions: Mutex<Vec<String>>,
    stats: Mutex<ConnectionStats>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl FakePeer {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            events_tx: tx,
            events_rx: Mutex::new(Some(rx)),
            channel: Mutex::new(None),
            added_tracks: Mutex::new(Vec::new()),
            recvonly_audio: AtomicBool::new(false),
            offers: Mutex::new(Vec::new()),
            local_descriptions: Mutex::new(Vec::new()),
            remote_descriptions: Mutex::new(Vec::new()),
            stats: Mutex::new(ConnectionStats::default()),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        })
    }

    pub fn emit(&self, event: PeerEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn ice(&self, state: IceConnectionState) {
        self.emit(PeerEvent::IceConnectionStateChange(state));
    }

    pub fn open_channel(&self) {
        self.channel().set_open(true);
        self.emit(PeerEvent::ChannelOpen);
    }

    /// Deliver a control message as the remote side would
    pub fn control(&self, message: Value) {
        self.emit(PeerEvent::ChannelMessage(message.to_string()));
    }

    pub fn remote_track(&self, stream: MediaStream) {
        self.emit(PeerEvent::RemoteTrack(stream));
    }

    pub fn channel(&self) -> Arc<FakeDataChannel> {
        self.channel
            .lock()
            .unwrap()
            .clone()
            .expect("control channel not created")
    }

    pub fn set_stats(&self, stats: ConnectionStats) {
        *self.stats.lock().unwrap() = stats;
    }

    pub fn added_tracks(&self) -> Vec<MediaTrack> {
        self.added_tracks.lock().unwrap().clone()
    }

    pub fn has_recvonly_audio(&self) -> bool {
        self.recvonly_audio.load(Ordering::SeqCst)
    }

    /// ICE-restart flag of each offer created
    pub fn offers(&self) -> Vec<bool> {
        self.offers.lock().unwrap().clone()
    }

    pub fn remote_descriptions(&self) -> Vec<String> {
        self.remote_descriptions.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerConnection for FakePeer {
    fn add_track(&self, track: &MediaTrack, _stream: &MediaStream) -> Result<()> {
        self.added_tracks.lock().unwrap().push(track.clone());
        Ok(())
    }

    fn add_recvonly_audio_transceiver(&self) -> Result<()> {
        self.recvonly_audio.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>> {
        let channel = Arc::new(FakeDataChannel::new(label));
        *self.channel.lock().unwrap() = Some(Arc::clone(&channel));
        Ok(channel)
    }

    async fn create_offer(&self, ice_restart: bool) -> Result<String> {
        let mut offers = self.offers.lock().unwrap();
        offers.push(ice_restart);
        Ok(format!("v=0 offer-{}", offers.len()))
    }

    async fn set_local_description(&self, sdp: &str) -> Result<()> {
        self.local_descriptions.lock().unwrap().push(sdp.to_string());
        Ok(())
    }

    async fn set_remote_description(&self, sdp: &str) -> Result<()> {
        self.remote_descriptions.lock().unwrap().push(sdp.to_string());
        Ok(())
    }

    async fn get_stats(&self) -> Result<ConnectionStats> {
        Ok(self.stats.lock().unwrap().clone())
    }

    fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<PeerEvent>> {
        self.events_rx.lock().unwrap().take()
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out the same scripted peer
pub struct FakePeerFactory {
    peer: Arc<FakePeer>,
}

impl FakePeerFactory {
    pub fn new(peer: Arc<FakePeer>) -> Arc<Self> {
        Arc::new(Self { peer })
    }
}

impl PeerFactory for FakePeerFactory {
    fn create(&self) -> Result<Arc<dyn PeerConnection>> {
        Ok(Arc::clone(&self.peer) as Arc<dyn PeerConnection>)
    }
}

pub struct FakeSignaling {
    fail_credential: AtomicBool,
    exchanges: AtomicUsize,
}

impl FakeSignaling {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_credential: AtomicBool::new(false),
            exchanges: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        let signaling = Self::new();
        signaling.fail_credential.store(true, Ordering::SeqCst);
        signaling
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_credential.store(failing, Ordering::SeqCst);
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Signaling for FakeSignaling {
    async fn fetch_credential(&self, _application_id: &str) -> Result<Credential> {
        if self.fail_credential.load(Ordering::SeqCst) {
            return Err(Error::Signaling {
                status: 503,
                body: "token service unavailable".to_string(),
            });
        }
        Ok(Credential {
            token: "ephemeral-token".to_string(),
            sdp_url: "http://signaling.test/sdp".to_string(),
            expires_at: None,
        })
    }

    async fn exchange_sdp(&self, _credential: &Credential, _offer_sdp: &str) -> Result<String> {
        let n = self.exchanges.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("v=0 answer-{}", n))
    }
}
