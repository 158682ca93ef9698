//! Region capture and encoder double
//!
//! Each encoder created is a numbered generation; its chunks carry
//! `gen{n}-{k}` payloads so tests can tell which encoder produced them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hirewire_rt::media::{MediaStream, MediaTrack};
use hirewire_rt::recorder::{CaptureBackend, RecorderSink};
use hirewire_rt::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionMode {
    Supported,
    Unsupported,
    Failing,
}

/// What one encoder generation saw
pub struct EncoderRecord {
    pub generation: usize,
    pub stream: MediaStream,
    pub mime_type: String,
    pub stopped: AtomicBool,
}

struct FakeSink {
    record: Arc<EncoderRecord>,
    produced: usize,
}

impl RecorderSink for FakeSink {
    fn take_data(&mut self) -> Result<Vec<u8>> {
        if self.record.stopped.load(Ordering::SeqCst) {
            return Err(Error::Recorder("encoder stopped".to_string()));
        }
        self.produced += 1;
        Ok(format!("gen{}-{}", self.record.generation, self.produced).into_bytes())
    }

    fn stop(&mut self) -> Result<Vec<u8>> {
        self.record.stopped.store(true, Ordering::SeqCst);
        Ok(format!("gen{}-final", self.record.generation).into_bytes())
    }
}

pub struct FakeCapture {
    region: Mutex<RegionMode>,
    supported_mime: Vec<&'static str>,
    region_tracks: Mutex<Vec<MediaTrack>>,
    encoders: Mutex<Vec<Arc<EncoderRecord>>>,
    generation: AtomicUsize,
}

impl FakeCapture {
    pub fn new(region: RegionMode) -> Arc<Self> {
        Self::with_mime(region, vec!["video/webm;codecs=vp9,opus", "video/webm"])
    }

    pub fn with_mime(region: RegionMode, supported_mime: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            region: Mutex::new(region),
            supported_mime,
            region_tracks: Mutex::new(Vec::new()),
            encoders: Mutex::new(Vec::new()),
            generation: AtomicUsize::new(0),
        })
    }

    pub fn encoders(&self) -> Vec<Arc<EncoderRecord>> {
        self.encoders.lock().unwrap().clone()
    }

    /// Tracks handed out by region capture
    pub fn region_tracks(&self) -> Vec<MediaTrack> {
        self.region_tracks.lock().unwrap().clone()
    }
}

impl CaptureBackend for FakeCapture {
    fn capture_region(&self, _selector: &str, _frame_rate: u32) -> Result<Option<MediaStream>> {
        match *self.region.lock().unwrap() {
            RegionMode::Supported => {
                let track = MediaTrack::video("interview-stage");
                self.region_tracks.lock().unwrap().push(track.clone());
                Ok(Some(MediaStream::with_tracks(vec![track])))
            }
            RegionMode::Unsupported => Ok(None),
            RegionMode::Failing => Err(Error::Recorder("captureStream threw".to_string())),
        }
    }

    fn is_mime_supported(&self, mime_type: &str) -> bool {
        self.supported_mime.iter().any(|m| *m == mime_type)
    }

    fn create_recorder(
        &self,
        stream: &MediaStream,
        mime_type: &str,
    ) -> Result<Box<dyn RecorderSink>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let record = Arc::new(EncoderRecord {
            generation,
            stream: stream.clone(),
            mime_type: mime_type.to_string(),
            stopped: AtomicBool::new(false),
        });
        self.encoders.lock().unwrap().push(Arc::clone(&record));
        Ok(Box::new(FakeSink {
            record,
            produced: 0,
        }))
    }
}
