//! Audio mix graph
//!
//! Sums the candidate microphone and the remote AI voice into a single
//! output track for recording.
//!
//! # Architecture
//!
//! - Each input is a source track plus a gain (0.0 to 1.0, clamped)
//! - `mix` sums gain-scaled samples frame by frame and hard-limits to [-1, 1]
//! - The output track is owned by the graph and ends on `close`
//!
//! The remote AI input is attenuated relative to the microphone so the sum of
//! two loud sources stays clear of clipping.

use super::{MediaTrack, TrackKind};
use crate::error::{Error, Result};

/// Default microphone gain
pub const MICROPHONE_GAIN: f32 = 1.0;

/// Default remote AI gain
pub const AI_GAIN: f32 = 0.8;

/// One source connected to the graph
#[derive(Debug, Clone)]
pub struct MixerInput {
    pub track: MediaTrack,
    pub gain: f32,
}

/// Audio graph mixing several input tracks into one output track
#[derive(Debug)]
pub struct AudioMixGraph {
    inputs: Vec<MixerInput>,
    output: MediaTrack,
    closed: bool,
}

impl AudioMixGraph {
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            output: MediaTrack::audio("mixed-audio"),
            closed: false,
        }
    }

    /// Build the standard interview graph: microphone and, when present, AI voice
    pub fn for_interview(
        microphone: Option<&MediaTrack>,
        ai_voice: Option<&MediaTrack>,
        microphone_gain: f32,
        ai_gain: f32,
    ) -> Result<Self> {
        let mut graph = Self::new();
        if let Some(mic) = microphone {
            graph.connect(mic.clone(), microphone_gain)?;
        }
        if let Some(ai) = ai_voice {
            graph.connect(ai.clone(), ai_gain)?;
        }
        Ok(graph)
    }

    /// Connect an audio source
    ///
    /// # Errors
    /// Fails once the graph is closed or when the track is not audio.
    pub fn connect(&mut self, track: MediaTrack, gain: f32) -> Result<()> {
        if self.closed {
            return Err(Error::InvalidState("audio graph is closed".to_string()));
        }
        if track.kind() != TrackKind::Audio {
            return Err(Error::Recorder(format!(
                "cannot mix non-audio track '{}'",
                track.label()
            )));
        }
        if self.inputs.iter().any(|i| i.track == track) {
            return Ok(());
        }
        self.inputs.push(MixerInput {
            track,
            gain: gain.clamp(0.0, 1.0),
        });
        Ok(())
    }

    pub fn inputs(&self) -> &[MixerInput] {
        &self.inputs
    }

    pub fn output_track(&self) -> MediaTrack {
        self.output.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mix one block of samples
    ///
    /// `sources[i]` holds the samples of `inputs()[i]`. Sources shorter than
    /// `out` contribute silence for the missing tail; extra sources are ignored.
    pub fn mix(&self, sources: &[&[f32]], out: &mut [f32]) {
        out.iter_mut().for_each(|s| *s = 0.0);
        if self.closed {
            return;
        }

        for (input, samples) in self.inputs.iter().zip(sources.iter()) {
            if !input.track.is_live() {
                continue;
            }
            for (o, s) in out.iter_mut().zip(samples.iter()) {
                *o += s * input.gain;
            }
        }

        for o in out.iter_mut() {
            *o = o.clamp(-1.0, 1.0);
        }
    }

    /// Disconnect all inputs and end the output track; idempotent
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.inputs.clear();
        self.output.stop();
        self.closed = true;
    }
}

impl Default for AudioMixGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioMixGraph {
    fn drop(&mut self) {
        self.close();
    }
}
