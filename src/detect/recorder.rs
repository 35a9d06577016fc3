//! Bounded-duration clip capture into an encoded buffer.

use crate::audio::source::AudioSource;
use crate::audio::wav;
use crate::defaults;
use crate::error::{AurisError, Result};
use std::thread;
use std::time::{Duration, Instant};

/// Advisory flag attached to a clip without rejecting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipAdvisory {
    /// Encoded buffer is under the minimum byte threshold; uploaded
    /// anyway to preserve recall, flagged for the caller.
    LikelySilence,
}

/// One completed capture: an encoded WAV buffer plus its metadata.
#[derive(Debug, Clone)]
pub struct Clip {
    pub data: Vec<u8>,
    pub duration_ms: u32,
    pub sample_rate: u32,
    pub mime: String,
    pub advisory: Option<ClipAdvisory>,
}

impl Clip {
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Records a fixed-duration clip from an already-open audio source.
///
/// Collection is driven by sample count, not wall time: the recorder
/// drains the source until `duration_ms` worth of samples at the capture
/// rate have accumulated. A wall-clock deadline bounds the wait when the
/// source underdelivers.
pub struct ClipRecorder {
    duration_ms: u32,
    sample_rate: u32,
    min_clip_bytes: usize,
}

impl ClipRecorder {
    pub fn new(duration_ms: u32, sample_rate: u32) -> Self {
        Self {
            duration_ms,
            sample_rate,
            min_clip_bytes: defaults::MIN_CLIP_BYTES,
        }
    }

    /// Overrides the likely-silence byte threshold.
    pub fn with_min_clip_bytes(mut self, bytes: usize) -> Self {
        self.min_clip_bytes = bytes;
        self
    }

    /// Captures exactly `duration_ms` of audio and encodes it as WAV.
    ///
    /// A capture that yields no samples at all is a hard failure
    /// (`EmptyCapture`); an undersized encoded buffer is returned with a
    /// `LikelySilence` advisory instead.
    pub fn record(&self, source: &mut dyn AudioSource) -> Result<Clip> {
        let target = (self.duration_ms as u64 * self.sample_rate as u64 / 1000) as usize;
        let deadline =
            Instant::now() + Duration::from_millis(self.duration_ms as u64 * 2 + 250);

        // Discard whatever accumulated before the trigger tick.
        let _ = source.read_samples()?;

        let mut samples: Vec<i16> = Vec::with_capacity(target);
        while samples.len() < target {
            let chunk = source.read_samples()?;
            if chunk.is_empty() {
                if Instant::now() >= deadline {
                    break;
                }
                thread::sleep(Duration::from_millis(1));
                continue;
            }
            samples.extend_from_slice(&chunk);
        }
        samples.truncate(target);

        if samples.is_empty() {
            return Err(AurisError::EmptyCapture);
        }

        let data = wav::encode_wav(&samples, self.sample_rate)?;
        let advisory = if data.len() < self.min_clip_bytes {
            Some(ClipAdvisory::LikelySilence)
        } else {
            None
        };

        Ok(Clip {
            data,
            duration_ms: self.duration_ms,
            sample_rate: self.sample_rate,
            mime: "audio/wav".to_string(),
            advisory,
        })
    }
}
