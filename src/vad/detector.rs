//! Voice activity detection over spectral frames.
//!
//! Classifies each analysis frame by how much energy sits in the
//! human-voice fundamental band, then runs a debounced onset/offset
//! state machine over the frame classifications.

use crate::audio::spectrum::SpectrumAnalyzer;
use crate::config::VadConfig;
use crate::defaults;
use std::time::{Duration, Instant};

/// Trait for time operations, allowing mock time in tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Real system clock using `std::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Mock clock for tests that advance time manually.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct MockClock {
    current: std::sync::Arc<std::sync::Mutex<Instant>>,
}

#[cfg(test)]
impl MockClock {
    pub fn new() -> Self {
        Self {
            current: std::sync::Arc::new(std::sync::Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap();
        *current += duration;
    }
}

#[cfg(test)]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.current.lock().unwrap()
    }
}

/// Discrete voice events after debounce confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEvent {
    /// A voice window opened. Fires synchronously, no onset debounce.
    Onset,
    /// A voice window closed after confirmed silence. Carries the
    /// window duration measured at the silence transition.
    Offset { duration: Duration },
}

/// Per-frame spectral classification.
#[derive(Debug, Clone, Copy)]
pub struct FrameAnalysis {
    /// Average byte magnitude across all bins.
    pub average: f32,
    /// Percentage of voice-band bins above the per-bin threshold.
    pub band_percent: f32,
    /// Frame-level voice decision.
    pub has_voice: bool,
}

/// Voice activity detector state machine.
pub struct VoiceDetector<C: Clock = SystemClock> {
    config: VadConfig,
    analyser: SpectrumAnalyzer,
    /// Inclusive bin index range covering the voice band.
    band_bins: std::ops::RangeInclusive<usize>,
    window_start: Option<Instant>,
    /// Silence transition instant plus the duration confirmed at it.
    pending_offset: Option<(Instant, Duration)>,
    clock: C,
}

impl VoiceDetector<SystemClock> {
    pub fn new(config: VadConfig, sample_rate: u32) -> Self {
        Self::with_clock(config, sample_rate, SystemClock)
    }
}

impl<C: Clock> VoiceDetector<C> {
    pub fn with_clock(config: VadConfig, sample_rate: u32, clock: C) -> Self {
        let analyser = SpectrumAnalyzer::new(defaults::VAD_FFT_SIZE, sample_rate);
        let bin_hz = sample_rate as f32 / defaults::VAD_FFT_SIZE as f32;
        let first = (config.band_min_hz / bin_hz).ceil() as usize;
        let last = (config.band_max_hz / bin_hz).floor() as usize;
        let last = last.min(analyser.bin_count().saturating_sub(1));

        Self {
            config,
            analyser,
            band_bins: first..=last,
            window_start: None,
            pending_offset: None,
            clock,
        }
    }

    /// Classifies one frame of samples without advancing the state
    /// machine.
    pub fn analyze_frame(&mut self, samples: &[i16]) -> FrameAnalysis {
        self.analyser.feed(samples);
        let bins = self.analyser.frequency_bins();

        let band = &bins[self.band_bins.clone()];
        let voiced = band
            .iter()
            .filter(|&&b| b as f32 > self.config.voice_threshold)
            .count();
        let band_percent = if band.is_empty() {
            0.0
        } else {
            voiced as f32 / band.len() as f32 * 100.0
        };

        let average = self.analyser.average_level();
        let has_voice = band_percent > self.config.min_band_percent
            && average > self.config.voice_threshold;

        FrameAnalysis {
            average,
            band_percent,
            has_voice,
        }
    }

    /// Processes one frame of samples, returning any confirmed event.
    pub fn process(&mut self, samples: &[i16]) -> Option<VoiceEvent> {
        let analysis = self.analyze_frame(samples);
        self.update(analysis.has_voice)
    }

    /// Advances the state machine with a precomputed frame decision.
    ///
    /// Onset fires immediately. A window shorter than the minimum voice
    /// duration is discarded as noise with no offset. Otherwise the
    /// offset waits out the silence debounce and is cancelled if voice
    /// resumes first.
    pub fn update(&mut self, has_voice: bool) -> Option<VoiceEvent> {
        let now = self.clock.now();

        if has_voice {
            if self.window_start.is_none() {
                self.window_start = Some(now);
                return Some(VoiceEvent::Onset);
            }
            // Voice resumed within the debounce: the window continues
            // uninterrupted.
            self.pending_offset = None;
            return None;
        }

        let start = self.window_start?;

        match self.pending_offset {
            None => {
                let elapsed = now.duration_since(start);
                if elapsed < Duration::from_millis(self.config.min_voice_duration_ms as u64) {
                    // Too short to be speech; drop silently.
                    self.window_start = None;
                } else {
                    self.pending_offset = Some((now, elapsed));
                }
                None
            }
            Some((since, duration)) => {
                let silence = now.duration_since(since);
                if silence >= Duration::from_millis(self.config.offset_silence_ms as u64) {
                    self.window_start = None;
                    self.pending_offset = None;
                    Some(VoiceEvent::Offset { duration })
                } else {
                    None
                }
            }
        }
    }

    /// True from onset until the offset is confirmed.
    pub fn is_voice_active(&self) -> bool {
        self.window_start.is_some()
    }

    /// Resets the detector to silence.
    pub fn reset(&mut self) {
        self.window_start = None;
        self.pending_offset = None;
        self.analyser.reset();
    }
}
