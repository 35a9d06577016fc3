//! Consumer-level debounce over voice activity.
//!
//! The transcription capture session is expensive to start and stop, so
//! the gate requires the voice condition to persist before acting. This
//! debounce is independent of the detector's own offset debounce: the
//! detector guards against false "voice ended" signals, this layer
//! guards against session churn on short spikes.

use crate::error::Result;
use crate::vad::detector::{Clock, SystemClock};
use std::time::{Duration, Instant};

/// A continuous capture session driven by voice activity.
pub trait TranscriptionCapture: Send {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
}

/// Starts and stops a transcription capture after the voice condition
/// has persisted for the debounce period.
pub struct SessionGate<C: Clock = SystemClock> {
    capture: Box<dyn TranscriptionCapture>,
    debounce: Duration,
    clock: C,
    session_active: bool,
    /// Desired state change awaiting persistence, with its first
    /// observation instant.
    pending: Option<(bool, Instant)>,
}

impl SessionGate<SystemClock> {
    pub fn new(capture: Box<dyn TranscriptionCapture>, debounce_ms: u32) -> Self {
        Self::with_clock(capture, debounce_ms, SystemClock)
    }
}

impl<C: Clock> SessionGate<C> {
    pub fn with_clock(capture: Box<dyn TranscriptionCapture>, debounce_ms: u32, clock: C) -> Self {
        Self {
            capture,
            debounce: Duration::from_millis(debounce_ms as u64),
            clock,
            session_active: false,
            pending: None,
        }
    }

    /// Feeds the current voice condition; starts or stops the capture
    /// once the condition has held for the full debounce period.
    pub fn update(&mut self, voice_active: bool) -> Result<()> {
        if voice_active == self.session_active {
            // Condition matches the session; any pending flip lapses.
            self.pending = None;
            return Ok(());
        }

        let now = self.clock.now();
        match self.pending {
            Some((desired, since)) if desired == voice_active => {
                if now.duration_since(since) >= self.debounce {
                    self.pending = None;
                    if voice_active {
                        self.capture.start()?;
                    } else {
                        self.capture.stop()?;
                    }
                    self.session_active = voice_active;
                }
            }
            _ => {
                self.pending = Some((voice_active, now));
            }
        }
        Ok(())
    }

    pub fn is_session_active(&self) -> bool {
        self.session_active
    }
}
