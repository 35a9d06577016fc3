//! Continuous amplitude monitoring over a live audio source.
//!
//! The monitor owns the input handle and its analysis graph exclusively;
//! other components read only the derived amplitude value via
//! [`LevelMonitor::current_level`]. Opened and closed by exactly one
//! owner per pipeline instance.

use crate::audio::source::AudioSource;
use crate::audio::spectrum::SpectrumAnalyzer;
use crate::defaults;
use crate::error::{AurisError, Result};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lifecycle status of a monitor instance.
///
/// `Error` is terminal: a monitor that failed to open (typically denied
/// microphone access) performs no retries.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorStatus {
    /// Not yet opened, or closed after use.
    Closed,
    /// Sampling loop running, `current_level()` live.
    Open,
    /// Terminal failure, with a user-visible reason.
    Error(String),
}

/// Coarse amplitude bucket for display meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelBand {
    Quiet,
    Moderate,
    Loud,
    Intense,
}

impl LevelBand {
    /// Classifies a 0–255 amplitude into its display bucket.
    pub fn from_level(level: f32) -> Self {
        if level < 40.0 {
            LevelBand::Quiet
        } else if level < 60.0 {
            LevelBand::Moderate
        } else if level < 80.0 {
            LevelBand::Loud
        } else {
            LevelBand::Intense
        }
    }
}

/// Owns a live audio source and publishes its instantaneous amplitude.
///
/// A background thread drains the source on a display-refresh cadence,
/// feeds the spectrum analyser, and stores the latest average level for
/// lock-free reads.
pub struct LevelMonitor {
    source: Arc<Mutex<Box<dyn AudioSource>>>,
    sample_rate: u32,
    sample_interval: Duration,
    /// Latest amplitude, stored as f32 bits for lock-free access.
    level: Arc<AtomicU32>,
    status: Arc<Mutex<MonitorStatus>>,
    running: Arc<AtomicBool>,
    sampler: Option<JoinHandle<()>>,
}

impl LevelMonitor {
    /// Wraps a source; the monitor takes exclusive ownership of it.
    pub fn new(source: Box<dyn AudioSource>, sample_rate: u32) -> Self {
        Self {
            source: Arc::new(Mutex::new(source)),
            sample_rate,
            sample_interval: Duration::from_millis(defaults::SAMPLE_INTERVAL_MS),
            level: Arc::new(AtomicU32::new(0f32.to_bits())),
            status: Arc::new(Mutex::new(MonitorStatus::Closed)),
            running: Arc::new(AtomicBool::new(false)),
            sampler: None,
        }
    }

    /// Overrides the sampling cadence. Tests use a short interval.
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Starts the source and the sampling loop.
    ///
    /// A denied-permission or device failure leaves the monitor in the
    /// terminal `Error` status; callers must not retry on the same
    /// instance.
    pub fn open(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        {
            let mut source = self.source.lock().map_err(|e| AurisError::AudioCapture {
                message: format!("Audio source lock poisoned: {}", e),
            })?;
            if let Err(e) = source.start() {
                self.set_status(MonitorStatus::Error(e.to_string()));
                return Err(e);
            }
        }

        self.running.store(true, Ordering::SeqCst);
        self.set_status(MonitorStatus::Open);

        let source = Arc::clone(&self.source);
        let level = Arc::clone(&self.level);
        let status = Arc::clone(&self.status);
        let running = Arc::clone(&self.running);
        let interval = self.sample_interval;
        let mut analyser = SpectrumAnalyzer::new(defaults::LEVEL_FFT_SIZE, self.sample_rate);

        self.sampler = Some(thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                let samples = match source.lock() {
                    Ok(mut src) => src.read_samples(),
                    Err(_) => break,
                };
                match samples {
                    Ok(samples) => {
                        analyser.feed(&samples);
                        level.store(analyser.average_level().to_bits(), Ordering::SeqCst);
                    }
                    Err(e) => {
                        eprintln!("Level monitor: sample read failed: {}", e);
                        if let Ok(mut s) = status.lock() {
                            *s = MonitorStatus::Error(e.to_string());
                        }
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
                thread::sleep(interval);
            }
        }));

        Ok(())
    }

    /// Capture rate of the underlying source in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Most recent amplitude sample (0–255 scale).
    pub fn current_level(&self) -> f32 {
        f32::from_bits(self.level.load(Ordering::SeqCst))
    }

    /// Display bucket for the current amplitude.
    pub fn current_band(&self) -> LevelBand {
        LevelBand::from_level(self.current_level())
    }

    /// Current lifecycle status.
    pub fn status(&self) -> MonitorStatus {
        self.status
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|_| MonitorStatus::Error("status lock poisoned".to_string()))
    }

    /// Stops the sampling loop and releases the source.
    pub fn close(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.sampler.take() {
            let _ = handle.join();
        }

        let mut source = self.source.lock().map_err(|e| AurisError::AudioCapture {
            message: format!("Audio source lock poisoned: {}", e),
        })?;
        source.stop()?;

        // A terminal error status survives close(); anything else resets.
        if let Ok(mut s) = self.status.lock()
            && !matches!(*s, MonitorStatus::Error(_))
        {
            *s = MonitorStatus::Closed;
        }
        self.level.store(0f32.to_bits(), Ordering::SeqCst);
        Ok(())
    }

    /// Hands the underlying source to a scoped caller, for bounded
    /// capture while the monitor stays open.
    pub(crate) fn with_source<T>(
        &self,
        f: impl FnOnce(&mut Box<dyn AudioSource>) -> Result<T>,
    ) -> Result<T> {
        let mut source = self.source.lock().map_err(|e| AurisError::AudioCapture {
            message: format!("Audio source lock poisoned: {}", e),
        })?;
        f(&mut source)
    }

    fn set_status(&self, status: MonitorStatus) {
        if let Ok(mut s) = self.status.lock() {
            *s = status;
        }
    }
}

impl Drop for LevelMonitor {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
