//! Voice activity pipeline: spectral voice detection plus the debounced
//! transcription session it drives.
//!
//! Runs independently of the capture state machine, on its own input
//! stream handle, and is controlled separately from the listening gate.

pub mod detector;
pub mod session;

pub use detector::{Clock, FrameAnalysis, SystemClock, VoiceDetector, VoiceEvent};
pub use session::{SessionGate, TranscriptionCapture};

use crate::audio::source::AudioSource;
use crate::config::VadConfig;
use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Analysis frame cadence for the pipeline thread.
const FRAME_INTERVAL: Duration = Duration::from_millis(30);

/// Continuously running VAD pipeline over its own audio source.
pub struct VadPipeline;

impl VadPipeline {
    /// Starts the source and spawns the detection thread.
    ///
    /// The pipeline owns the source exclusively; the transcription
    /// capture is started and stopped through the session gate as
    /// confirmed voice windows open and close.
    pub fn spawn(
        mut source: Box<dyn AudioSource>,
        config: VadConfig,
        sample_rate: u32,
        capture: Box<dyn TranscriptionCapture>,
    ) -> Result<VadHandle> {
        source.start()?;

        let debounce_ms = config.session_debounce_ms;
        let mut detector = VoiceDetector::new(config, sample_rate);
        let mut gate = SessionGate::new(capture, debounce_ms);
        let running = Arc::new(AtomicBool::new(true));

        let thread = {
            let running = Arc::clone(&running);
            thread::spawn(move || {
                while running.load(Ordering::SeqCst) {
                    match source.read_samples() {
                        Ok(samples) => {
                            if !samples.is_empty() {
                                detector.process(&samples);
                            } else {
                                // An empty drain still advances the
                                // debounce timers.
                                detector.update(false);
                            }
                        }
                        Err(e) => {
                            eprintln!("auris: vad sample read failed: {e}");
                            break;
                        }
                    }
                    if let Err(e) = gate.update(detector.is_voice_active()) {
                        eprintln!("auris: transcription session error: {e}");
                    }
                    thread::sleep(FRAME_INTERVAL);
                }
                if let Err(e) = source.stop() {
                    eprintln!("auris: vad source stop failed: {e}");
                }
            })
        };

        Ok(VadHandle {
            running,
            thread: Some(thread),
        })
    }
}

/// Handle to a running VAD pipeline.
pub struct VadHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl VadHandle {
    /// Signals shutdown and joins the pipeline thread.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take()
            && let Err(panic_info) = thread.join()
        {
            let msg = panic_info
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                .unwrap_or("unknown panic");
            eprintln!("auris: vad thread panicked: {msg}");
        }
    }
}

impl Drop for VadHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
