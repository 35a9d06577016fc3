//! Capture state machine: amplitude polling, re-entrancy guard, and the
//! record/classify cycle.

use crate::audio::level::LevelMonitor;
use crate::config::DetectorConfig;
use crate::detect::recorder::{ClipAdvisory, ClipRecorder};
use crate::dispatch::Dispatcher;
use crate::error::{AurisError, Result};
use crate::gate::ListeningGate;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lifecycle state of the machine. Idle and Detecting are the same
/// waiting state; the machine cycles indefinitely and has no terminal
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Detecting,
    Recording,
    Processing,
}

/// User-visible status line, mirrored after every transition.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorStatus {
    Monitoring,
    Recording,
    Processing,
    /// Processing an undersized clip flagged as likely silence.
    LikelySilence,
    ListeningDisabled,
    Error(String),
}

impl fmt::Display for DetectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorStatus::Monitoring => write!(f, "Monitoring sounds"),
            DetectorStatus::Recording => write!(f, "Recording sound event"),
            DetectorStatus::Processing => write!(f, "Processing audio"),
            DetectorStatus::LikelySilence => {
                write!(f, "Processing audio (likely silence)")
            }
            DetectorStatus::ListeningDisabled => write!(f, "Listening mode disabled"),
            DetectorStatus::Error(message) => write!(f, "Error: {message}"),
        }
    }
}

/// Polls the level monitor and runs one full capture cycle per trigger.
///
/// The re-entrancy guard is a flag independent of the state enum: state
/// transitions may lag the recording lifecycle as observed by the poll
/// loop, so the guard alone decides whether a new capture may start.
/// Captures are strictly serialized; the guard clears only after the
/// dispatcher resolves, success or failure.
pub struct CaptureMachine {
    monitor: Arc<LevelMonitor>,
    dispatcher: Arc<Dispatcher>,
    gate: ListeningGate,
    guard: Arc<AtomicBool>,
    recorder: ClipRecorder,
    threshold: f32,
    poll_interval: Duration,
    state: DetectorState,
    status: Arc<Mutex<DetectorStatus>>,
    runtime: tokio::runtime::Runtime,
}

impl CaptureMachine {
    pub fn new(
        monitor: Arc<LevelMonitor>,
        dispatcher: Arc<Dispatcher>,
        gate: ListeningGate,
        config: &DetectorConfig,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AurisError::Other(format!("Failed to build dispatch runtime: {e}")))?;

        let recorder = ClipRecorder::new(config.clip_duration_ms, monitor.sample_rate())
            .with_min_clip_bytes(config.min_clip_bytes);

        Ok(Self {
            monitor,
            dispatcher,
            gate,
            guard: Arc::new(AtomicBool::new(false)),
            recorder,
            threshold: config.level_threshold,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            state: DetectorState::Detecting,
            status: Arc::new(Mutex::new(DetectorStatus::Monitoring)),
            runtime,
        })
    }

    /// Shares a guard across machine instances, so at most one capture
    /// is in flight system-wide.
    pub fn with_guard(mut self, guard: Arc<AtomicBool>) -> Self {
        self.guard = guard;
        self
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn status(&self) -> DetectorStatus {
        self.status
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|_| DetectorStatus::Error("status lock poisoned".to_string()))
    }

    /// Shared status cell, readable while the machine runs on its own
    /// thread.
    pub fn status_handle(&self) -> Arc<Mutex<DetectorStatus>> {
        Arc::clone(&self.status)
    }

    /// One poll tick against the monitor's current amplitude.
    pub fn tick(&mut self) {
        self.tick_at(self.monitor.current_level());
    }

    /// One poll tick against an explicit amplitude reading.
    ///
    /// When the gate is off, threshold evaluation stops but nothing
    /// in flight is cancelled. When the trigger fires, the entire
    /// record/classify cycle runs within this call, and the guard is
    /// held for its full duration.
    pub fn tick_at(&mut self, level: f32) {
        if !self.gate.is_enabled() {
            self.set_status(DetectorStatus::ListeningDisabled);
            return;
        }

        if level <= self.threshold {
            // An error status from a failed cycle stays visible to
            // hosts until the next capture trigger.
            if self.state == DetectorState::Detecting
                && !matches!(self.status(), DetectorStatus::Error(_))
            {
                self.set_status(DetectorStatus::Monitoring);
            }
            return;
        }

        // Same-tick race: the trigger may fire again before a state
        // change is visible. Only the guard decides.
        if self
            .guard
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let completed = self.run_capture_cycle();

        self.guard.store(false, Ordering::SeqCst);
        self.state = DetectorState::Detecting;
        // A cycle that died during recording leaves its error status in
        // place; only a resolved cycle resets the status line.
        if completed {
            if self.gate.is_enabled() {
                self.set_status(DetectorStatus::Monitoring);
            } else {
                self.set_status(DetectorStatus::ListeningDisabled);
            }
        }
    }

    /// Record, then hand off to the dispatcher. Any failure ends the
    /// cycle; a clip is never retried.
    ///
    /// Returns false when recording itself failed and the error status
    /// should remain visible.
    fn run_capture_cycle(&mut self) -> bool {
        self.state = DetectorState::Recording;
        self.set_status(DetectorStatus::Recording);

        let clip = match self
            .monitor
            .with_source(|source| self.recorder.record(source.as_mut()))
        {
            Ok(clip) => clip,
            Err(AurisError::EmptyCapture) => {
                self.set_status(DetectorStatus::Error("empty capture".to_string()));
                return false;
            }
            Err(e) => {
                eprintln!("auris: clip recording failed: {e}");
                self.set_status(DetectorStatus::Error(e.to_string()));
                return false;
            }
        };

        self.state = DetectorState::Processing;
        if clip.advisory == Some(ClipAdvisory::LikelySilence) {
            self.set_status(DetectorStatus::LikelySilence);
        } else {
            self.set_status(DetectorStatus::Processing);
        }

        match self.runtime.block_on(self.dispatcher.dispatch(&clip)) {
            Ok(_) => {}
            Err(AurisError::AuthExpired) => {
                eprintln!("auris: session credentials expired, capture aborted");
            }
            Err(e) => {
                eprintln!("auris: classification failed: {e}");
            }
        }
        true
    }

    fn set_status(&self, status: DetectorStatus) {
        if let Ok(mut s) = self.status.lock() {
            *s = status;
        }
    }

    /// Moves the machine onto its own poll thread.
    pub fn spawn(mut self) -> DetectorHandle {
        let running = Arc::new(AtomicBool::new(true));
        let status = self.status_handle();
        let interval = self.poll_interval;

        let thread = {
            let running = Arc::clone(&running);
            thread::spawn(move || {
                while running.load(Ordering::SeqCst) {
                    self.tick();
                    thread::sleep(interval);
                }
            })
        };

        DetectorHandle {
            running,
            status,
            thread: Some(thread),
        }
    }
}

/// Handle to a running capture machine.
pub struct DetectorHandle {
    running: Arc<AtomicBool>,
    status: Arc<Mutex<DetectorStatus>>,
    thread: Option<JoinHandle<()>>,
}

impl DetectorHandle {
    /// Latest status line from the poll thread.
    pub fn status(&self) -> DetectorStatus {
        self.status
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|_| DetectorStatus::Error("status lock poisoned".to_string()))
    }

    /// Signals shutdown and joins the poll thread.
    ///
    /// An in-flight capture cycle finishes before the thread observes
    /// the flag; stop blocks until it does.
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
            eprintln!("auris: detector thread panicked: {msg}");
        }
    }
}

impl Drop for DetectorHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::MockAudioSource;
    use crate::dispatch::test_support::{verdict, MockClassifier};
    use crate::dispatch::{CollectorSink, Dispatcher};

    fn test_config() -> DetectorConfig {
        DetectorConfig {
            level_threshold: 60.0,
            // Short clips keep sample-count collection instant with the mock.
            clip_duration_ms: 100,
            poll_interval_ms: 10,
            min_clip_bytes: 64,
        }
    }

    struct Fixture {
        machine: CaptureMachine,
        classifier: Arc<MockClassifier>,
        sink: CollectorSink,
    }

    fn fixture(source: MockAudioSource, responses: Vec<Result<crate::dispatch::Verdict>>) -> Fixture {
        fixture_with(source, responses, test_config(), ListeningGate::new(true))
    }

    fn fixture_with(
        source: MockAudioSource,
        responses: Vec<Result<crate::dispatch::Verdict>>,
        config: DetectorConfig,
        gate: ListeningGate,
    ) -> Fixture {
        let monitor = Arc::new(LevelMonitor::new(Box::new(source), 16000));
        let classifier = Arc::new(MockClassifier::returning(responses));
        let sink = CollectorSink::new();
        let dispatcher = Arc::new(Dispatcher::new(classifier.clone(), Arc::new(sink.clone())));
        let machine = CaptureMachine::new(monitor, dispatcher, gate, &config).unwrap();
        Fixture {
            machine,
            classifier,
            sink,
        }
    }

    #[test]
    fn test_below_threshold_does_nothing() {
        let mut f = fixture(MockAudioSource::new(), vec![Ok(verdict("Siren"))]);

        f.machine.tick_at(30.0);

        assert_eq!(f.machine.state(), DetectorState::Detecting);
        assert_eq!(f.classifier.call_count(), 0);
        assert_eq!(f.machine.status(), DetectorStatus::Monitoring);
    }

    #[test]
    fn test_trigger_runs_full_cycle_and_publishes() {
        let mut f = fixture(
            MockAudioSource::new().with_samples(vec![500i16; 1600]),
            vec![Ok(verdict("Siren"))],
        );

        f.machine.tick_at(80.0);

        assert_eq!(f.classifier.call_count(), 1);
        assert_eq!(f.sink.collected().len(), 1);
        assert_eq!(f.sink.collected()[0].sound_type, "Siren");
        // Cycle resolved: guard cleared, back to Detecting.
        assert_eq!(f.machine.state(), DetectorState::Detecting);
        assert!(!f.machine.guard.load(Ordering::SeqCst));
        assert_eq!(f.machine.status(), DetectorStatus::Monitoring);
    }

    #[test]
    fn test_irrelevant_verdict_not_published_but_cycle_completes() {
        let mut f = fixture(
            MockAudioSource::new().with_samples(vec![500i16; 1600]),
            vec![Ok(verdict("Silence"))],
        );

        f.machine.tick_at(80.0);

        assert_eq!(f.classifier.call_count(), 1);
        assert!(f.sink.collected().is_empty());
        assert_eq!(f.machine.state(), DetectorState::Detecting);
    }

    #[test]
    fn test_gate_disabled_stops_evaluation() {
        let gate = ListeningGate::new(false);
        let mut f = fixture_with(
            MockAudioSource::new().with_samples(vec![500i16; 1600]),
            vec![Ok(verdict("Siren"))],
            test_config(),
            gate,
        );

        f.machine.tick_at(200.0);

        assert_eq!(f.classifier.call_count(), 0);
        assert_eq!(f.machine.status(), DetectorStatus::ListeningDisabled);
    }

    #[test]
    fn test_held_guard_blocks_new_capture() {
        let guard = Arc::new(AtomicBool::new(true));
        let f = fixture(
            MockAudioSource::new().with_samples(vec![500i16; 1600]),
            vec![Ok(verdict("Siren"))],
        );
        let mut machine = f.machine.with_guard(guard);

        machine.tick_at(200.0);

        assert_eq!(f.classifier.call_count(), 0);
    }

    #[test]
    fn test_empty_capture_skips_upload() {
        let config = DetectorConfig {
            clip_duration_ms: 30,
            ..test_config()
        };
        let mut f = fixture_with(
            MockAudioSource::new().with_samples(Vec::new()),
            vec![Ok(verdict("Siren"))],
            config,
            ListeningGate::new(true),
        );

        f.machine.tick_at(80.0);

        assert_eq!(f.classifier.call_count(), 0);
        assert_eq!(
            f.machine.status(),
            DetectorStatus::Error("empty capture".to_string())
        );
        // Guard cleared, machine resumes.
        assert!(!f.machine.guard.load(Ordering::SeqCst));
        assert_eq!(f.machine.state(), DetectorState::Detecting);
    }

    #[test]
    fn test_empty_capture_error_stays_visible_until_next_trigger() {
        let config = DetectorConfig {
            clip_duration_ms: 30,
            ..test_config()
        };
        let mut f = fixture_with(
            MockAudioSource::new().with_samples(Vec::new()),
            vec![Ok(verdict("Siren"))],
            config,
            ListeningGate::new(true),
        );

        f.machine.tick_at(80.0);
        assert_eq!(
            f.machine.status(),
            DetectorStatus::Error("empty capture".to_string())
        );

        // Quiet polling does not wash the error away.
        f.machine.tick_at(10.0);
        f.machine.tick_at(10.0);
        assert_eq!(
            f.machine.status(),
            DetectorStatus::Error("empty capture".to_string())
        );
        // Polling itself keeps running.
        assert_eq!(f.machine.state(), DetectorState::Detecting);
        assert!(!f.machine.guard.load(Ordering::SeqCst));
    }

    #[test]
    fn test_classifier_failure_never_stalls_machine() {
        let mut f = fixture(
            MockAudioSource::new().with_samples(vec![500i16; 1600]),
            vec![
                Err(AurisError::Upload {
                    message: "connection refused".to_string(),
                }),
                Ok(verdict("Dog")),
            ],
        );

        f.machine.tick_at(80.0);
        assert!(f.sink.collected().is_empty());
        assert!(!f.machine.guard.load(Ordering::SeqCst));

        // The failed clip is never retried; the next trigger starts fresh.
        f.machine.tick_at(80.0);
        assert_eq!(f.classifier.call_count(), 2);
        assert_eq!(f.sink.collected().len(), 1);
        assert_eq!(f.sink.collected()[0].sound_type, "Dog");
    }

    #[test]
    fn test_auth_expiry_clears_guard() {
        let mut f = fixture(
            MockAudioSource::new().with_samples(vec![500i16; 1600]),
            vec![Err(AurisError::AuthExpired)],
        );

        f.machine.tick_at(80.0);

        assert!(!f.machine.guard.load(Ordering::SeqCst));
        assert_eq!(f.machine.state(), DetectorState::Detecting);
    }

    #[test]
    fn test_undersized_clip_reported_as_likely_silence_but_uploaded() {
        let config = DetectorConfig {
            clip_duration_ms: 100,
            min_clip_bytes: 1_000_000,
            ..test_config()
        };
        let mut f = fixture_with(
            MockAudioSource::new().with_samples(vec![5i16; 1600]),
            vec![Ok(verdict("Dog"))],
            config,
            ListeningGate::new(true),
        );

        f.machine.tick_at(80.0);

        // Advisory does not suppress the upload.
        assert_eq!(f.classifier.call_count(), 1);
        assert_eq!(f.sink.collected().len(), 1);
    }

    #[test]
    fn test_spawn_and_stop() {
        let f = fixture(
            MockAudioSource::new().with_samples(vec![0i16; 160]),
            Vec::new(),
        );

        let handle = f.machine.spawn();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(handle.status(), DetectorStatus::Monitoring);
        handle.stop();
    }

    #[test]
    fn test_status_display_strings() {
        assert_eq!(DetectorStatus::Monitoring.to_string(), "Monitoring sounds");
        assert_eq!(
            DetectorStatus::ListeningDisabled.to_string(),
            "Listening mode disabled"
        );
        assert_eq!(
            DetectorStatus::Error("boom".to_string()).to_string(),
            "Error: boom"
        );
    }
}
