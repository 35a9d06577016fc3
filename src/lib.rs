//! auris - Ambient sound event detection and classification client
//!
//! Monitors a live microphone, captures fixed-duration clips when the
//! ambient level crosses a threshold, and ships them to a remote
//! classification service. A separate voice activity pipeline drives a
//! continuous transcription capture session.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod detect;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod vad;

// Core traits (source → detect → dispatch)
pub use audio::source::AudioSource;
pub use dispatch::classifier::Classifier;
pub use dispatch::session::SessionStore;
pub use dispatch::sink::VerdictSink;
pub use vad::session::TranscriptionCapture;

// Detection pipeline
pub use detect::machine::{CaptureMachine, DetectorHandle, DetectorState, DetectorStatus};
pub use detect::recorder::{Clip, ClipAdvisory, ClipRecorder};

// Dispatch
pub use dispatch::{AlertCategory, Dispatcher, HttpClassifier, MemorySession, Verdict};

// Monitoring and gating
pub use audio::level::{LevelBand, LevelMonitor, MonitorStatus};
pub use gate::ListeningGate;

// VAD
pub use vad::{VadHandle, VadPipeline, VoiceDetector, VoiceEvent};

// Error handling
pub use error::{AurisError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
