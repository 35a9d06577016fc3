//! Audio input: device capture, spectral analysis, level monitoring,
//! and in-memory WAV encoding.

pub mod capture;
pub mod level;
pub mod source;
pub mod spectrum;
pub mod wav;

pub use capture::CpalAudioSource;
pub use level::{LevelBand, LevelMonitor, MonitorStatus};
pub use source::{AudioSource, MockAudioSource};
pub use spectrum::SpectrumAnalyzer;
