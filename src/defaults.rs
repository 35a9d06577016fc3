//! Default configuration constants for auris.
//!
//! Shared across configuration types to keep the tuning values in one place.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard rate for speech-oriented services and is what the
/// classification endpoint expects in uploaded clips.
pub const SAMPLE_RATE: u32 = 16000;

/// Amplitude threshold above which the capture state machine starts a clip.
///
/// Levels are byte-scaled (0–255) averages over the frequency bins, so 60.0
/// corresponds to a clearly audible event well above room tone.
pub const LEVEL_THRESHOLD: f32 = 60.0;

/// Fixed clip duration in milliseconds.
///
/// Every capture records exactly this long. The bound trades precision for
/// predictable memory use and upload size.
pub const CLIP_DURATION_MS: u32 = 3000;

/// Interval between threshold polls in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 100;

/// Interval between level monitor samples in milliseconds.
///
/// Matches a display refresh cadence so meters stay smooth.
pub const SAMPLE_INTERVAL_MS: u64 = 16;

/// Minimum encoded clip size in bytes before an upload is flagged as
/// likely silence. Clips under this are still uploaded.
pub const MIN_CLIP_BYTES: usize = 1024;

/// FFT size for the level monitor's spectrum analyser.
///
/// 256 gives 128 frequency bins, enough resolution for a loudness average
/// at negligible per-frame cost.
pub const LEVEL_FFT_SIZE: usize = 256;

/// FFT size for the voice activity detector.
///
/// 2048 gives ~8Hz bin resolution at 16kHz, needed to isolate the narrow
/// human-voice fundamental band.
pub const VAD_FFT_SIZE: usize = 2048;

/// Spectral smoothing constant (0.0 = none, values near 1.0 = heavy).
pub const SMOOTHING_CONSTANT: f32 = 0.8;

/// Per-bin byte magnitude a voice-band bin must exceed to count as voiced.
/// Also the overall average a frame must exceed to be classified as voice.
pub const VOICE_THRESHOLD: f32 = 30.0;

/// Lower edge of the human-voice fundamental band in Hz.
pub const VOICE_BAND_MIN_HZ: f32 = 85.0;

/// Upper edge of the human-voice fundamental band in Hz.
pub const VOICE_BAND_MAX_HZ: f32 = 255.0;

/// Minimum percentage of bins that must be voiced for a frame to count
/// as containing voice.
pub const VOICE_BAND_MIN_PERCENT: f32 = 5.0;

/// Minimum confirmed voice duration in milliseconds.
///
/// Windows shorter than this are discarded as noise and never produce an
/// offset event.
pub const MIN_VOICE_DURATION_MS: u32 = 500;

/// Continued silence in milliseconds before a voice window is closed.
///
/// Covers micro-pauses within speech so a breath does not end the window.
pub const OFFSET_SILENCE_MS: u32 = 1500;

/// Consumer-level debounce in milliseconds.
///
/// The transcription session only starts or stops after the voice condition
/// has persisted this long, so a single spike never churns a session.
pub const SESSION_DEBOUNCE_MS: u32 = 1000;
