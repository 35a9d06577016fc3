use crate::error::{AurisError, Result};

/// Trait for audio input devices.
///
/// Exactly one owner opens and closes a source per pipeline instance;
/// consumers only ever see derived amplitude/frequency values, never the
/// raw stream. The trait allows swapping implementations (real device vs
/// mock).
pub trait AudioSource: Send + Sync {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Drain buffered audio samples from the source.
    ///
    /// # Returns
    /// 16-bit PCM samples accumulated since the last read, or an error.
    fn read_samples(&mut self) -> Result<Vec<i16>>;
}

/// Mock audio source for testing.
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    is_started: bool,
    samples: Vec<i16>,
    should_fail_start: bool,
    should_fail_read: bool,
    permission_denied: bool,
    error_message: String,
}

impl MockAudioSource {
    /// Create a new mock audio source with default settings
    pub fn new() -> Self {
        Self {
            is_started: false,
            samples: vec![0i16; 160],
            should_fail_start: false,
            should_fail_read: false,
            permission_denied: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Configure the mock to return specific samples on every read
    pub fn with_samples(mut self, samples: Vec<i16>) -> Self {
        self.samples = samples;
        self
    }

    /// Configure the mock to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on read
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the mock to report denied microphone access on start
    pub fn with_permission_denied(mut self) -> Self {
        self.permission_denied = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Check if the audio source is started
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.permission_denied {
            return Err(AurisError::PermissionDenied {
                message: self.error_message.clone(),
            });
        }
        if self.should_fail_start {
            return Err(AurisError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.should_fail_read {
            Err(AurisError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            Ok(self.samples.clone())
        }
    }
}
