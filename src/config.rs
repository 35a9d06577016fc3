use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub detector: DetectorConfig,
    pub vad: VadConfig,
    pub service: ServiceConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
}

/// Capture state machine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    /// Byte-scaled amplitude (0–255) that triggers a capture.
    pub level_threshold: f32,
    /// Fixed recording duration per capture.
    pub clip_duration_ms: u32,
    /// Threshold poll cadence.
    pub poll_interval_ms: u64,
    /// Clips under this size are uploaded with a likely-silence advisory.
    pub min_clip_bytes: usize,
}

/// Voice activity detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadConfig {
    pub voice_threshold: f32,
    pub band_min_hz: f32,
    pub band_max_hz: f32,
    pub min_band_percent: f32,
    pub min_voice_duration_ms: u32,
    pub offset_silence_ms: u32,
    pub session_debounce_ms: u32,
}

/// Classification service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    /// Bearer credential; usually injected via AURIS_TOKEN instead.
    pub token: Option<String>,
    /// Upload timeout. None leaves uploads unbounded; setting it bounds
    /// how long the capture guard can be held by a slow network.
    pub request_timeout_secs: Option<u64>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            level_threshold: defaults::LEVEL_THRESHOLD,
            clip_duration_ms: defaults::CLIP_DURATION_MS,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            min_clip_bytes: defaults::MIN_CLIP_BYTES,
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            voice_threshold: defaults::VOICE_THRESHOLD,
            band_min_hz: defaults::VOICE_BAND_MIN_HZ,
            band_max_hz: defaults::VOICE_BAND_MAX_HZ,
            min_band_percent: defaults::VOICE_BAND_MIN_PERCENT,
            min_voice_duration_ms: defaults::MIN_VOICE_DURATION_MS,
            offset_silence_ms: defaults::OFFSET_SILENCE_MS,
            session_debounce_ms: defaults::SESSION_DEBOUNCE_MS,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            token: None,
            request_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - AURIS_API_URL → service.base_url
    /// - AURIS_TOKEN → service.token
    /// - AURIS_AUDIO_DEVICE → audio.device
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("AURIS_API_URL")
            && !url.is_empty()
        {
            self.service.base_url = url;
        }

        if let Ok(token) = std::env::var("AURIS_TOKEN")
            && !token.is_empty()
        {
            self.service.token = Some(token);
        }

        if let Ok(device) = std::env::var("AURIS_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/auris/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("auris")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_auris_env() {
        remove_env("AURIS_API_URL");
        remove_env("AURIS_TOKEN");
        remove_env("AURIS_AUDIO_DEVICE");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.audio.device, None);
        assert_eq!(config.audio.sample_rate, 16000);

        assert_eq!(config.detector.level_threshold, 60.0);
        assert_eq!(config.detector.clip_duration_ms, 3000);
        assert_eq!(config.detector.poll_interval_ms, 100);
        assert_eq!(config.detector.min_clip_bytes, 1024);

        assert_eq!(config.vad.voice_threshold, 30.0);
        assert_eq!(config.vad.band_min_hz, 85.0);
        assert_eq!(config.vad.band_max_hz, 255.0);
        assert_eq!(config.vad.min_band_percent, 5.0);
        assert_eq!(config.vad.min_voice_duration_ms, 500);
        assert_eq!(config.vad.offset_silence_ms, 1500);
        assert_eq!(config.vad.session_debounce_ms, 1000);

        assert_eq!(config.service.base_url, "http://localhost:8000");
        assert_eq!(config.service.token, None);
        assert_eq!(config.service.request_timeout_secs, None);
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [audio]
            device = "pipewire"
            sample_rate = 48000

            [detector]
            level_threshold = 75.0
            clip_duration_ms = 5000
            poll_interval_ms = 50
            min_clip_bytes = 2048

            [vad]
            voice_threshold = 25.0
            session_debounce_ms = 750

            [service]
            base_url = "https://api.example.com"
            request_timeout_secs = 30
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.audio.device, Some("pipewire".to_string()));
        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.detector.level_threshold, 75.0);
        assert_eq!(config.detector.clip_duration_ms, 5000);
        assert_eq!(config.detector.poll_interval_ms, 50);
        assert_eq!(config.detector.min_clip_bytes, 2048);
        assert_eq!(config.vad.voice_threshold, 25.0);
        assert_eq!(config.vad.session_debounce_ms, 750);
        // Unset VAD fields keep defaults
        assert_eq!(config.vad.offset_silence_ms, 1500);
        assert_eq!(config.service.base_url, "https://api.example.com");
        assert_eq!(config.service.request_timeout_secs, Some(30));
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [service]
            base_url = "https://sounds.example.org"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.service.base_url, "https://sounds.example.org");
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.detector.level_threshold, 60.0);
        assert_eq!(config.vad.min_voice_duration_ms, 500);
    }

    #[test]
    fn test_env_override_api_url() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_auris_env();

        set_env("AURIS_API_URL", "https://override.example.com");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.service.base_url, "https://override.example.com");
        assert_eq!(config.service.token, None); // Not overridden

        clear_auris_env();
    }

    #[test]
    fn test_env_override_all() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_auris_env();

        set_env("AURIS_API_URL", "https://api.example.net");
        set_env("AURIS_TOKEN", "tok-123");
        set_env("AURIS_AUDIO_DEVICE", "pulse");

        let config = Config::default().with_env_overrides();

        assert_eq!(config.service.base_url, "https://api.example.net");
        assert_eq!(config.service.token, Some("tok-123".to_string()));
        assert_eq!(config.audio.device, Some("pulse".to_string()));

        clear_auris_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_auris_env();

        set_env("AURIS_TOKEN", "");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.service.token, None);

        clear_auris_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let invalid_toml = r#"
            [detector
            level_threshold = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_auris_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_errors_on_invalid_toml() {
        let invalid_toml = r#"
            [audio
            device = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("auris"));
        assert!(path_str.ends_with("config.toml"));
    }
}
