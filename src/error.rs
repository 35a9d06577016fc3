//! Error types for auris.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AurisError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Microphone access denied: {message}")]
    PermissionDenied { message: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    #[error("Captured clip is empty")]
    EmptyCapture,

    // Classification service errors
    #[error("Upload failed: {message}")]
    Upload { message: String },

    #[error("Classification service error: {message}")]
    ServiceResponse { message: String },

    #[error("Session credentials expired")]
    AuthExpired,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, AurisError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_permission_denied_display() {
        let error = AurisError::PermissionDenied {
            message: "portal request dismissed".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Microphone access denied: portal request dismissed"
        );
    }

    #[test]
    fn test_empty_capture_display() {
        assert_eq!(AurisError::EmptyCapture.to_string(), "Captured clip is empty");
    }

    #[test]
    fn test_auth_expired_display() {
        assert_eq!(
            AurisError::AuthExpired.to_string(),
            "Session credentials expired"
        );
    }

    #[test]
    fn test_upload_display() {
        let error = AurisError::Upload {
            message: "connection reset".to_string(),
        };
        assert_eq!(error.to_string(), "Upload failed: connection reset");
    }

    #[test]
    fn test_service_response_display() {
        let error = AurisError::ServiceResponse {
            message: "status 500".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Classification service error: status 500"
        );
    }

    #[test]
    fn test_audio_device_not_found_display() {
        let error = AurisError::AudioDeviceNotFound {
            device: "default".to_string(),
        };
        assert_eq!(error.to_string(), "Audio device not found: default");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: AurisError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: AurisError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<AurisError>();
        assert_sync::<AurisError>();
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(7)
        }
        assert_eq!(returns_result().unwrap(), 7);
    }
}
