//! Upload seam to the remote classification service.

use crate::config::ServiceConfig;
use crate::detect::recorder::Clip;
use crate::dispatch::session::SessionStore;
use crate::dispatch::verdict::Verdict;
use crate::error::{AurisError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Generic MIME types that get re-wrapped before upload; the service is
/// sensitive to content-type framing.
const GENERIC_MIMES: [&str; 2] = ["", "application/octet-stream"];

/// Classifies a captured clip against a remote service.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// One upload, one verdict. Never retried for the same clip.
    async fn classify(&self, clip: &Clip) -> Result<Verdict>;
}

/// HTTP classifier speaking the agent service's multipart protocol.
pub struct HttpClassifier {
    client: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
}

impl HttpClassifier {
    /// Builds a classifier from service config and a session store.
    ///
    /// No request timeout is applied unless configured; an unbounded
    /// upload holds the capture guard until it resolves.
    pub fn new(config: &ServiceConfig, session: Arc<dyn SessionStore>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| AurisError::Upload {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn bearer(&self) -> Result<String> {
        self.session.token().ok_or(AurisError::AuthExpired)
    }

    /// Fetches the original audio for a previously classified clip.
    pub async fn fetch_audio(&self, audio_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/agent/audio/{}/", self.base_url, audio_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.bearer()?)
            .send()
            .await
            .map_err(|e| AurisError::Upload {
                message: format!("Failed to fetch audio {audio_id}: {e}"),
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.session.invalidate();
            return Err(AurisError::AuthExpired);
        }
        if !response.status().is_success() {
            return Err(AurisError::ServiceResponse {
                message: format!("Audio fetch returned status {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| AurisError::Upload {
            message: format!("Failed to read audio payload: {e}"),
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, clip: &Clip) -> Result<Verdict> {
        if clip.data.is_empty() {
            return Err(AurisError::EmptyCapture);
        }

        let mime = effective_mime(&clip.mime);
        let part = reqwest::multipart::Part::bytes(clip.data.clone())
            .file_name("audio_event.wav")
            .mime_str(mime)
            .map_err(|e| AurisError::Upload {
                message: format!("Invalid clip MIME type: {e}"),
            })?;
        let form = reqwest::multipart::Form::new().part("audio", part);

        let url = format!("{}/agent/process-audio/", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.bearer()?)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AurisError::Upload {
                message: format!("Clip upload failed: {e}"),
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.session.invalidate();
            return Err(AurisError::AuthExpired);
        }
        if !response.status().is_success() {
            return Err(AurisError::ServiceResponse {
                message: format!("Classification returned status {}", response.status()),
            });
        }

        let verdict: Verdict = response.json().await.map_err(|e| {
            AurisError::ServiceResponse {
                message: format!("Malformed classification response: {e}"),
            }
        })?;
        Ok(verdict)
    }
}

/// Re-wraps missing or generic MIME types as `audio/wav`.
fn effective_mime(mime: &str) -> &str {
    if GENERIC_MIMES.contains(&mime) {
        "audio/wav"
    } else {
        mime
    }
}
