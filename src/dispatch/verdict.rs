//! Remote classification verdict model and the relevance filter.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Sound types that are never republished to consumers.
const DISCARDED_SOUND_TYPES: [&str; 4] = ["silence", "quiet", "error", "unknown"];

/// Alert severity attached to a classified sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertCategory {
    Danger,
    Attention,
    Social,
    Environment,
    #[default]
    Unknown,
}

impl AlertCategory {
    /// Parses the wire tag; anything unrecognized maps to `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "danger_alert" => AlertCategory::Danger,
            "attention_alert" => AlertCategory::Attention,
            "social_alert" => AlertCategory::Social,
            "environment_alert" => AlertCategory::Environment,
            _ => AlertCategory::Unknown,
        }
    }

    /// Short banner line for display consumers.
    pub fn banner(&self) -> &'static str {
        match self {
            AlertCategory::Danger => "DANGER ALERT",
            AlertCategory::Attention => "ATTENTION REQUIRED",
            AlertCategory::Social => "SOCIAL ACTIVITY DETECTED",
            AlertCategory::Environment => "ENVIRONMENT CHANGE",
            AlertCategory::Unknown => "RELEVANT SOUND DETECTED",
        }
    }
}

fn de_alert_category<'de, D>(deserializer: D) -> Result<AlertCategory, D::Error>
where
    D: Deserializer<'de>,
{
    let tag: Option<String> = Option::deserialize(deserializer)?;
    Ok(tag.as_deref().map(AlertCategory::from_tag).unwrap_or_default())
}

/// Flattens a transcription field that may arrive as a plain string, a
/// segment object, or an array of segments.
fn de_transcription<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value.and_then(flatten_transcription))
}

fn flatten_transcription(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(flatten_transcription).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        Value::Object(map) => {
            for key in ["text", "transcript", "content"] {
                if let Some(Value::String(s)) = map.get(key) {
                    return Some(s.clone());
                }
            }
            None
        }
        other => Some(other.to_string()),
    }
}

/// One classification result from the remote service.
///
/// Produced once per capture, filtered, then published or dropped; never
/// mutated.
#[derive(Debug, Clone, Deserialize)]
pub struct Verdict {
    #[serde(default)]
    pub success: bool,
    pub sound_type: String,
    #[serde(default)]
    pub sound_type_label: Option<String>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default, deserialize_with = "de_alert_category")]
    pub alert_category: AlertCategory,
    #[serde(default, deserialize_with = "de_transcription")]
    pub transcription: Option<String>,
    #[serde(default)]
    pub is_conversation_detected: bool,
    #[serde(default)]
    pub audio_id: Option<String>,
    #[serde(default)]
    pub sound_detections: Vec<(String, f32)>,
}

impl Verdict {
    /// Relevance filter applied before any publication.
    ///
    /// Silence, quiet, error, and unknown tags are discarded outright,
    /// case-insensitively; everything else is republished verbatim.
    pub fn is_relevant(&self) -> bool {
        let tag = self.sound_type.to_lowercase();
        !DISCARDED_SOUND_TYPES.contains(&tag.as_str())
    }
}
