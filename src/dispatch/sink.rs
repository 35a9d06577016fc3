//! Verdict consumers.

use crate::dispatch::verdict::Verdict;
use std::sync::{Arc, Mutex};

/// Receives relevant verdicts after filtering.
///
/// Sinks see only verdicts that passed the relevance filter; they are
/// never handed silence/quiet/error/unknown results.
pub trait VerdictSink: Send + Sync {
    fn publish(&self, verdict: &Verdict);
}

/// Forwards verdicts over a channel to another thread.
pub struct ChannelSink {
    sender: crossbeam_channel::Sender<Verdict>,
}

impl ChannelSink {
    pub fn new(sender: crossbeam_channel::Sender<Verdict>) -> Self {
        Self { sender }
    }
}

impl VerdictSink for ChannelSink {
    fn publish(&self, verdict: &Verdict) {
        // A disconnected receiver drops the verdict; publication is
        // fire-and-forget.
        let _ = self.sender.send(verdict.clone());
    }
}

/// Prints verdicts to stdout, one banner line plus details.
pub struct StdoutSink;

impl VerdictSink for StdoutSink {
    fn publish(&self, verdict: &Verdict) {
        let label = verdict
            .sound_type_label
            .as_deref()
            .unwrap_or(&verdict.sound_type);
        println!(
            "{}: {} ({:.1}% confidence)",
            verdict.alert_category.banner(),
            label,
            verdict.confidence * 100.0
        );
        if verdict.is_conversation_detected
            && let Some(text) = &verdict.transcription
        {
            println!("  transcription: {text}");
        }
        if let Some(id) = &verdict.audio_id {
            println!("  audio id: {id}");
        }
    }
}

/// Collects verdicts in memory; test helper.
#[derive(Clone, Default)]
pub struct CollectorSink {
    verdicts: Arc<Mutex<Vec<Verdict>>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collected(&self) -> Vec<Verdict> {
        self.verdicts
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

impl VerdictSink for CollectorSink {
    fn publish(&self, verdict: &Verdict) {
        if let Ok(mut verdicts) = self.verdicts.lock() {
            verdicts.push(verdict.clone());
        }
    }
}
