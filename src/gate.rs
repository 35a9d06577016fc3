//! Listening-mode gate: the single switch controlling automatic detection.
//!
//! An explicit shared object passed to the capture machine instead of an
//! ambient mutable global. Disabling only stops the next poll tick from
//! evaluating the threshold; in-flight captures run to completion.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle to the listening-mode switch.
#[derive(Debug, Clone)]
pub struct ListeningGate {
    enabled: Arc<AtomicBool>,
}

impl ListeningGate {
    /// Creates a gate with the given initial state.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    /// Returns true when automatic detection is allowed to trigger.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Enables automatic detection.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Disables automatic detection. Does not cancel in-flight captures.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    /// Flips the switch and returns the new state.
    pub fn toggle(&self) -> bool {
        !self.enabled.fetch_xor(true, Ordering::SeqCst)
    }
}

impl Default for ListeningGate {
    fn default() -> Self {
        Self::new(true)
    }
}
