//! Bearer-credential collaborator for the classification service.
//!
//! The dispatcher never owns credentials; it reads the current token
//! from a session store and signals it on authorization failure so the
//! host can force re-authentication.

use std::sync::{Arc, RwLock};

/// Source of the bearer credential attached to every service call.
pub trait SessionStore: Send + Sync {
    /// Current token, if a session is active.
    fn token(&self) -> Option<String>;

    /// Marks stored credentials stale after a 401-class response.
    fn invalidate(&self);
}

/// In-memory session store shared across pipeline threads.
#[derive(Clone, Default)]
pub struct MemorySession {
    token: Arc<RwLock<Option<String>>>,
}

impl MemorySession {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token)),
        }
    }

    /// Installs a fresh token after re-authentication.
    pub fn set_token(&self, token: String) {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token);
        }
    }
}

impl SessionStore for MemorySession {
    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|slot| slot.clone())
    }

    fn invalidate(&self) {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
    }
}
