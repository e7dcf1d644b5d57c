//! OAuth `state` (CSRF) parameter store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dashmap::DashMap;
use rand::RngCore;

/// TTL for pending state entries (10 minutes).
const STATE_TTL: Duration = Duration::from_secs(600);

/// Generate a cryptographic state parameter.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

struct PendingLogin {
    provider: String,
    created_at: Instant,
}

/// In-memory store for pending OAuth logins, keyed by state parameter.
pub struct OAuthStateStore {
    states: DashMap<String, PendingLogin>,
    ttl: Duration,
}

impl OAuthStateStore {
    pub fn new() -> Self {
        Self::with_ttl(STATE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
        }
    }

    /// Start a login for `provider` and return its fresh state parameter.
    pub fn issue(&self, provider: &str) -> String {
        let state = generate_state();
        self.states.insert(
            state.clone(),
            PendingLogin {
                provider: provider.to_string(),
                created_at: Instant::now(),
            },
        );
        state
    }

    /// Consume a state parameter. Valid once, only for the provider it was
    /// issued for, and only within the TTL.
    pub fn take(&self, state: &str, provider: &str) -> bool {
        match self.states.remove(state) {
            Some((_, pending)) => {
                pending.provider == provider && pending.created_at.elapsed() <= self.ttl
            }
            None => false,
        }
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        let ttl = self.ttl;
        self.states.retain(|_, v| v.created_at.elapsed() <= ttl);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Spawn a periodic cleanup task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                store.cleanup();
            }
        })
    }
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_is_single_use() {
        let store = OAuthStateStore::new();
        let state = store.issue("github");
        assert!(store.take(&state, "github"));
        assert!(!store.take(&state, "github"));
    }

    #[test]
    fn state_is_bound_to_its_provider() {
        let store = OAuthStateStore::new();
        let state = store.issue("github");
        assert!(!store.take(&state, "gitlab"));
        // Consumed by the failed attempt.
        assert!(!store.take(&state, "github"));
    }

    #[test]
    fn expired_state_is_rejected_and_cleaned() {
        let store = OAuthStateStore::with_ttl(Duration::ZERO);
        let state = store.issue("github");
        std::thread::sleep(Duration::from_millis(5));
        assert!(!store.take(&state, "github"));

        store.issue("github");
        std::thread::sleep(Duration::from_millis(5));
        store.cleanup();
        assert!(store.is_empty());
    }

    #[test]
    fn generated_states_are_unique_and_url_safe() {
        let a = generate_state();
        assert_ne!(a, generate_state());
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
