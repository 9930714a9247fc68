use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct IdempotencyConfig {
    /// How long a response is replayed for its key.
    pub ttl: Duration,
    /// Hard cap on remembered responses.
    pub max_entries: usize,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            max_entries: 10_000,
        }
    }
}

/// A response remembered under an `Idempotency-Key`.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: u16,
    pub body: Value,
}

/// In-memory idempotency cache. Keys are scoped to the calling user, so one
/// caller's key never replays another caller's response. Expired entries are
/// dropped on insertion and ignored on lookup; when full, the oldest entry is
/// evicted.
pub struct IdempotencyCache {
    config: IdempotencyConfig,
    entries: Mutex<HashMap<(u64, String), (Instant, CachedResponse)>>,
}

impl IdempotencyCache {
    pub fn new(config: IdempotencyConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, user_id: u64, key: &str) -> Option<CachedResponse> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let scoped = (user_id, key.to_string());
        match entries.get(&scoped) {
            Some((stored, response)) if stored.elapsed() < self.config.ttl => {
                Some(response.clone())
            }
            Some(_) => {
                entries.remove(&scoped);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, user_id: u64, key: String, response: CachedResponse) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, (stored, _)| stored.elapsed() < self.config.ttl);
        if entries.len() < before {
            tracing::debug!(purged = before - entries.len(), "purged expired idempotency keys");
        }

        let scoped = (user_id, key);
        if !entries.contains_key(&scoped)
            && entries.len() >= self.config.max_entries
            && let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, (stored, _))| *stored)
                .map(|(k, _)| k.clone())
        {
            tracing::debug!(max_entries = self.config.max_entries, "idempotency cache full, evicting oldest key");
            entries.remove(&oldest);
        }
        entries.insert(scoped, (Instant::now(), response));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for IdempotencyCache {
    fn default() -> Self {
        Self::new(IdempotencyConfig::default())
    }
}
