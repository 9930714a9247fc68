//! Nonce-based replay protection for payment submissions.
//!
//! Clients may send `X-Nonce` and `X-Timestamp` (epoch milliseconds). A request
//! carrying both is rejected when the timestamp is older than the window or
//! when the same client already used the nonce inside the window. Requests
//! without the headers pass through.

use crate::error::{PosError, Result};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// How long a nonce is remembered and how old a timestamp may be.
    pub window: Duration,
    /// Hard cap on remembered nonces.
    pub max_entries: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(5 * 60),
            max_entries: 10_000,
        }
    }
}

pub struct ReplayGuard {
    config: ReplayConfig,
    seen: Mutex<HashMap<String, Instant>>,
}

impl ReplayGuard {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Checks and records a request from `client`.
    ///
    /// `now_ms` is the current wall clock in epoch milliseconds.
    pub fn check(
        &self,
        client: &str,
        nonce: Option<&str>,
        timestamp: Option<&str>,
        now_ms: i64,
    ) -> Result<()> {
        let (Some(nonce), Some(timestamp)) = (nonce, timestamp) else {
            return Ok(());
        };

        let window_ms = i64::try_from(self.config.window.as_millis()).unwrap_or(i64::MAX);
        let fresh = timestamp
            .trim()
            .parse::<i64>()
            .is_ok_and(|ts| ts >= now_ms.saturating_sub(window_ms));
        if !fresh {
            tracing::warn!(client, "rejected payment request with stale timestamp");
            return Err(PosError::validation("Request expired"));
        }

        let key = format!("{client}:{nonce}");
        let now = Instant::now();
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);

        seen.retain(|_, at| now.duration_since(*at) < self.config.window);

        if seen.contains_key(&key) {
            tracing::warn!(client, "duplicate payment nonce");
            return Err(PosError::validation("Duplicate request detected"));
        }

        if seen.len() >= self.config.max_entries
            && let Some(oldest) = seen.iter().min_by_key(|(_, at)| **at).map(|(k, _)| k.clone())
        {
            tracing::debug!(max_entries = self.config.max_entries, "replay cache full, evicting oldest nonce");
            seen.remove(&oldest);
        }
        seen.insert(key, now);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(ReplayConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000_000;

    #[test]
    fn test_missing_headers_pass() {
        let guard = ReplayGuard::default();
        assert!(guard.check("1.2.3.4", None, None, NOW).is_ok());
        assert!(guard.check("1.2.3.4", Some("n1"), None, NOW).is_ok());
        assert!(guard.is_empty());
    }

    #[test]
    fn test_duplicate_nonce_is_rejected_per_client() {
        let guard = ReplayGuard::default();
        let ts = NOW.to_string();
        guard.check("1.2.3.4", Some("n1"), Some(&ts), NOW).unwrap();

        let err = guard.check("1.2.3.4", Some("n1"), Some(&ts), NOW).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate request detected");

        // Same nonce from another client is a different request.
        assert!(guard.check("5.6.7.8", Some("n1"), Some(&ts), NOW).is_ok());
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let guard = ReplayGuard::default();
        let stale = (NOW - 5 * 60 * 1000 - 1).to_string();
        let err = guard.check("1.2.3.4", Some("n1"), Some(&stale), NOW).unwrap_err();
        assert_eq!(err.to_string(), "Request expired");

        let err = guard.check("1.2.3.4", Some("n1"), Some("yesterday"), NOW).unwrap_err();
        assert_eq!(err.to_string(), "Request expired");
    }

    #[test]
    fn test_entries_expire_and_cap_holds() {
        let guard = ReplayGuard::new(ReplayConfig {
            window: Duration::from_millis(20),
            max_entries: 2,
        });
        let ts = NOW.to_string();
        guard.check("a", Some("1"), Some(&ts), NOW).unwrap();
        guard.check("a", Some("2"), Some(&ts), NOW).unwrap();
        guard.check("a", Some("3"), Some(&ts), NOW).unwrap();
        assert_eq!(guard.len(), 2);

        std::thread::sleep(Duration::from_millis(30));
        guard.check("a", Some("1"), Some(&ts), NOW).unwrap();
        assert_eq!(guard.len(), 1);
    }
}
