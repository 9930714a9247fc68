//! Per-IP sliding-window rate limiting.
//!
//! Each limiter remembers the request instants of every client inside its
//! window. Idle clients are dropped every `cleanup_interval` requests, and the
//! number of tracked addresses is capped so spoofed sources cannot grow the
//! map without bound.

use super::error::ApiError;
use super::extract::client_ip;
use super::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

pub const GLOBAL_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";
pub const PAYMENT_LIMIT_MESSAGE: &str = "Too many payment requests, please try again later.";

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    /// Run cleanup every N requests.
    pub cleanup_interval: u64,
    pub max_tracked_ips: usize,
}

impl RateLimitConfig {
    /// 300 requests per 15 minutes.
    pub fn global() -> Self {
        Self {
            max_requests: 300,
            window: Duration::from_secs(15 * 60),
            cleanup_interval: 100,
            max_tracked_ips: 10_000,
        }
    }

    /// 10 payment submissions per 15 minutes.
    pub fn payments() -> Self {
        Self {
            max_requests: 10,
            ..Self::global()
        }
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    state: RwLock<HashMap<IpAddr, Vec<Instant>>>,
    request_count: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: RwLock::new(HashMap::new()),
            request_count: AtomicU64::new(0),
        }
    }

    /// Records a request from `ip`. Returns `false` when it must be rejected.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let cutoff = now.checked_sub(self.config.window).unwrap_or(now);

        let count = self.request_count.fetch_add(1, Ordering::Relaxed);
        if count > 0 && count % self.config.cleanup_interval == 0 {
            self.cleanup();
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.contains_key(&ip) && state.len() >= self.config.max_tracked_ips {
            state.retain(|_, stamps| stamps.iter().any(|&t| t > cutoff));
            if state.len() >= self.config.max_tracked_ips {
                tracing::warn!(ip = %ip, tracked = state.len(), "rate limiter full");
                return false;
            }
        }

        let stamps = state.entry(ip).or_default();
        stamps.retain(|&t| t > cutoff);
        if stamps.len() >= self.config.max_requests as usize {
            tracing::warn!(
                ip = %ip,
                requests = stamps.len(),
                max = self.config.max_requests,
                "rate limit exceeded"
            );
            return false;
        }
        stamps.push(now);
        true
    }

    /// Drops clients with no request inside the window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let cutoff = now.checked_sub(self.config.window).unwrap_or(now);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let before = state.len();
        state.retain(|_, stamps| {
            stamps.retain(|&t| t > cutoff);
            !stamps.is_empty()
        });
        if state.len() < before {
            tracing::debug!(removed = before - state.len(), "rate limiter cleanup");
        }
    }

    pub fn tracked_ips(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub async fn global_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ip = client_ip(request.headers(), request.extensions(), state.settings.trust_proxy);
    if !state.global_limiter.check(ip) {
        return ApiError::RateLimited(GLOBAL_LIMIT_MESSAGE).into_response();
    }
    next.run(request).await
}

pub async fn payment_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ip = client_ip(request.headers(), request.extensions(), state.settings.trust_proxy);
    if !state.payment_limiter.check(ip) {
        return ApiError::RateLimited(PAYMENT_LIMIT_MESSAGE).into_response();
    }
    next.run(request).await
}
