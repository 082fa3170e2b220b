//! Per-client rate limiting with a sliding window counter.
//!
//! Each (client IP, tier) pair keeps the request count of the current and the
//! previous fixed window. The previous count is weighted by how much of it
//! still overlaps the sliding window, which smooths out bursts at window edges
//! without storing every request timestamp.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::ApiError;
use crate::config::RateLimitConfig;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitTier {
    /// Everything under /api except login and signup
    Api,
    /// Login and signup
    Auth,
}

#[derive(Debug, Clone)]
struct WindowCounter {
    window_start: Instant,
    current: u32,
    previous: u32,
}

/// Remaining budget after an admitted request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    counters: DashMap<(IpAddr, RateLimitTier), WindowCounter>,
    config: RateLimitConfig,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            counters: DashMap::new(),
            window: Duration::from_secs(config.window_seconds.max(1)),
            config,
        }
    }

    fn limit_for(&self, tier: RateLimitTier) -> u32 {
        match tier {
            RateLimitTier::Api => self.config.api_requests_per_window,
            RateLimitTier::Auth => self.config.auth_requests_per_window,
        }
    }

    /// Admit or reject one request. On rejection returns the number of
    /// seconds after which a retry may succeed.
    pub fn check(&self, ip: IpAddr, tier: RateLimitTier) -> Result<Quota, u64> {
        self.check_at(ip, tier, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, tier: RateLimitTier, now: Instant) -> Result<Quota, u64> {
        let limit = self.limit_for(tier);
        if !self.config.enabled {
            return Ok(Quota {
                limit,
                remaining: limit,
            });
        }

        let mut counter = self.counters.entry((ip, tier)).or_insert_with(|| WindowCounter {
            window_start: now,
            current: 0,
            previous: 0,
        });

        let mut elapsed = now.saturating_duration_since(counter.window_start);
        if elapsed >= self.window * 2 {
            counter.previous = 0;
            counter.current = 0;
            counter.window_start = now;
            elapsed = Duration::ZERO;
        } else if elapsed >= self.window {
            counter.previous = counter.current;
            counter.current = 0;
            counter.window_start += self.window;
            elapsed -= self.window;
        }

        let overlap = 1.0 - elapsed.as_secs_f64() / self.window.as_secs_f64();
        let estimated = counter.previous as f64 * overlap + counter.current as f64;

        if estimated >= limit as f64 {
            let retry_after = (self.window - elapsed).as_secs_f64().ceil() as u64;
            return Err(retry_after.max(1));
        }

        counter.current += 1;
        let used = (estimated + 1.0).ceil() as u32;
        Ok(Quota {
            limit,
            remaining: limit.saturating_sub(used),
        })
    }

    /// Drop counters that have been idle for two full windows
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let expiry = self.window * 2;
        self.counters
            .retain(|_, counter| now.saturating_duration_since(counter.window_start) < expiry);
    }

    pub fn entry_count(&self) -> usize {
        self.counters.len()
    }
}

/// Client address. Proxy headers are only read when `trust_proxy_headers` is set.
fn client_ip(request: &Request<Body>, trust_proxy_headers: bool) -> IpAddr {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    if !trust_proxy_headers {
        return peer;
    }

    let headers = request.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|ip| ip.trim().parse().ok());
    real_ip.unwrap_or(peer)
}

pub async fn limit_api(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    enforce(&state, request, next, RateLimitTier::Api).await
}

pub async fn limit_auth(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    enforce(&state, request, next, RateLimitTier::Auth).await
}

async fn enforce(
    state: &AppState,
    request: Request<Body>,
    next: Next,
    tier: RateLimitTier,
) -> Response {
    let ip = client_ip(&request, state.config.rate_limit.trust_proxy_headers);

    match state.rate_limiter.check(ip, tier) {
        Ok(quota) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", HeaderValue::from(quota.limit));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from(quota.remaining));
            response
        }
        Err(retry_after) => {
            tracing::warn!(ip = %ip, tier = ?tier, "Rate limit exceeded");
            let mut response = ApiError::rate_limited(format!(
                "Too many requests. Try again in {} seconds.",
                retry_after
            ))
            .into_response();
            response
                .headers_mut()
                .insert("Retry-After", HeaderValue::from(retry_after));
            response
        }
    }
}

/// Periodically sweep idle counters
pub fn spawn_cleanup_task(rate_limiter: Arc<RateLimiter>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            interval.tick().await;
            rate_limiter.cleanup_expired();
            tracing::debug!(
                entries = rate_limiter.entry_count(),
                "Rate limiter cleanup complete"
            );
        }
    });
}
