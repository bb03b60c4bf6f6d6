//! Per-IP rate limiting
//!
//! A non-blocking token bucket per client IP. Rejected requests get 429
//! with `Retry-After` immediately; nothing ever queues. Proxy-supplied
//! client IP headers are trusted only when `BEHIND_PROXY=true`, and
//! buckets idle for three minutes are evicted.

use crate::response::ErrorBody;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dashmap::DashMap;
use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tether_common::{spawn_logged, AppError, ErrorResponse};
use tether_common::config::RateLimitConfig;

/// Idle buckets are dropped after this long without a request
const STALE_AFTER: Duration = Duration::from_secs(3 * 60);

/// Eviction sweep period
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One client's token bucket plus its last-seen stamp
struct IpBucket {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    /// Milliseconds since the limiter started
    last_seen_ms: AtomicU64,
}

/// Keyed, evicting rate limiter shared by all requests
pub struct IpRateLimiter {
    clients: DashMap<String, Arc<IpBucket>>,
    quota: Quota,
    clock: DefaultClock,
    behind_proxy: bool,
    limit: u32,
    started: Instant,
}

impl IpRateLimiter {
    #[must_use]
    pub fn new(config: &RateLimitConfig, behind_proxy: bool) -> Arc<Self> {
        let per_second =
            NonZeroU32::new(config.requests_per_second.max(1)).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst.max(1)).unwrap_or(NonZeroU32::MIN);

        Arc::new(Self {
            clients: DashMap::new(),
            quota: Quota::per_second(per_second).allow_burst(burst),
            clock: DefaultClock::default(),
            behind_proxy,
            limit: config.requests_per_second,
            started: Instant::now(),
        })
    }

    /// Check one request from `ip`. `Err` carries the retry delay.
    pub fn check(&self, ip: &str) -> Result<(), Duration> {
        let bucket = self
            .clients
            .entry(ip.to_string())
            .or_insert_with(|| {
                Arc::new(IpBucket {
                    limiter: RateLimiter::direct_with_clock(self.quota, &self.clock),
                    last_seen_ms: AtomicU64::new(0),
                })
            })
            .clone();

        bucket
            .last_seen_ms
            .store(self.elapsed_ms(), Ordering::Relaxed);

        match bucket.limiter.check() {
            Ok(()) => Ok(()),
            Err(not_until) => Err(not_until.wait_time_from(self.clock.now())),
        }
    }

    /// Drop buckets that have been idle past the staleness window
    pub fn evict_stale(&self) {
        let now_ms = self.elapsed_ms();
        let stale_ms = STALE_AFTER.as_millis() as u64;
        self.clients.retain(|_, bucket| {
            now_ms.saturating_sub(bucket.last_seen_ms.load(Ordering::Relaxed)) < stale_ms
        });
    }

    /// Start the periodic eviction sweep
    pub fn spawn_eviction(self: &Arc<Self>) {
        let limiter = self.clone();
        spawn_logged("ratelimit-eviction", async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.evict_stale();
            }
        });
    }

    /// Number of tracked client buckets
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Resolve the client IP: proxy headers when trusted, otherwise the
    /// peer address.
    #[must_use]
    pub fn client_ip(&self, request: &Request) -> String {
        if self.behind_proxy {
            if let Some(ip) = header_value(request, "cf-connecting-ip") {
                return ip;
            }
            // First hop of the X-Forwarded-For chain.
            if let Some(forwarded) = header_value(request, "x-forwarded-for") {
                if let Some(first) = forwarded.split(',').next() {
                    let first = first.trim();
                    if !first.is_empty() {
                        return first.to_string();
                    }
                }
            }
            if let Some(ip) = header_value(request, "x-real-ip") {
                return ip;
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

/// Reject over-limit requests with 429 before they reach a handler.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<IpRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = limiter.client_ip(&request);
    match limiter.check(&ip) {
        Ok(()) => next.run(request).await,
        Err(delay) => rate_limited_response(limiter.limit, delay),
    }
}

/// 429 with `Retry-After` and rate-limit headers
fn rate_limited_response(limit: u32, delay: Duration) -> Response {
    let retry_after_secs = (delay.as_secs_f64().ceil() as u64).max(1);
    let reset = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|now| now.as_secs() + retry_after_secs)
        .unwrap_or(retry_after_secs);

    let body = ErrorBody {
        error: ErrorResponse::from(AppError::RateLimitExceeded),
    };
    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::RETRY_AFTER, unchecked_header(retry_after_secs));
    headers.insert("x-ratelimit-limit", unchecked_header(u64::from(limit)));
    headers.insert("x-ratelimit-remaining", unchecked_header(0));
    headers.insert("x-ratelimit-reset", unchecked_header(reset));
    response
}

fn unchecked_header(value: u64) -> HeaderValue {
    HeaderValue::from_str(&value.to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("0"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(per_second: u32, burst: u32, behind_proxy: bool) -> Arc<IpRateLimiter> {
        IpRateLimiter::new(
            &RateLimitConfig {
                requests_per_second: per_second,
                burst,
            },
            behind_proxy,
        )
    }

    #[test]
    fn test_burst_then_reject() {
        let limiter = limiter(10, 10, false);

        let mut allowed = 0;
        let mut rejected = 0;
        for _ in 0..30 {
            match limiter.check("192.0.2.1") {
                Ok(()) => allowed += 1,
                Err(delay) => {
                    assert!(delay > Duration::ZERO);
                    rejected += 1;
                }
            }
        }
        // The burst passes, the excess is rejected immediately.
        assert!(allowed >= 10);
        assert!(rejected > 0);
    }

    #[test]
    fn test_ips_have_independent_buckets() {
        let limiter = limiter(1, 1, false);
        assert!(limiter.check("192.0.2.1").is_ok());
        assert!(limiter.check("192.0.2.1").is_err());
        // A different client is unaffected.
        assert!(limiter.check("192.0.2.2").is_ok());
        assert_eq!(limiter.client_count(), 2);
    }

    #[test]
    fn test_evict_stale_keeps_recent() {
        let limiter = limiter(10, 10, false);
        let _ = limiter.check("192.0.2.1");
        limiter.evict_stale();
        // Seen just now: kept.
        assert_eq!(limiter.client_count(), 1);
    }

    #[test]
    fn test_client_ip_ignores_headers_without_proxy_trust() {
        let limiter = limiter(10, 10, false);
        let request = Request::builder()
            .header("cf-connecting-ip", "198.51.100.7")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(limiter.client_ip(&request), "unknown");
    }

    #[test]
    fn test_client_ip_header_precedence_behind_proxy() {
        let limiter = limiter(10, 10, true);

        let request = Request::builder()
            .header("cf-connecting-ip", "198.51.100.7")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .header("x-real-ip", "192.0.2.88")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(limiter.client_ip(&request), "198.51.100.7");

        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .header("x-real-ip", "192.0.2.88")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(limiter.client_ip(&request), "203.0.113.9");

        let request = Request::builder()
            .header("x-real-ip", "192.0.2.88")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(limiter.client_ip(&request), "192.0.2.88");
    }

    #[test]
    fn test_rate_limited_response_headers() {
        let response = rate_limited_response(10, Duration::from_millis(1500));
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert_eq!(headers.get(header::RETRY_AFTER).unwrap(), "2");
        assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "10");
        assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "0");
        assert!(headers.contains_key("x-ratelimit-reset"));
    }
}
