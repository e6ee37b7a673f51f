//! Security middleware: per-IP rate limiting, body-size limits, headers

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Fixed-window request counter per client IP.
#[derive(Debug)]
pub struct RateLimiter {
    /// IP -> (request count, window start)
    requests: DashMap<String, (u32, Instant)>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests: DashMap::new(),
            limit: requests_per_minute,
            window: Duration::from_secs(60),
        }
    }

    /// Returns (allowed, seconds until the window resets).
    pub fn check_request(&self, ip: &str) -> (bool, u64) {
        let now = Instant::now();

        let mut entry = self.requests.entry(ip.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) >= self.window {
            *count = 0;
            *window_start = now;
        }

        let reset_after = self
            .window
            .checked_sub(now.duration_since(*window_start))
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if *count >= self.limit {
            return (false, reset_after);
        }

        *count += 1;
        (true, reset_after)
    }

    /// Drop entries whose window is long gone.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.requests
            .retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window * 2);
    }
}

/// Shared state for the security middleware layers
#[derive(Clone)]
pub struct SecurityState {
    pub rate_limiter: Arc<RateLimiter>,
    pub rate_limit_per_minute: u32,
    pub max_request_size: usize,
}

impl SecurityState {
    pub fn new(rate_limit_per_minute: u32, max_request_size: usize) -> Self {
        Self {
            rate_limiter: Arc::new(RateLimiter::new(rate_limit_per_minute)),
            rate_limit_per_minute,
            max_request_size,
        }
    }
}

/// Client IP, preferring reverse-proxy headers over the socket address.
fn get_client_ip(headers: &HeaderMap, addr: Option<&SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(ip) = value.split(',').next() {
                return ip.trim().to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip) = real_ip.to_str() {
            return ip.trim().to_string();
        }
    }

    addr.map(|a| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<SecurityState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let client_ip = get_client_ip(&headers, Some(&addr));
    let (allowed, reset_after) = state.rate_limiter.check_request(&client_ip);

    if !allowed {
        warn!(
            client_ip = %client_ip,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );

        let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
        let headers = response.headers_mut();
        headers.insert(
            "X-RateLimit-Limit",
            HeaderValue::from(state.rate_limit_per_minute),
        );
        headers.insert("Retry-After", HeaderValue::from(reset_after));
        return Err(response);
    }

    Ok(next.run(request).await)
}

/// Request body size validation middleware
pub async fn body_size_middleware(
    State(state): State<SecurityState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(content_length) = headers.get("content-length") {
        if let Some(length) = content_length
            .to_str()
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
        {
            if length > state.max_request_size {
                warn!(
                    length,
                    max = state.max_request_size,
                    "Request body too large"
                );
                return Err(StatusCode::PAYLOAD_TOO_LARGE);
            }
        }
    }

    Ok(next.run(request).await)
}

/// Security headers middleware
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "Cache-Control",
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.remove("Server");

    response
}
