//! Rate limiting middleware.
//!
//! Per-client-IP token buckets backed by governor's keyed limiter. Each IP
//! may burst up to `requests_per_window` requests and regains one request
//! every `window_seconds`.
//!
//! # Example
//!
//! ```rust,ignore
//! let rate_limiter = RateLimiter::new(&config.rate_limit);
//! let app = Router::new()
//!     .route("/api/normalize", post(normalize))
//!     .layer(rate_limiter.layer());
//! ```

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter as GovRateLimiter};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::config::RateLimitConfig;

/// Rate limiter state shared across requests
#[derive(Clone)]
pub struct RateLimiter {
    /// `None` when rate limiting is disabled
    limiter: Option<Arc<DefaultKeyedRateLimiter<IpAddr>>>,
    /// Seconds reported in `Retry-After`
    retry_after: u64,
}

impl RateLimiter {
    /// Create a new rate limiter from configuration
    pub fn new(config: &RateLimitConfig) -> Self {
        let limiter = config.enabled.then(|| {
            let burst = NonZeroU32::new(config.requests_per_window).unwrap_or(NonZeroU32::MIN);
            let quota = Quota::with_period(Duration::from_secs(config.window_seconds))
                .unwrap_or_else(|| Quota::per_minute(burst))
                .allow_burst(burst);
            Arc::new(GovRateLimiter::keyed(quota))
        });

        Self {
            limiter,
            retry_after: config.window_seconds.max(1),
        }
    }

    /// Create a Tower Layer for this rate limiter
    pub fn layer(&self) -> RateLimiterLayer {
        RateLimiterLayer {
            rate_limiter: self.clone(),
        }
    }

    /// Check if a request from the given IP is allowed
    pub fn check(&self, ip: IpAddr) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check_key(&ip).is_ok(),
            None => true,
        }
    }

    /// Drop state for clients whose buckets have fully refilled
    pub fn cleanup(&self) {
        if let Some(limiter) = &self.limiter {
            let before = limiter.len();
            limiter.retain_recent();
            limiter.shrink_to_fit();
            debug!(before, after = limiter.len(), "Rate limiter cleanup");
        }
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.limiter.as_ref().map_or(0, |l| l.len())
    }
}

/// Tower Layer for rate limiting
#[derive(Clone)]
pub struct RateLimiterLayer {
    rate_limiter: RateLimiter,
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiterMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimiterMiddleware {
            inner,
            rate_limiter: self.rate_limiter.clone(),
        }
    }
}

/// Rate limiting middleware service
#[derive(Clone)]
pub struct RateLimiterMiddleware<S> {
    inner: S,
    rate_limiter: RateLimiter,
}

impl<S> Service<Request<Body>> for RateLimiterMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let ip = extract_client_ip(&req);

        let rate_limiter = self.rate_limiter.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !rate_limiter.check(ip) {
                warn!(ip = %ip, "Rate limit exceeded");
                return Ok(rate_limit_response(rate_limiter.retry_after));
            }

            inner.call(req).await
        })
    }
}

/// Client IP: proxy headers first, then the socket address
fn extract_client_ip<B>(req: &Request<B>) -> IpAddr {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse::<IpAddr>().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    let real_ip = req
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|ip| ip.trim().parse::<IpAddr>().ok());
    if let Some(ip) = real_ip {
        return ip;
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn rate_limit_response(retry_after: u64) -> Response {
    let body = serde_json::json!({
        "error": "rate_limit_exceeded",
        "message": "Too many requests. Please try again later.",
        "status": 429
    });

    (
        StatusCode::TOO_MANY_REQUESTS,
        [
            ("content-type", "application/json".to_string()),
            ("retry-after", retry_after.to_string()),
        ],
        body.to_string(),
    )
        .into_response()
}
