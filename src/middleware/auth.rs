//! API key guard for the normalization endpoints.
//!
//! Keys come from the `[auth]` config table and are matched in constant time.
//! A key is read from `Authorization: Bearer` first, then `X-API-Key`.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Request},
    response::{IntoResponse, Response},
};
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use subtle::ConstantTimeEq;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::error::AppError;

/// What the guard decided for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    /// Path is outside the guarded scope
    Open,
    Accepted,
    MissingKey,
    WrongKey,
}

/// Constant-time API key check scoped to path prefixes.
#[derive(Clone)]
pub struct ApiKeyAuth {
    keys: Arc<[Vec<u8>]>,
    enabled: bool,
    protected_paths: Arc<[String]>,
    public_paths: Arc<[String]>,
}

impl ApiKeyAuth {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            keys: config
                .api_keys
                .iter()
                .filter(|k| !k.is_empty())
                .map(|k| k.as_bytes().to_vec())
                .collect(),
            enabled: config.enabled,
            protected_paths: config.protected_paths.clone().into(),
            public_paths: config.public_paths.clone().into(),
        }
    }

    pub fn layer(&self) -> ApiKeyAuthLayer {
        ApiKeyAuthLayer { auth: self.clone() }
    }

    /// Public prefixes win over protected ones. No protected prefixes means
    /// every non-public path is guarded.
    fn guards(&self, path: &str) -> bool {
        let under = |prefixes: &[String]| prefixes.iter().any(|p| path.starts_with(p.as_str()));
        self.enabled
            && !under(&self.public_paths)
            && (self.protected_paths.is_empty() || under(&self.protected_paths))
    }

    /// Every configured key is compared so timing does not reveal a match.
    fn matches(&self, presented: &str) -> bool {
        self.keys.iter().fold(false, |found, key| {
            found | bool::from(key.as_slice().ct_eq(presented.as_bytes()))
        })
    }

    fn check<B>(&self, req: &Request<B>) -> Verdict {
        let path = req.uri().path();
        if !self.guards(path) {
            return Verdict::Open;
        }
        match presented_key(req.headers()) {
            Some(key) if self.matches(key) => {
                debug!(path, "API key accepted");
                Verdict::Accepted
            }
            Some(_) => {
                warn!(path, "Unknown API key");
                Verdict::WrongKey
            }
            None => {
                warn!(path, "Request without API key");
                Verdict::MissingKey
            }
        }
    }
}

/// Tower layer wrapping services in [`ApiKeyAuthMiddleware`]
#[derive(Clone)]
pub struct ApiKeyAuthLayer {
    auth: ApiKeyAuth,
}

impl<S> Layer<S> for ApiKeyAuthLayer {
    type Service = ApiKeyAuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyAuthMiddleware {
            inner,
            auth: self.auth.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ApiKeyAuthMiddleware<S> {
    inner: S,
    auth: ApiKeyAuth,
}

impl<S> Service<Request<Body>> for ApiKeyAuthMiddleware<S>
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
        let verdict = self.auth.check(&req);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match verdict {
                Verdict::Open | Verdict::Accepted => inner.call(req).await,
                Verdict::MissingKey => Ok(unauthorized("API key required")),
                Verdict::WrongKey => Ok(unauthorized("Invalid API key")),
            }
        })
    }
}

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    bearer.or_else(|| headers.get("x-api-key").and_then(|v| v.to_str().ok()))
}

fn unauthorized(message: &str) -> Response {
    let mut response = AppError::unauthorized(message).into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn guard(keys: &[&str], protected: &[&str]) -> ApiKeyAuth {
        ApiKeyAuth::new(&AuthConfig {
            enabled: true,
            api_keys: keys.iter().map(|k| k.to_string()).collect(),
            protected_paths: protected.iter().map(|p| p.to_string()).collect(),
            public_paths: vec!["/health".to_string()],
        })
    }

    fn request(path: &str, headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_disabled_guard_lets_uploads_through() {
        let auth = ApiKeyAuth::new(&AuthConfig {
            enabled: false,
            api_keys: vec!["k".to_string()],
            protected_paths: vec![],
            public_paths: vec![],
        });
        assert_eq!(auth.check(&request("/api/normalize", &[])), Verdict::Open);
    }

    #[test]
    fn test_health_stays_open() {
        let auth = guard(&["k"], &[]);
        assert_eq!(auth.check(&request("/health/ready", &[])), Verdict::Open);
        assert_eq!(
            auth.check(&request("/api/normalize/upload", &[])),
            Verdict::MissingKey
        );
    }

    #[test]
    fn test_scoped_to_upload_endpoint() {
        let auth = guard(&["k"], &["/api/normalize/upload"]);
        assert_eq!(auth.check(&request("/api/normalize", &[])), Verdict::Open);
        assert_eq!(
            auth.check(&request("/api/normalize/upload", &[])),
            Verdict::MissingKey
        );
    }

    #[test]
    fn test_key_headers() {
        let auth = guard(&["k1", "k2"], &[]);
        let path = "/api/normalize";
        assert_eq!(
            auth.check(&request(path, &[("authorization", "Bearer k2")])),
            Verdict::Accepted
        );
        assert_eq!(
            auth.check(&request(path, &[("x-api-key", "k1")])),
            Verdict::Accepted
        );
        // Basic credentials are ignored in favour of X-API-Key
        assert_eq!(
            auth.check(&request(
                path,
                &[("authorization", "Basic azE="), ("x-api-key", "k1")]
            )),
            Verdict::Accepted
        );
        assert_eq!(
            auth.check(&request(path, &[("x-api-key", "k")])),
            Verdict::WrongKey
        );
        assert_eq!(
            auth.check(&request("/api/normalize?api_key=k1", &[])),
            Verdict::MissingKey
        );
    }

    #[test]
    fn test_empty_configured_key_never_matches() {
        let auth = guard(&["", "k"], &[]);
        assert!(!auth.matches(""));
        assert!(auth.matches("k"));
    }

    #[test]
    fn test_rejection_carries_challenge() {
        let response = unauthorized("API key required");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
