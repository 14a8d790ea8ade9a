//! Application state management.
//!
//! Shared state handed to every request handler through Axum's `State`
//! extractor.
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn handler(State(state): State<AppState>) -> impl IntoResponse {
//!     let result = state.normalizer.normalize(&data_url);
//!     // ...
//! }
//! ```

use crate::config::Config;
use crate::middleware::RateLimiter;
use crate::models::Constraints;
use crate::services::Normalizer;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    /// Normalization engine with the configured defaults
    pub normalizer: Arc<Normalizer>,

    /// Per-client rate limiter, shared with the cleanup task
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let normalizer = Normalizer::from_config(&config.normalization);
        let rate_limiter = RateLimiter::new(&config.rate_limit);

        Self {
            config: Arc::new(config),
            normalizer: Arc::new(normalizer),
            rate_limiter,
        }
    }

    /// Default constraints applied when a request carries no overrides
    pub fn constraints(&self) -> Constraints {
        *self.normalizer.constraints()
    }

    /// Maximum accepted request body in bytes
    pub fn max_request_size(&self) -> usize {
        self.config.server.max_request_size
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &"<Config>")
            .field("normalizer", &self.normalizer)
            .field("rate_limiter", &"<RateLimiter>")
            .finish()
    }
}
