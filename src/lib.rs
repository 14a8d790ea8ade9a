//! # Image Normalizer
//!
//! Turns arbitrary image uploads into JPEG streams that pass a strict
//! downstream vision API's container checks, and reports whether each image
//! is acceptable.
//!
//! ## Features
//!
//! - **JPEG Repair**: Missing EOI, missing Huffman tables, missing byte
//!   stuffing and corrupt segments are fixed in place
//! - **Container Synthesis**: Non-JPEG uploads are wrapped in a minimal JPEG
//! - **Dimension Gate**: Short/long side limits read from the frame header
//! - **HTTP API**: JSON (data URL) and multipart endpoints
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  HTTP Server                     │
//! │  ┌──────────────────────┐ ┌──────────────────┐  │
//! │  │    Normalize API     │ │   Health API     │  │
//! │  └──────────────────────┘ └──────────────────┘  │
//! ├─────────────────────────────────────────────────┤
//! │              Normalizer (services)               │
//! ├─────────────────────────────────────────────────┤
//! │  ┌────────┐ ┌────────┐ ┌───────┐ ┌───────────┐  │
//! │  │markers │ │ repair │ │ synth │ │dimensions │  │
//! │  └────────┘ └────────┘ └───────┘ └───────────┘  │
//! │                  jpeg                            │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the server
//! cargo run --release
//!
//! # Normalize an image
//! curl -X POST http://localhost:3000/api/normalize/upload -F "file=@image.png"
//! ```
//!
//! The engine can also be used directly:
//!
//! ```rust,ignore
//! use image_normalizer::{normalize_image, Constraints};
//!
//! let result = normalize_image("data:image/png;base64,...", &Constraints::default());
//! if result.is_valid {
//!     send_downstream(result.normalized_payload.unwrap());
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod jpeg;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

pub use config::{AuthConfig, Config};
pub use error::{AppError, NormalizeError, Result};
pub use jpeg::{extract_dimensions, DimensionBounds, DimensionOutcome};
pub use middleware::{ApiKeyAuth, RateLimiter};
pub use models::{Constraints, EncodedImagePayload, NormalizationResult};
pub use services::{normalize_image, Normalizer};
pub use state::AppState;

use anyhow::Context;
use axum::{extract::DefaultBodyLimit, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Interval between rate limiter cleanups
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Run the normalization server with the given configuration.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid server address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let state = AppState::new(config);
    let app = create_router(state.clone());

    let cleanup_state = state.clone();
    tokio::spawn(async move {
        cleanup_task(cleanup_state).await;
    });

    info!(address = %addr, "Normalization server starting");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = RequestBodyLimitLayer::new(state.max_request_size());

    let api_auth = ApiKeyAuth::new(&state.config.auth);

    if state.config.auth.enabled {
        info!(
            keys_count = state.config.auth.api_keys.len(),
            "API key authentication enabled"
        );
    }

    if state.config.rate_limit.enabled {
        info!(
            requests_per_window = state.config.rate_limit.requests_per_window,
            window_seconds = state.config.rate_limit.window_seconds,
            "Rate limiting enabled"
        );
    }

    let constraints = state.constraints();
    info!(
        max_size_mb = constraints.max_size_mb,
        min_short_side = constraints.min_short_side,
        max_long_side = constraints.max_long_side,
        "Default constraints"
    );

    Router::new()
        .nest("/api/normalize", handlers::normalize_routes())
        .nest("/health", handlers::health_routes())
        .layer(cors)
        // The configured limit replaces axum's 2MB extractor default.
        .layer(DefaultBodyLimit::disable())
        .layer(body_limit)
        .layer(api_auth.layer())
        .layer(state.rate_limiter.layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Background task for periodic cleanup
async fn cleanup_task(state: AppState) {
    loop {
        tokio::time::sleep(CLEANUP_INTERVAL).await;
        state.rate_limiter.cleanup();
    }
}
