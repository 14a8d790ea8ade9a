//! HTTP request handlers for the image normalizer.
//!
//! - `normalize`: data URL and multipart normalization
//! - `health`: liveness and readiness probes

pub mod health;
pub mod normalize;

pub use health::health_routes;
pub use normalize::normalize_routes;
