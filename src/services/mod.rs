//! Service layer for the image normalizer.
//!
//! - `normalizer`: the normalization engine that turns an uploaded image into
//!   a JPEG the downstream API accepts

pub mod normalizer;

pub use normalizer::{normalize_image, Normalizer};
