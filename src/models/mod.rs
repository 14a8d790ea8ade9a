//! Data models for the image normalizer.
//!
//! This module contains the types that cross the engine boundary:
//! - `EncodedImagePayload`: a MIME-typed binary payload and its data URL form
//! - `Constraints`: size and dimension envelope a result must satisfy
//! - `NormalizationResult`: the verdict returned for every call

pub mod normalization;
pub mod payload;

pub use normalization::{ConstraintOverrides, Constraints, NormalizationResult, NormalizeRequest};
pub use payload::{DataUrl, EncodedImagePayload};
