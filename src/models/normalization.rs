//! Constraints and verdicts for a normalization call.

use serde::{Deserialize, Serialize};

use super::payload::EncodedImagePayload;
use crate::jpeg::DimensionBounds;

/// Size and dimension envelope a normalized image must fit in.
///
/// Defaults match the documented limits of the downstream image API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    /// Maximum decoded size in megabytes
    pub max_size_mb: f64,
    /// Minimum length of the shorter side in pixels
    pub min_short_side: u32,
    /// Maximum length of the longer side in pixels
    pub max_long_side: u32,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_size_mb: 50.0,
            min_short_side: 512,
            max_long_side: 4096,
        }
    }
}

impl Constraints {
    /// The dimension part of the envelope.
    pub fn bounds(&self) -> DimensionBounds {
        DimensionBounds {
            min_short_side: self.min_short_side,
            max_long_side: self.max_long_side,
        }
    }
}

/// Per-request overrides; unset fields fall back to the server defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintOverrides {
    #[serde(alias = "maxSizeMB")]
    pub max_size_mb: Option<f64>,
    pub min_short_side: Option<u32>,
    pub max_long_side: Option<u32>,
}

impl ConstraintOverrides {
    pub fn apply(&self, base: Constraints) -> Constraints {
        Constraints {
            max_size_mb: self.max_size_mb.unwrap_or(base.max_size_mb),
            min_short_side: self.min_short_side.unwrap_or(base.min_short_side),
            max_long_side: self.max_long_side.unwrap_or(base.max_long_side),
        }
    }
}

/// Request body for `POST /api/normalize`.
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizeRequest {
    /// `data:<mime>;base64,<data>`
    pub image: String,
    #[serde(default)]
    pub constraints: ConstraintOverrides,
}

/// Verdict for one normalization call.
///
/// `is_valid == true` implies `normalized_payload`, `width` and `height` are
/// all present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationResult {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_payload: Option<EncodedImagePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_in_megabytes: Option<f64>,
}

impl NormalizationResult {
    /// A successful verdict carrying a JPEG payload.
    pub fn valid(
        jpeg: Vec<u8>,
        width: u32,
        height: u32,
        original_format: Option<String>,
        size_in_megabytes: Option<f64>,
    ) -> Self {
        Self {
            is_valid: true,
            error_message: None,
            normalized_payload: Some(EncodedImagePayload::new("image/jpeg", jpeg)),
            width: Some(width),
            height: Some(height),
            original_format,
            size_in_megabytes,
        }
    }

    /// A failed verdict. Dimensions are kept when they were recovered.
    pub fn invalid(
        message: impl Into<String>,
        dimensions: Option<(u32, u32)>,
        original_format: Option<String>,
        size_in_megabytes: Option<f64>,
    ) -> Self {
        Self {
            is_valid: false,
            error_message: Some(message.into()),
            normalized_payload: None,
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
            original_format,
            size_in_megabytes,
        }
    }

    /// Normalized JPEG bytes, when valid.
    pub fn jpeg_bytes(&self) -> Option<&[u8]> {
        self.normalized_payload.as_ref().map(|p| p.bytes().as_ref())
    }
}
