//! Image normalization engine.
//!
//! Takes an image upload in any format, produces a JPEG stream that passes
//! the downstream API's container checks, and reports a verdict. The engine
//! is synchronous and holds no mutable state; one instance can serve any
//! number of threads.
//!
//! # Pipeline
//!
//! 1. Envelope gate: non-empty, parseable, declared `image/*`, decodable
//! 2. Size gate: positive and within `max_size_mb`
//! 3. Non-JPEG input: wrap the bytes in a synthesized container
//! 4. JPEG input: check the signature, then repair the container
//! 5. Dimension check on the resulting stream
//! 6. Structural verification, then a JPEG-labelled payload

use tracing::{debug, info};

use crate::config::NormalizationConfig;
use crate::error::NormalizeError;
use crate::jpeg::markers::has_jpeg_signature;
use crate::jpeg::{
    extract_dimensions, probe_dimensions, repair, synthesize, verify_structure, DimensionError,
    DimensionOutcome, RepairPolicy,
};
use crate::models::{Constraints, DataUrl, EncodedImagePayload, NormalizationResult};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Normalize a data URL with the default repair policy.
pub fn normalize_image(input: &str, constraints: &Constraints) -> NormalizationResult {
    Normalizer::default().normalize_with(input, constraints)
}

/// Normalization engine
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    constraints: Constraints,
    policy: RepairPolicy,
}

/// Facts gathered along the way, reported even when the verdict is negative.
#[derive(Debug, Default)]
struct Diagnostics {
    original_format: Option<String>,
    size_in_megabytes: Option<f64>,
    dimensions: Option<(u32, u32)>,
}

impl Diagnostics {
    fn into_result(self, outcome: Result<Vec<u8>, NormalizeError>) -> NormalizationResult {
        match (outcome, self.dimensions) {
            (Ok(jpeg), Some((width, height))) => NormalizationResult::valid(
                jpeg,
                width,
                height,
                self.original_format,
                self.size_in_megabytes,
            ),
            (Ok(_), None) => NormalizationResult::invalid(
                NormalizeError::DimensionsUnverified.to_string(),
                None,
                self.original_format,
                self.size_in_megabytes,
            ),
            (Err(err), dimensions) => {
                debug!(
                    error = %err,
                    original_format = ?self.original_format,
                    "Image rejected"
                );
                NormalizationResult::invalid(
                    err.to_string(),
                    dimensions,
                    self.original_format,
                    self.size_in_megabytes,
                )
            }
        }
    }
}

impl Normalizer {
    /// Create an engine with default constraints for `normalize`.
    pub fn new(constraints: Constraints, policy: RepairPolicy) -> Self {
        Self {
            constraints,
            policy,
        }
    }

    /// Create an engine from the `[normalization]` config section.
    pub fn from_config(config: &NormalizationConfig) -> Self {
        Self::new(config.constraints(), config.repair_policy())
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn policy(&self) -> &RepairPolicy {
        &self.policy
    }

    /// Normalize a `data:<mime>;base64,<data>` string with the engine's
    /// default constraints.
    pub fn normalize(&self, input: &str) -> NormalizationResult {
        self.normalize_with(input, &self.constraints)
    }

    /// Normalize a data URL against explicit constraints.
    ///
    /// Never fails: every problem is reported through the returned verdict.
    pub fn normalize_with(&self, input: &str, constraints: &Constraints) -> NormalizationResult {
        let mut diag = Diagnostics::default();
        let outcome = DataUrl::parse(input).and_then(|url| {
            diag.original_format = Some(format_label(&url.mime_type));
            if !url.is_image() {
                return Err(NormalizeError::NotAnImage(url.mime_type.clone()));
            }
            let data = url.decode()?;
            self.process(&url.mime_type, &data, constraints, &mut diag)
        });
        diag.into_result(outcome)
    }

    /// Normalize an already-decoded payload, e.g. a multipart upload.
    pub fn normalize_payload(
        &self,
        payload: &EncodedImagePayload,
        constraints: &Constraints,
    ) -> NormalizationResult {
        let mut diag = Diagnostics {
            original_format: Some(format_label(payload.mime_type())),
            ..Diagnostics::default()
        };
        let outcome = if payload.mime_type().starts_with("image/") {
            self.process(payload.mime_type(), payload.bytes(), constraints, &mut diag)
        } else {
            Err(NormalizeError::NotAnImage(payload.mime_type().to_string()))
        };
        diag.into_result(outcome)
    }

    fn process(
        &self,
        declared: &str,
        data: &[u8],
        constraints: &Constraints,
        diag: &mut Diagnostics,
    ) -> Result<Vec<u8>, NormalizeError> {
        let size_mb = data.len() as f64 / BYTES_PER_MB;
        diag.size_in_megabytes = Some(size_mb);
        if size_mb.is_nan() || size_mb <= 0.0 {
            return Err(NormalizeError::CorruptSize { bytes: data.len() });
        }
        if size_mb > constraints.max_size_mb {
            return Err(NormalizeError::TooLarge {
                size_mb,
                max_mb: constraints.max_size_mb,
            });
        }

        if let Some(kind) = infer::get(data) {
            if !same_format(kind.mime_type(), declared) {
                debug!(
                    declared = %declared,
                    detected = %kind.mime_type(),
                    "Declared type differs from content"
                );
            }
        }

        let jpeg = if is_jpeg_mime(declared) {
            if !has_jpeg_signature(data) {
                return Err(NormalizeError::SignatureMismatch {
                    found: leading_bytes(data),
                });
            }
            repair(data, &self.policy)?.bytes
        } else if has_jpeg_signature(data) {
            debug!(declared = %declared, "Content carries a JPEG signature, repairing instead of wrapping");
            repair(data, &self.policy)?.bytes
        } else {
            let dimensions = probe_dimensions(data);
            debug!(declared = %declared, dimensions = ?dimensions, "Synthesizing JPEG container");
            synthesize(data, dimensions, self.policy.synthetic_stuffing_offset)?
        };

        let outcome = extract_dimensions(&jpeg, constraints.bounds());
        diag.dimensions = outcome.dimensions();
        match outcome {
            DimensionOutcome::Accepted { .. } => {}
            DimensionOutcome::Rejected { error, .. } => return Err(error.into()),
            DimensionOutcome::Undetermined => return Err(DimensionError::Undetermined.into()),
            DimensionOutcome::NotJpeg => return Err(NormalizeError::DimensionsUnverified),
        }

        verify_structure(&jpeg)?;

        info!(
            declared = %declared,
            input_size = data.len(),
            output_size = jpeg.len(),
            width = ?diag.dimensions.map(|(w, _)| w),
            height = ?diag.dimensions.map(|(_, h)| h),
            "Normalized image"
        );

        Ok(jpeg)
    }
}

fn is_jpeg_mime(mime: &str) -> bool {
    matches!(mime, "image/jpeg" | "image/jpg" | "image/pjpeg")
}

fn same_format(detected: &str, declared: &str) -> bool {
    detected == declared || (is_jpeg_mime(detected) && is_jpeg_mime(declared))
}

/// Short label for a MIME type: `image/x-png` -> `png`, `image/jpg` -> `jpeg`.
pub fn format_label(mime: &str) -> String {
    let subtype = mime.split_once('/').map_or(mime, |(_, sub)| sub);
    let subtype = subtype.strip_prefix("x-").unwrap_or(subtype);
    let subtype = subtype.split('+').next().unwrap_or(subtype);
    match subtype {
        "jpg" | "pjpeg" => "jpeg".to_string(),
        other => other.to_string(),
    }
}

fn leading_bytes(data: &[u8]) -> String {
    data.iter()
        .take(4)
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
