//! Error types for the image normalizer.
//!
//! Two families live here:
//!
//! - [`NormalizeError`]: every reason the engine can reject an image. These
//!   never escape the engine as `Err`; their `Display` text becomes the
//!   `errorMessage` of a [`NormalizationResult`](crate::models::NormalizationResult).
//! - [`AppError`]: failures of the HTTP surface around the engine, converted
//!   to JSON responses automatically.
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::error::{AppError, Result};
//!
//! fn read_field(data: &[u8]) -> Result<&[u8]> {
//!     if data.is_empty() {
//!         return Err(AppError::validation("Upload data is empty"));
//!     }
//!     Ok(data)
//! }
//! ```

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::jpeg::{DimensionError, JpegError, StructureError};

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Reasons an image is rejected by the normalization engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    // -------------------------------------------------------------------------
    // Input shape
    // -------------------------------------------------------------------------
    #[error("No image data provided")]
    Empty,

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Invalid file type '{0}': only image uploads are supported")]
    NotAnImage(String),

    // -------------------------------------------------------------------------
    // Decoding and size
    // -------------------------------------------------------------------------
    #[error("Corrupt encoding: could not decode base64 payload ({0})")]
    CorruptEncoding(String),

    #[error("Image data is corrupt or empty: decoded size is {bytes} bytes")]
    CorruptSize { bytes: usize },

    #[error("Image is too large: {size_mb:.2}MB exceeds the maximum of {max_mb}MB")]
    TooLarge { size_mb: f64, max_mb: f64 },

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------
    #[error("MIME type claims JPEG but the JPEG signature (FF D8) is absent; found [{found}]")]
    SignatureMismatch { found: String },

    #[error(transparent)]
    Dimensions(#[from] DimensionError),

    #[error("Could not verify dimensions of processed JPEG")]
    DimensionsUnverified,

    #[error("Processed JPEG failed structural verification: {0}")]
    Structure(#[from] StructureError),

    #[error("Error processing image: {0}")]
    Processing(String),
}

impl NormalizeError {
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::MalformedEnvelope(msg.into())
    }
}

impl From<JpegError> for NormalizeError {
    fn from(err: JpegError) -> Self {
        Self::Processing(err.to_string())
    }
}

/// Application error type for the HTTP layer
#[derive(Debug, Error)]
pub enum AppError {
    // -------------------------------------------------------------------------
    // Client Errors (4xx)
    // -------------------------------------------------------------------------
    /// Invalid request body or form
    #[error("Validation error: {0}")]
    Validation(String),

    /// Request payload too large
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Missing or unknown API key
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // -------------------------------------------------------------------------
    // Server Errors (5xx)
    // -------------------------------------------------------------------------
    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a payload too large error
    pub fn payload_too_large<S: Into<String>>(msg: S) -> Self {
        Self::PayloadTooLarge(msg.into())
    }

    /// Create an unauthorized error
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Unauthorized(_) => "unauthorized",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Error response body sent to clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// HTTP status code
    pub status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_server_error() {
            tracing::error!(error = %self, "Server error occurred");
        } else {
            tracing::debug!(error = %self, "Client error occurred");
        }

        // Server error details stay in the logs.
        let message = if self.is_server_error() {
            "An internal error occurred. Please try again later.".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: self.error_type().to_string(),
            message,
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => Self::PayloadTooLarge(rejection.body_text()),
            _ => Self::Validation(rejection.body_text()),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => Self::PayloadTooLarge(err.body_text()),
            _ => Self::Validation(format!("Invalid multipart data: {}", err.body_text())),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Normalization task failed: {}", err))
    }
}
