//! Normalization endpoints.
//!
//! - `POST /api/normalize` - JSON body with a base64 data URL
//! - `POST /api/normalize/upload` - multipart form with a `file` field
//!
//! Both return a [`NormalizationResult`]: `200 OK` when the image is valid,
//! `422 Unprocessable Entity` when it was rejected. Malformed requests
//! (bad JSON, missing form field) are `400` with the usual error body.
//!
//! # Example
//!
//! ```bash
//! curl -X POST http://localhost:3000/api/normalize \
//!   -H "Content-Type: application/json" \
//!   -d '{"image": "data:image/png;base64,iVBORw0KGgo...", "constraints": {"minShortSide": 256}}'
//!
//! curl -X POST http://localhost:3000/api/normalize/upload -F "file=@photo.jpg"
//! ```

use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::{ConstraintOverrides, EncodedImagePayload, NormalizationResult, NormalizeRequest};
use crate::state::AppState;

const FALLBACK_MIME: &str = "application/octet-stream";

type NormalizeResponse = (StatusCode, Json<NormalizationResult>);

fn respond(result: NormalizationResult) -> NormalizeResponse {
    let status = if result.is_valid {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(result))
}

/// Normalize a data URL
///
/// POST /api/normalize
async fn normalize_data_url(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NormalizeRequest>, JsonRejection>,
) -> Result<NormalizeResponse> {
    let Json(request) = payload?;
    let constraints = request.constraints.apply(state.constraints());
    debug!(
        input_len = request.image.len(),
        constraints = ?constraints,
        "Received normalization request"
    );

    // Repair and synthesis are CPU-bound; keep them off the async workers.
    let normalizer = state.normalizer.clone();
    let result = tokio::task::spawn_blocking(move || {
        normalizer.normalize_with(&request.image, &constraints)
    })
    .await?;

    log_verdict(&result);
    Ok(respond(result))
}

/// Normalize a raw file upload
///
/// POST /api/normalize/upload
///
/// Fields:
/// - `file` (required): the image; its part content type is the declared type
/// - `constraints` (optional): JSON object with the same overrides as the JSON endpoint
async fn normalize_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<NormalizeResponse> {
    let mut file: Option<EncodedImagePayload> = None;
    let mut overrides = ConstraintOverrides::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let declared = field.content_type().map(|s| s.to_ascii_lowercase());
                let data = field.bytes().await?;
                let mime_type = declared
                    .filter(|m| m != FALLBACK_MIME)
                    .or_else(|| infer::get(&data).map(|kind| kind.mime_type().to_string()))
                    .unwrap_or_else(|| FALLBACK_MIME.to_string());
                file = Some(EncodedImagePayload::new(mime_type, data));
            }
            "constraints" => {
                let text = field.text().await?;
                overrides = serde_json::from_str(&text).map_err(|e| {
                    AppError::validation(format!("Invalid constraints field: {}", e))
                })?;
            }
            _ => {}
        }
    }

    let file =
        file.ok_or_else(|| AppError::validation("No file field found in multipart request"))?;
    let constraints = overrides.apply(state.constraints());

    info!(
        mime_type = %file.mime_type(),
        size = file.len(),
        "Received upload for normalization"
    );

    let normalizer = state.normalizer.clone();
    let result =
        tokio::task::spawn_blocking(move || normalizer.normalize_payload(&file, &constraints))
            .await?;

    log_verdict(&result);
    Ok(respond(result))
}

fn log_verdict(result: &NormalizationResult) {
    if result.is_valid {
        info!(
            width = ?result.width,
            height = ?result.height,
            original_format = ?result.original_format,
            "Normalization succeeded"
        );
    } else {
        info!(
            error = ?result.error_message,
            original_format = ?result.original_format,
            "Normalization rejected image"
        );
    }
}

/// Create normalization routes
pub fn normalize_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(normalize_data_url))
        .route("/upload", post(normalize_upload))
}
