//! Analysis endpoints
//!
//! `POST /api/analyze` takes a multipart upload, relays it to the inference
//! backend and records the outcome; `POST /api/analyze-ai` turns a verdict
//! into a readable explanation.

use axum::{
    extract::{multipart::Field, Multipart, State},
    routing::post,
    Json, Router,
};
use iris_common::analysis::{AnalysisResult, TextFields, WireAnalysis};
use iris_common::api::{InterpretRequest, InterpretResponse};
use iris_common::ContentType;
use tracing::{info, warn};

use super::OptionalUser;
use crate::db::contents::{self, NewContent};
use crate::error::{ApiError, ApiResult};
use crate::services::{InferenceRequest, Payload};
use crate::AppState;

/// Fields collected from the multipart form
#[derive(Default)]
struct UploadForm {
    content_type: Option<String>,
    model: Option<String>,
    file: Option<(String, Option<String>, Vec<u8>)>,
    text: TextFields,
}

async fn field_text(field: Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::InvalidUpload(format!("Unreadable form field: {}", e)))
}

async fn read_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidUpload(format!("Malformed upload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let mime = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::InvalidUpload(format!("Upload interrupted: {}", e)))?;
                // Browsers send an empty part when no file was picked
                if !file_name.is_empty() && !bytes.is_empty() {
                    form.file = Some((file_name, mime, bytes.to_vec()));
                }
            }
            "type" => form.content_type = Some(field_text(field).await?),
            "model" => form.model = Some(field_text(field).await?),
            other if TextFields::FIELD_NAMES.contains(&other) => {
                let value = field_text(field).await?;
                form.text.set(other, value);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /api/analyze
pub async fn analyze(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    multipart: Multipart,
) -> ApiResult<Json<WireAnalysis>> {
    let form = read_form(multipart).await?;

    let content_type: ContentType = match form.content_type.as_deref().map(str::trim) {
        None | Some("") => ContentType::Image,
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::InvalidUpload(format!("Unsupported content type: {}", raw)))?,
    };

    let model = match form.model.as_deref().map(str::trim) {
        None | Some("") => content_type.default_model(),
        Some(key) => content_type.find_model(key).ok_or_else(|| {
            ApiError::InvalidUpload(format!("Unknown model {} for {} analysis", key, content_type))
        })?,
    };

    let payload = if content_type.requires_file() {
        let (name, mime, bytes) = form.file.ok_or_else(|| {
            ApiError::InvalidUpload(format!("No {} file provided", content_type))
        })?;
        Payload::File { name, mime, bytes }
    } else {
        if !form.text.is_complete() {
            return Err(ApiError::InvalidUpload(format!(
                "Missing text fields: {}",
                form.text.missing().join(", ")
            )));
        }
        Payload::Text(form.text)
    };

    let file_name = payload
        .file_name()
        .map(str::to_string)
        .unwrap_or_else(|| match &payload {
            Payload::Text(fields) => fields.title.clone(),
            Payload::File { .. } => String::new(),
        });
    let file_size = payload.size() as i64;

    info!(content_type = %content_type, model = model.id, backend = state.inference.name(), "Running analysis");

    let wire = state
        .inference
        .analyze(InferenceRequest {
            content_type,
            model,
            payload,
        })
        .await
        .map_err(|e| {
            warn!(content_type = %content_type, "Inference failed: {}", e);
            ApiError::Upstream(e.to_string())
        })?;

    let result = AnalysisResult::from_wire(content_type, wire);
    let mut body = result.to_wire();
    body.confidence = Some(result.verdict_confidence());
    if content_type.requires_file() && body.filename.is_none() {
        body.filename = Some(file_name.clone());
    }

    contents::insert_content(
        &state.db,
        &NewContent {
            user_id: user.as_ref().map(|u| u.user_id),
            file_name: &file_name,
            file_size,
            content_type,
            model: model.id,
            verdict: result.verdict(),
            analysis: &body,
        },
    )
    .await
    .map_err(|e| ApiError::AnalysisFailed(e.to_string()))?;

    Ok(Json(body))
}

/// POST /api/analyze-ai
pub async fn analyze_ai(
    State(state): State<AppState>,
    Json(req): Json<InterpretRequest>,
) -> ApiResult<Json<InterpretResponse>> {
    let analysis = state.inference.interpret(&req).await.map_err(|e| {
        warn!(content_type = %req.content_type, "Interpretation failed: {}", e);
        ApiError::Upstream(e.to_string())
    })?;

    Ok(Json(InterpretResponse { analysis }))
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/analyze-ai", post(analyze_ai))
}
