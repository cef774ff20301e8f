//! Inference relay
//!
//! The classifiers themselves run elsewhere. [`RemoteInference`] forwards
//! uploads to one HTTP endpoint per content type; [`MockInference`] answers
//! with fixed results so the whole flow can be demonstrated (and tested)
//! without any model deployed.

use async_trait::async_trait;
use iris_common::analysis::{FramePrediction, ModelInfo, TextFields, WireAnalysis};
use iris_common::api::{InterpretRequest, InterpretResponse};
use iris_common::config::{InferenceConfig, InferenceEndpoints, InferenceMode};
use iris_common::ContentType;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::interpreter;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("No inference endpoint configured for {0}")]
    NotConfigured(ContentType),

    #[error("Inference service answered {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Inference service unreachable: {0}")]
    Transport(String),

    #[error("Inference response could not be decoded: {0}")]
    Decode(String),
}

/// Uploaded content
#[derive(Debug, Clone)]
pub enum Payload {
    File {
        name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
    Text(TextFields),
}

impl Payload {
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Payload::File { name, .. } => Some(name),
            Payload::Text(_) => None,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Payload::File { bytes, .. } => bytes.len(),
            Payload::Text(fields) => fields.values().iter().map(|v| v.len()).sum(),
        }
    }
}

/// One analysis to run
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub content_type: ContentType,
    pub model: &'static ModelInfo,
    pub payload: Payload,
}

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Classify the payload
    async fn analyze(&self, request: InferenceRequest) -> Result<WireAnalysis, InferenceError>;

    /// Narrative explanation of a verdict
    async fn interpret(&self, request: &InterpretRequest) -> Result<String, InferenceError> {
        Ok(interpreter::compose(request))
    }

    fn name(&self) -> &'static str;
}

/// Build the backend selected by configuration
pub fn from_config(config: &InferenceConfig) -> Result<Arc<dyn InferenceBackend>, InferenceError> {
    match config.mode {
        InferenceMode::Mock => Ok(Arc::new(MockInference)),
        InferenceMode::Remote => Ok(Arc::new(RemoteInference::new(config)?)),
    }
}

// ========================================
// Remote
// ========================================

/// Relay to the configured classifier endpoints
pub struct RemoteInference {
    http_client: Client,
    endpoints: InferenceEndpoints,
    interpretation_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RemoteInference {
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoints: config.endpoints.clone(),
            interpretation_url: config.interpretation_url.clone(),
        })
    }

    fn build_form(request: InferenceRequest) -> Result<Form, InferenceError> {
        let form = Form::new()
            .text("type", request.content_type.as_str())
            .text("model", request.model.id);

        match request.payload {
            Payload::File { name, mime, bytes } => {
                let mut part = Part::bytes(bytes).file_name(name);
                if let Some(mime) = mime {
                    part = part
                        .mime_str(&mime)
                        .map_err(|e| InferenceError::Transport(e.to_string()))?;
                }
                Ok(form.part("file", part))
            }
            Payload::Text(fields) => Ok(TextFields::FIELD_NAMES
                .iter()
                .zip(fields.values())
                .fold(form, |form, (name, value)| form.text(*name, value.to_string()))),
        }
    }

    async fn fetch_interpretation(
        &self,
        url: &str,
        request: &InterpretRequest,
    ) -> Result<String, InferenceError> {
        let response = self
            .http_client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        response
            .json::<InterpretResponse>()
            .await
            .map(|body| body.analysis)
            .map_err(|e| InferenceError::Decode(e.to_string()))
    }

    async fn upstream_error(response: reqwest::Response) -> InferenceError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<UpstreamError>(&body)
            .ok()
            .and_then(|e| e.error.or(e.message))
            .unwrap_or_else(|| format!("HTTP {}", status));
        InferenceError::Upstream { status, message }
    }
}

#[async_trait]
impl InferenceBackend for RemoteInference {
    async fn analyze(&self, request: InferenceRequest) -> Result<WireAnalysis, InferenceError> {
        let content_type = request.content_type;
        let url = self
            .endpoints
            .for_type(content_type)
            .ok_or(InferenceError::NotConfigured(content_type))?
            .to_string();

        debug!(%url, content_type = %content_type, model = request.model.id, "Forwarding to inference service");

        let form = Self::build_form(request)?;
        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        response
            .json::<WireAnalysis>()
            .await
            .map_err(|e| InferenceError::Decode(e.to_string()))
    }

    async fn interpret(&self, request: &InterpretRequest) -> Result<String, InferenceError> {
        let Some(url) = self.interpretation_url.as_deref() else {
            return Ok(interpreter::compose(request));
        };

        match self.fetch_interpretation(url, request).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!("Interpretation service failed, using local text: {}", e);
                Ok(interpreter::compose(request))
            }
        }
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

// ========================================
// Mock
// ========================================

/// Fixed answers per content type
pub struct MockInference;

/// Frame labels returned for every mock video: 7 of 10 real
const MOCK_VIDEO_FRAMES: [&str; 10] = [
    "Real", "Real", "Fake", "Real", "Real", "Fake", "Real", "Real", "Fake", "Real",
];

impl MockInference {
    fn media(result: &str, real: f64, fake: f64, filename: Option<&str>) -> WireAnalysis {
        WireAnalysis {
            result: Some(result.to_string()),
            real_confidence: Some(real),
            fake_confidence: Some(fake),
            filename: filename.map(str::to_string),
            ..WireAnalysis::default()
        }
    }
}

#[async_trait]
impl InferenceBackend for MockInference {
    async fn analyze(&self, request: InferenceRequest) -> Result<WireAnalysis, InferenceError> {
        let filename = request.payload.file_name();

        Ok(match request.content_type {
            ContentType::Image => Self::media("fake", 0.08, 0.92, filename),
            ContentType::Audio => Self::media("fake", 0.18, 0.82, filename),
            ContentType::Video => {
                let mut wire = Self::media("real", 0.75, 0.25, filename);
                wire.predictions = Some(
                    MOCK_VIDEO_FRAMES
                        .iter()
                        .enumerate()
                        .map(|(i, label)| FramePrediction {
                            frame: i as u32,
                            label: label.to_string(),
                        })
                        .collect(),
                );
                wire
            }
            ContentType::Text => {
                let title = match &request.payload {
                    Payload::Text(fields) => Some(fields.title.clone()),
                    Payload::File { .. } => None,
                };
                WireAnalysis {
                    undecided_confidence: Some(0.05),
                    label: Some("Fake News".to_string()),
                    title,
                    reason: Some(
                        "Sensational headline with no attributable sources".to_string(),
                    ),
                    ..Self::media("fake", 0.15, 0.85, None)
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
