//! Seams between the state machines and the server
//!
//! [`crate::http::HttpBackend`] implements these against the real API; tests
//! plug in scripted implementations.

use async_trait::async_trait;
use iris_common::analysis::{TextFields, WireAnalysis};
use iris_common::api::{
    ArticleDetail, ArticleSummary, HealthResponse, HistoryEntry, InterpretRequest, LoginRequest,
    LoginResponse, RegisterRequest, RegisterResponse, UserResponse, VerifyOtpRequest,
};
use iris_common::ContentType;

use crate::error::ClientResult;

/// File picked for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.map(str::to_string),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// What goes into the analyze form besides `type` and `model`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionPayload {
    File(UploadFile),
    Text(TextFields),
}

/// One `POST /api/analyze` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSubmission {
    pub content_type: ContentType,
    /// Model id sent as the `model` field
    pub model: String,
    pub payload: SubmissionPayload,
    /// Bearer token, so the upload lands in the user's history
    pub token: Option<String>,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse>;

    async fn verify_otp(&self, request: &VerifyOtpRequest) -> ClientResult<UserResponse>;

    async fn register(&self, request: &RegisterRequest) -> ClientResult<RegisterResponse>;

    async fn logout(&self, token: Option<&str>) -> ClientResult<()>;
}

#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn analyze(&self, submission: &AnalysisSubmission) -> ClientResult<WireAnalysis>;

    /// Narrative explanation of a verdict
    async fn interpret(&self, request: &InterpretRequest) -> ClientResult<String>;
}

/// Read-only collections
#[async_trait]
pub trait ContentBackend: Send + Sync {
    async fn history(&self, token: &str) -> ClientResult<Vec<HistoryEntry>>;

    async fn articles(&self) -> ClientResult<Vec<ArticleSummary>>;

    async fn article(&self, slug: &str) -> ClientResult<ArticleDetail>;

    async fn health(&self) -> ClientResult<HealthResponse>;
}
