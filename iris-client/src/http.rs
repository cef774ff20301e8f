//! reqwest backend for the `/api` endpoints
//!
//! Transport failures become [`ClientError::Network`]. Non-2xx answers are
//! decoded from their `{message}` or `{error}` body and mapped by endpoint:
//! auth endpoints to [`ClientError::Auth`], analyze to
//! [`ClientError::Analysis`], analyze-ai to [`ClientError::Interpretation`],
//! everything else to [`ClientError::Status`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use iris_common::analysis::{TextFields, WireAnalysis};
use iris_common::api::{
    ArticleDetail, ArticleSummary, HealthResponse, HistoryEntry, InterpretRequest,
    InterpretResponse, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
    UserResponse, VerifyOtpRequest,
};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::backend::{
    AnalysisBackend, AnalysisSubmission, AuthBackend, ContentBackend, SubmissionPayload,
};
use crate::config::{ApiUrls, ClientConfig};
use crate::error::{ClientError, ClientResult};

const USER_AGENT: &str = concat!("iris-client/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Whatever an error body carries
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
    #[serde(rename = "lockoutUntil")]
    lockout_until: Option<DateTime<Utc>>,
}

struct Failure {
    status: StatusCode,
    message: Option<String>,
    lockout_until: Option<DateTime<Utc>>,
}

impl Failure {
    fn message_or_status(self) -> String {
        self.message
            .unwrap_or_else(|| format!("Server answered {}", self.status))
    }
}

pub struct HttpBackend {
    client: reqwest::Client,
    urls: ApiUrls,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            client,
            urls: config.urls(),
        })
    }

    pub fn urls(&self) -> &ApiUrls {
        &self.urls
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<Result<Response, Failure>> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(Ok(response));
        }

        // Error bodies are best effort; an unreadable one still yields the status
        let body: ErrorBody = response.json().await.unwrap_or_default();
        debug!(status = status.as_u16(), "Request rejected");
        Ok(Err(Failure {
            status,
            message: body.message.or(body.error),
            lockout_until: body.lockout_until,
        }))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn auth_error(failure: Failure) -> ClientError {
        ClientError::Auth {
            status: failure.status.as_u16(),
            message: failure.message,
            lockout_until: failure.lockout_until,
        }
    }

    fn status_error(failure: Failure) -> ClientError {
        let status = failure.status.as_u16();
        ClientError::Status {
            status,
            message: failure.message_or_status(),
        }
    }

    async fn auth_post<Req, Res>(&self, url: String, body: &Req) -> ClientResult<Res>
    where
        Req: serde::Serialize + Sync,
        Res: DeserializeOwned,
    {
        match self.send(self.client.post(url).json(body)).await? {
            Ok(response) => Self::decode(response).await,
            Err(failure) => Err(Self::auth_error(failure)),
        }
    }

    async fn get<Res: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<Res> {
        match self.send(request).await? {
            Ok(response) => Self::decode(response).await,
            Err(failure) => Err(Self::status_error(failure)),
        }
    }

    fn analyze_form(submission: &AnalysisSubmission) -> ClientResult<Form> {
        let form = Form::new()
            .text("type", submission.content_type.as_str())
            .text("model", submission.model.clone());

        match &submission.payload {
            SubmissionPayload::File(file) => {
                let mut part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
                if let Some(mime) = &file.mime {
                    part = part
                        .mime_str(mime)
                        .map_err(|e| ClientError::Validation(format!("Invalid file type {}: {}", mime, e)))?;
                }
                Ok(form.part("file", part))
            }
            SubmissionPayload::Text(fields) => Ok(TextFields::FIELD_NAMES
                .iter()
                .zip(fields.values())
                .fold(form, |form, (name, value)| form.text(*name, value.to_string()))),
        }
    }
}

#[async_trait]
impl AuthBackend for HttpBackend {
    async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse> {
        self.auth_post(self.urls.login(), request).await
    }

    async fn verify_otp(&self, request: &VerifyOtpRequest) -> ClientResult<UserResponse> {
        self.auth_post(self.urls.verify_otp(), request).await
    }

    async fn register(&self, request: &RegisterRequest) -> ClientResult<RegisterResponse> {
        self.auth_post(self.urls.register(), request).await
    }

    async fn logout(&self, token: Option<&str>) -> ClientResult<()> {
        let mut request = self.client.post(self.urls.logout());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        match self.send(request).await? {
            Ok(_) => Ok(()),
            Err(failure) => Err(Self::auth_error(failure)),
        }
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn analyze(&self, submission: &AnalysisSubmission) -> ClientResult<WireAnalysis> {
        let mut request = self
            .client
            .post(self.urls.analyze())
            .multipart(Self::analyze_form(submission)?);
        if let Some(token) = &submission.token {
            request = request.bearer_auth(token);
        }

        match self.send(request).await? {
            Ok(response) => Self::decode(response).await,
            Err(failure) => Err(ClientError::Analysis(failure.message_or_status())),
        }
    }

    async fn interpret(&self, request: &InterpretRequest) -> ClientResult<String> {
        match self.send(self.client.post(self.urls.analyze_ai()).json(request)).await? {
            Ok(response) => Ok(Self::decode::<InterpretResponse>(response).await?.analysis),
            Err(failure) => Err(ClientError::Interpretation(failure.message_or_status())),
        }
    }
}

#[async_trait]
impl ContentBackend for HttpBackend {
    async fn history(&self, token: &str) -> ClientResult<Vec<HistoryEntry>> {
        self.get(self.client.get(self.urls.user_history()).bearer_auth(token))
            .await
    }

    async fn articles(&self) -> ClientResult<Vec<ArticleSummary>> {
        self.get(self.client.get(self.urls.articles())).await
    }

    async fn article(&self, slug: &str) -> ClientResult<ArticleDetail> {
        self.get(self.client.get(self.urls.article(slug))).await
    }

    async fn health(&self) -> ClientResult<HealthResponse> {
        self.get(self.client.get(self.urls.health())).await
    }
}
