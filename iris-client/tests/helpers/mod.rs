//! Scripted backend shared by the client integration tests
//!
//! Each endpoint replays queued responses in order and records the request
//! body it was called with. An endpoint with nothing queued answers with a
//! network error. `stall` makes the next call to an endpoint hang forever.

#![allow(dead_code)]

use async_trait::async_trait;
use iris_client::backend::{AnalysisBackend, AnalysisSubmission, AuthBackend, SubmissionPayload};
use iris_client::{ClientError, ClientResult};
use iris_common::analysis::WireAnalysis;
use iris_common::api::{
    InterpretRequest, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
    UserResponse, VerifyOtpRequest,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub endpoint: &'static str,
    pub body: Value,
}

#[derive(Default)]
pub struct ScriptedBackend {
    login: Mutex<VecDeque<ClientResult<LoginResponse>>>,
    verify: Mutex<VecDeque<ClientResult<UserResponse>>>,
    register: Mutex<VecDeque<ClientResult<RegisterResponse>>>,
    analyze: Mutex<VecDeque<ClientResult<WireAnalysis>>>,
    interpret: Mutex<VecDeque<ClientResult<String>>>,
    stalled: Mutex<Vec<&'static str>>,
    calls: Mutex<Vec<Call>>,
}

fn next<T>(queue: &Mutex<VecDeque<ClientResult<T>>>) -> ClientResult<T> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(ClientError::Network("connection refused".to_string())))
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_login(&self, response: ClientResult<LoginResponse>) -> &Self {
        self.login.lock().unwrap().push_back(response);
        self
    }

    pub fn on_verify(&self, response: ClientResult<UserResponse>) -> &Self {
        self.verify.lock().unwrap().push_back(response);
        self
    }

    pub fn on_register(&self, response: ClientResult<RegisterResponse>) -> &Self {
        self.register.lock().unwrap().push_back(response);
        self
    }

    pub fn on_analyze(&self, response: ClientResult<WireAnalysis>) -> &Self {
        self.analyze.lock().unwrap().push_back(response);
        self
    }

    pub fn on_interpret(&self, response: ClientResult<String>) -> &Self {
        self.interpret.lock().unwrap().push_back(response);
        self
    }

    /// The next call to `endpoint` never answers
    pub fn stall(&self, endpoint: &'static str) -> &Self {
        self.stalled.lock().unwrap().push(endpoint);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.endpoint == endpoint).collect()
    }

    async fn record(&self, endpoint: &'static str, body: Value) {
        self.calls.lock().unwrap().push(Call { endpoint, body });
        let stall = {
            let mut stalled = self.stalled.lock().unwrap();
            match stalled.iter().position(|e| *e == endpoint) {
                Some(i) => {
                    stalled.remove(i);
                    true
                }
                None => false,
            }
        };
        if stall {
            std::future::pending::<()>().await;
        }
    }
}

/// 401 with a server message
pub fn rejected(message: &str) -> ClientError {
    ClientError::Auth {
        status: 401,
        message: Some(message.to_string()),
        lockout_until: None,
    }
}

pub fn user_response(username: &str, email: &str, token: Option<&str>) -> UserResponse {
    UserResponse {
        username: username.to_string(),
        email: email.to_string(),
        token: token.map(str::to_string),
    }
}

pub fn otp_challenge(secret: &str) -> LoginResponse {
    LoginResponse {
        message: Some("Please enter your authenticator code".to_string()),
        require_otp: true,
        otp_secret: Some(secret.to_string()),
        ..LoginResponse::default()
    }
}

#[async_trait]
impl AuthBackend for ScriptedBackend {
    async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse> {
        self.record("login", serde_json::to_value(request).unwrap()).await;
        next(&self.login)
    }

    async fn verify_otp(&self, request: &VerifyOtpRequest) -> ClientResult<UserResponse> {
        self.record("verify-otp", serde_json::to_value(request).unwrap()).await;
        next(&self.verify)
    }

    async fn register(&self, request: &RegisterRequest) -> ClientResult<RegisterResponse> {
        self.record("register", serde_json::to_value(request).unwrap()).await;
        next(&self.register)
    }

    async fn logout(&self, token: Option<&str>) -> ClientResult<()> {
        self.record("logout", json!({ "token": token })).await;
        Ok(())
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    async fn analyze(&self, submission: &AnalysisSubmission) -> ClientResult<WireAnalysis> {
        let payload = match &submission.payload {
            SubmissionPayload::File(file) => json!({ "file": file.name, "size": file.size() }),
            SubmissionPayload::Text(fields) => serde_json::to_value(fields).unwrap(),
        };
        self.record(
            "analyze",
            json!({
                "type": submission.content_type,
                "model": submission.model,
                "payload": payload,
                "token": submission.token,
            }),
        )
        .await;
        next(&self.analyze)
    }

    async fn interpret(&self, request: &InterpretRequest) -> ClientResult<String> {
        self.record("analyze-ai", serde_json::to_value(request).unwrap()).await;
        next(&self.interpret)
    }
}
