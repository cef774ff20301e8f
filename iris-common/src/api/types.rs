//! Shared API request/response types
//!
//! Field names follow the JSON the web front end already speaks
//! (`requireOTP`, `otpSecret`, `lockoutUntil`), hence the explicit renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{ContentType, Verdict, WireAnalysis};

// ========================================
// Authentication Types
// ========================================

/// `POST /api/register` body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /api/register` success body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    #[serde(rename = "requireOTP", default)]
    pub require_otp: bool,
    #[serde(rename = "otpSecret")]
    pub otp_secret: String,
}

/// `POST /api/login` body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /api/login` success body
///
/// Either an OTP challenge (`requireOTP = true` + `otpSecret`) or, when the
/// server does not require a second factor, the user object itself.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "requireOTP", default)]
    pub require_otp: bool,
    #[serde(rename = "otpSecret", default, skip_serializing_if = "Option::is_none")]
    pub otp_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// `POST /api/verify-otp` body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub otp: String,
}

/// Authenticated user as returned by verify-otp (and OTP-less login)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub email: String,
    /// Bearer token for history requests and logout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

// ========================================
// Message / Error Bodies
// ========================================

/// `{message}` body used by the auth endpoints, success or failure
///
/// A 429 answer also carries the lockout deadline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(rename = "lockoutUntil", default, skip_serializing_if = "Option::is_none")]
    pub lockout_until: Option<DateTime<Utc>>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            lockout_until: None,
        }
    }
}

/// `{error}` body used by the analysis endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ========================================
// Analysis Types
// ========================================

/// `POST /api/analyze-ai` body
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InterpretRequest {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub result: String,
    /// Verdict confidence as a whole percentage (0.92 is sent as 92)
    pub confidence: f64,
    #[serde(default)]
    pub filename: Option<String>,
}

/// `POST /api/analyze-ai` success body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InterpretResponse {
    pub analysis: String,
}

/// One row of `GET /api/user/history`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: ContentType,
    pub model: String,
    pub verdict: Verdict,
    pub analysis: WireAnalysis,
    pub uploaded_at: DateTime<Utc>,
}

// ========================================
// Articles
// ========================================

/// Article as listed by `GET /api/articles`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub date: String,
    pub excerpt: String,
    pub slug: String,
}

/// Article as returned by `GET /api/articles/:slug`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub summary: ArticleSummary,
    pub content: String,
}

// ========================================
// Health
// ========================================

/// `GET /api/health` body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub module: String,
    pub version: String,
    #[serde(default)]
    pub uptime_seconds: u64,
}
