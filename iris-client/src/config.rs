//! Client configuration and endpoint URLs

use std::env;

/// Base URL used when `IRIS_API_URL` is not set
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Environment variable overriding the API base URL
pub const API_URL_ENV: &str = "IRIS_API_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base of every endpoint, including the `/api` prefix
    pub api_base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
        }
    }

    /// Defaults overridden by `IRIS_API_URL` when set and non-blank
    pub fn from_env() -> Self {
        match env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => {
                tracing::debug!(url = %url.trim(), "API base URL from environment");
                Self::new(url.trim())
            }
            _ => Self::default(),
        }
    }

    pub fn urls(&self) -> ApiUrls {
        ApiUrls::new(&self.api_base_url)
    }
}

/// Endpoint URLs derived from one base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUrls {
    base: String,
}

impl ApiUrls {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn join(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    pub fn register(&self) -> String {
        self.join("register")
    }

    pub fn login(&self) -> String {
        self.join("login")
    }

    pub fn verify_otp(&self) -> String {
        self.join("verify-otp")
    }

    pub fn logout(&self) -> String {
        self.join("logout")
    }

    pub fn analyze(&self) -> String {
        self.join("analyze")
    }

    pub fn analyze_ai(&self) -> String {
        self.join("analyze-ai")
    }

    pub fn user_history(&self) -> String {
        self.join("user/history")
    }

    pub fn articles(&self) -> String {
        self.join("articles")
    }

    pub fn article(&self, slug: &str) -> String {
        self.join(&format!("articles/{}", slug))
    }

    pub fn health(&self) -> String {
        self.join("health")
    }
}
