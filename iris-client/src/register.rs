//! Registration form, password strength meter and authenticator setup
//!
//! A failed connection is retried (three attempts, one second apart); an
//! answer from the server, success or not, is final.

use std::sync::Arc;
use std::time::Duration;

use iris_common::api::RegisterRequest;
use iris_common::validation::is_valid_email;
use tracing::{info, warn};

use crate::backend::AuthBackend;
use crate::error::{ClientError, ClientResult};

pub const OTP_ISSUER: &str = "IrisApp";

pub const REGISTRATION_FAILED: &str = "Registration failed";
pub const REGISTRATION_CONNECTION_FAILED: &str = "Failed to connect to server";
pub const REGISTRATION_SUCCEEDED: &str = "Account created successfully! Please set up 2FA.";

const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// `otpauth://` provisioning URL understood by authenticator apps
pub fn otpauth_url(username: &str, secret: &str) -> String {
    format!(
        "otpauth://totp/{issuer}:{username}?secret={secret}&issuer={issuer}",
        issuer = OTP_ISSUER,
        username = username,
        secret = secret
    )
}

/// Password strength on a 0..=5 scale, one point per satisfied rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PasswordStrength(u8);

impl PasswordStrength {
    pub fn of(password: &str) -> Self {
        let rules = [
            password.chars().any(|c| c.is_ascii_lowercase()),
            password.chars().any(|c| c.is_ascii_uppercase()),
            password.chars().any(|c| c.is_ascii_digit()),
            password.chars().any(|c| SPECIAL_CHARS.contains(c)),
            password.chars().count() >= 8,
        ];
        PasswordStrength(rules.iter().filter(|ok| **ok).count() as u8)
    }

    pub fn score(&self) -> u8 {
        self.0
    }

    pub fn label(&self) -> &'static str {
        match self.0 {
            0 => "Very weak",
            1 => "Weak",
            2 => "Fair",
            3 => "Good",
            4 => "Strong",
            _ => "Very strong",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    pub fn strength(&self) -> PasswordStrength {
        PasswordStrength::of(&self.password)
    }

    /// Local checks run before anything is sent
    pub fn validate(&self) -> ClientResult<()> {
        if self.username.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(ClientError::Validation("All fields are required".to_string()));
        }
        if !is_valid_email(self.email.trim()) {
            return Err(ClientError::Validation("Invalid email format".to_string()));
        }
        if self.password != self.confirm_password {
            return Err(ClientError::Validation("Passwords do not match".to_string()));
        }
        Ok(())
    }

    fn request(&self) -> RegisterRequest {
        RegisterRequest {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

/// Authenticator enrolment shown after a successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpSetup {
    pub username: String,
    pub otp_secret: String,
    pub otpauth_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationStatus {
    Editing,
    Submitting,
    OtpSetup(OtpSetup),
    Failed(String),
}

pub struct RegistrationFlow<B> {
    backend: Arc<B>,
    max_attempts: u32,
    retry_delay: Duration,
    status: RegistrationStatus,
    notification: Option<String>,
}

impl<B: AuthBackend> RegistrationFlow<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            status: RegistrationStatus::Editing,
            notification: None,
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn status(&self) -> &RegistrationStatus {
        &self.status
    }

    /// Banner text for the last submission
    pub fn notification(&self) -> Option<&str> {
        self.notification.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.status, RegistrationStatus::Submitting)
    }

    pub async fn submit(&mut self, form: &RegistrationForm) -> ClientResult<OtpSetup> {
        if let Err(err) = form.validate() {
            self.notification = Some(err.to_string());
            self.status = RegistrationStatus::Failed(err.to_string());
            return Err(err);
        }

        self.status = RegistrationStatus::Submitting;
        self.notification = None;
        let request = form.request();

        let mut attempt = 1;
        let outcome = loop {
            match self.backend.register(&request).await {
                Err(err) if err.is_network() && attempt < self.max_attempts => {
                    warn!(attempt, max_attempts = self.max_attempts, "Registration request failed, retrying: {}", err);
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                other => break other,
            }
        };

        match outcome {
            Ok(response) => {
                info!(username = %request.username, "Account created");
                let setup = OtpSetup {
                    otpauth_url: otpauth_url(&request.username, &response.otp_secret),
                    username: request.username,
                    otp_secret: response.otp_secret,
                };
                self.notification = Some(REGISTRATION_SUCCEEDED.to_string());
                self.status = RegistrationStatus::OtpSetup(setup.clone());
                Ok(setup)
            }
            Err(err) => {
                let message = if err.is_network() {
                    REGISTRATION_CONNECTION_FAILED
                } else {
                    err.server_message().unwrap_or(REGISTRATION_FAILED)
                };
                self.notification = Some(message.to_string());
                self.status = RegistrationStatus::Failed(message.to_string());
                Err(err)
            }
        }
    }

    /// Enrolment acknowledged; the form is ready for another account
    pub fn finish_setup(&mut self) {
        self.status = RegistrationStatus::Editing;
        self.notification = None;
    }
}
