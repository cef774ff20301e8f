//! Login state machine
//!
//! `Idle -> Submitting -> {OtpRequired, Lockout, Authenticated, Failed}`.
//! The flow counts consecutive failed logins on the client and locks the
//! form after the fifth; a 429 from the server locks it straight away with
//! the server's deadline. OTP challenge and lockout never coexist.
//!
//! The failed-attempt counter resets when a lockout ends and when a login
//! completes, and is never decremented otherwise.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use iris_common::api::{LoginRequest, VerifyOtpRequest};
use iris_common::events::{EventBus, IrisEvent};
use iris_common::time;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::backend::AuthBackend;
use crate::error::{ClientError, ClientResult};
use crate::lockout::{LockoutHandle, LockoutTimer};
use crate::navigation::{Navigator, Route};
use crate::otp_input::OTP_LENGTH;
use crate::register::otpauth_url;
use crate::session::{SessionStore, User};

/// Consecutive failures that lock the form
pub const LOCKOUT_THRESHOLD: u32 = 5;

/// Client-side lockout length
pub const LOCKOUT_MINUTES: i64 = 15;

pub const LOGIN_FAILED: &str = "Login failed";
pub const CONNECTION_FAILED: &str = "Unable to connect to server. Please try again.";
pub const INVALID_OTP: &str = "Invalid OTP code";
pub const OTP_CONNECTION_FAILED: &str = "Failed to verify OTP. Please try again.";

/// Pending second factor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    pub username: String,
    pub otp_secret: String,
}

impl OtpChallenge {
    /// Provisioning URL rendered as a QR code next to the code entry
    pub fn otpauth_url(&self) -> String {
        otpauth_url(&self.username, &self.otp_secret)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lockout {
    pub until: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    Submitting,
    OtpRequired(OtpChallenge),
    Lockout(Lockout),
    Authenticated(User),
    /// Message shown above the form
    Failed(String),
}

impl AuthState {
    pub fn phase(&self) -> &'static str {
        match self {
            AuthState::Idle => "idle",
            AuthState::Submitting => "submitting",
            AuthState::OtpRequired(_) => "otp_required",
            AuthState::Lockout(_) => "lockout",
            AuthState::Authenticated(_) => "authenticated",
            AuthState::Failed(_) => "failed",
        }
    }
}

pub struct AuthFlow<B> {
    backend: Arc<B>,
    session: SessionStore,
    navigator: Navigator,
    events: EventBus,
    state: AuthState,
    failed_attempts: u32,
    otp_error: Option<String>,
}

impl<B: AuthBackend> AuthFlow<B> {
    pub fn new(backend: Arc<B>, session: SessionStore, navigator: Navigator) -> Self {
        let events = session.events().clone();
        Self {
            backend,
            session,
            navigator,
            events,
            state: AuthState::Idle,
            failed_attempts: 0,
            otp_error: None,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Error shown under the OTP entry while a challenge is pending
    pub fn otp_error(&self) -> Option<&str> {
        self.otp_error.as_deref()
    }

    pub fn lockout(&self) -> Option<Lockout> {
        match self.state {
            AuthState::Lockout(lockout) => Some(lockout),
            _ => None,
        }
    }

    fn transition(&mut self, state: AuthState) {
        if self.state.phase() != state.phase() {
            debug!(from = self.state.phase(), to = state.phase(), "Auth flow transition");
            self.events.emit(IrisEvent::AuthPhaseChanged {
                phase: state.phase().to_string(),
                timestamp: time::now(),
            });
        }
        self.state = state;
    }

    fn enter_lockout(&mut self, until: DateTime<Utc>) {
        warn!(%until, failed_attempts = self.failed_attempts, "Login locked out");
        self.otp_error = None;
        self.transition(AuthState::Lockout(Lockout { until }));
    }

    fn complete(&mut self, user: User, token: Option<String>) {
        info!(username = %user.username, "Login complete");
        self.failed_attempts = 0;
        self.otp_error = None;
        self.session.login(user.clone(), token);
        self.navigator
            .push(&Route::Home.path(), Some(json!({ "username": user.username })));
        self.transition(AuthState::Authenticated(user));
    }

    /// Send credentials; the resulting state is also returned
    ///
    /// Refused while locked out. Finding the flow still `Submitting` means
    /// the previous call was dropped before the server answered, so the
    /// new attempt replaces it.
    pub async fn submit_login(&mut self, username: &str, password: &str) -> &AuthState {
        match self.state {
            AuthState::Lockout(_) => return &self.state,
            AuthState::Submitting => debug!("Abandoned login superseded"),
            _ => {}
        }
        if username.trim().is_empty() || password.is_empty() {
            let err = ClientError::Validation("Username and password are required".to_string());
            self.transition(AuthState::Failed(err.to_string()));
            return &self.state;
        }

        self.transition(AuthState::Submitting);
        let request = LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };

        match self.backend.login(&request).await {
            Ok(response) if response.require_otp => {
                let challenge = OtpChallenge {
                    username: request.username,
                    otp_secret: response.otp_secret.unwrap_or_default(),
                };
                self.otp_error = None;
                self.transition(AuthState::OtpRequired(challenge));
            }
            Ok(response) => {
                let user = User {
                    username: response.username.unwrap_or(request.username),
                    email: response.email.unwrap_or_default(),
                };
                self.complete(user, response.token);
            }
            Err(ClientError::Auth {
                status: 429,
                lockout_until,
                ..
            }) => {
                let until = lockout_until.unwrap_or_else(|| time::minutes_from_now(LOCKOUT_MINUTES));
                self.enter_lockout(until);
            }
            Err(err) if err.is_network() => {
                warn!("Login request failed: {}", err);
                self.transition(AuthState::Failed(CONNECTION_FAILED.to_string()));
            }
            Err(err) => {
                let message = err.server_message().unwrap_or(LOGIN_FAILED).to_string();
                self.failed_attempts += 1;
                if self.failed_attempts >= LOCKOUT_THRESHOLD {
                    self.enter_lockout(time::now() + Duration::minutes(LOCKOUT_MINUTES));
                } else {
                    debug!(failed_attempts = self.failed_attempts, "Login rejected");
                    self.transition(AuthState::Failed(message));
                }
            }
        }

        &self.state
    }

    /// Verify the authenticator code for the pending challenge
    ///
    /// Anything but exactly six digits is rejected locally. A rejected code
    /// keeps the challenge open with an error message.
    pub async fn submit_otp(&mut self, code: &str) -> ClientResult<()> {
        let challenge = match &self.state {
            AuthState::OtpRequired(challenge) => challenge.clone(),
            _ => return Err(ClientError::Validation("No OTP challenge pending".to_string())),
        };

        let code = code.trim();
        if code.len() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ClientError::Validation(format!("Enter the {}-digit code", OTP_LENGTH)));
        }

        self.otp_error = None;
        let request = VerifyOtpRequest {
            username: challenge.username.clone(),
            otp: code.to_string(),
        };

        match self.backend.verify_otp(&request).await {
            Ok(user) => {
                self.complete(
                    User {
                        username: user.username,
                        email: user.email,
                    },
                    user.token,
                );
                Ok(())
            }
            Err(err) => {
                let message = if err.is_network() {
                    OTP_CONNECTION_FAILED.to_string()
                } else {
                    err.server_message().unwrap_or(INVALID_OTP).to_string()
                };
                warn!(username = %challenge.username, "OTP verification failed: {}", err);
                self.otp_error = Some(message);
                Err(err)
            }
        }
    }

    /// Abandon the OTP challenge and show the login form again
    pub fn back_to_login(&mut self) {
        if matches!(self.state, AuthState::OtpRequired(_)) {
            self.otp_error = None;
            self.transition(AuthState::Idle);
        }
    }

    /// Lockout countdown finished: unlock the form and reset the counter
    pub fn handle_lockout_end(&mut self) {
        self.failed_attempts = 0;
        if matches!(self.state, AuthState::Lockout(_)) {
            info!("Lockout over, login form unlocked");
            self.transition(AuthState::Idle);
        }
    }

    /// Countdown for the current lockout, if any
    pub fn start_lockout_timer<F>(&self, on_end: F) -> Option<LockoutHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        self.lockout()
            .map(|lockout| LockoutTimer::start(lockout.until, self.events.clone(), on_end))
    }

    /// Clear the session and go to the login page
    ///
    /// The server call is best effort; the local session is cleared either way.
    pub async fn logout(&mut self) {
        let token = self.session.token();
        if let Err(e) = self.backend.logout(token.as_deref()).await {
            warn!("Logout request failed: {}", e);
        }
        self.session.logout();
        self.otp_error = None;
        self.transition(AuthState::Idle);
        self.navigator.push(&Route::Login.path(), None);
    }
}
