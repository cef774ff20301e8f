//! Account endpoints: register, login, verify-otp, logout
//!
//! Login is two-step when `auth.require_otp` is set: a correct password
//! opens a short OTP window and the session token is only issued by
//! verify-otp.

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use chrono::{Duration, Utc};
use iris_common::api::{
    LoginRequest, LoginResponse, MessageResponse, RegisterRequest, RegisterResponse, UserResponse,
    VerifyOtpRequest,
};
use iris_common::validation::is_valid_email;
use std::net::SocketAddr;
use tracing::{info, warn};

use super::{bearer_token, client_ip};
use crate::db::users::{self, NewUser};
use crate::error::{ApiError, ApiResult};
use crate::services::{password, totp};
use crate::AppState;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|_| ApiError::BadRequest("No data provided".to_string()))
}

/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterResponse>> {
    state.limiters.check_register(client_ip(connect_info))?;
    let req = body(payload)?;

    let username = req.username.trim();
    let email = req.email.trim();
    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("All fields are required".to_string()));
    }
    if !is_valid_email(email) {
        return Err(ApiError::BadRequest("Invalid email format".to_string()));
    }
    if users::email_exists(&state.db, email).await? {
        return Err(ApiError::BadRequest("Email already registered".to_string()));
    }
    if users::username_exists(&state.db, username).await? {
        return Err(ApiError::BadRequest("Username already taken".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;
    let otp_secret = totp::generate_secret();

    users::insert_user(
        &state.db,
        &NewUser {
            username,
            email,
            password_hash: &password_hash,
            otp_secret: &otp_secret,
        },
    )
    .await?;

    info!(username = %username, "Registered new account");

    Ok(Json(RegisterResponse {
        message: "Registration successful".to_string(),
        require_otp: true,
        otp_secret,
    }))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    state.limiters.check_login(client_ip(connect_info))?;
    let req = body(payload)?;
    let auth = &state.config.auth;
    let now = Utc::now();

    let user = users::find_by_username(&state.db, req.username.trim())
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if let Some(lockout_until) = user.active_lockout(now) {
        warn!(username = %user.username, %lockout_until, "Login refused, account locked");
        return Err(ApiError::Locked {
            message: "Account temporarily locked".to_string(),
            lockout_until,
        });
    }

    if !password::verify_password(&req.password, &user.password_hash) {
        // An expired lockout starts a fresh count
        let previous = if user.lockout_until.is_some() { 0 } else { user.failed_attempts };
        let failed_attempts = previous + 1;
        let lockout_until = (failed_attempts >= auth.max_failed_attempts as i64)
            .then(|| now + Duration::minutes(auth.lockout_minutes));

        users::record_failed_attempt(&state.db, user.id, failed_attempts, lockout_until).await?;
        warn!(username = %user.username, failed_attempts, locked = lockout_until.is_some(), "Wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if !auth.require_otp {
        users::complete_login(&state.db, user.id).await?;
        let token = state.sessions.create(user.id, &user.username, &user.email).await;
        info!(username = %user.username, "Logged in without second factor");
        return Ok(Json(LoginResponse {
            username: Some(user.username),
            email: Some(user.email),
            token: Some(token),
            ..LoginResponse::default()
        }));
    }

    users::open_otp_window(&state.db, user.id, now + Duration::minutes(auth.otp_validity_minutes))
        .await?;
    info!(username = %user.username, "Password accepted, awaiting OTP");

    Ok(Json(LoginResponse {
        message: Some("Please enter your authenticator code".to_string()),
        require_otp: true,
        otp_secret: user.otp_secret,
        ..LoginResponse::default()
    }))
}

/// POST /api/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    state.limiters.check_verify_otp(client_ip(connect_info))?;
    let req = body(payload)?;
    let now = Utc::now();

    let user = users::find_by_username(&state.db, req.username.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let window_open = user.otp_expiry.is_some_and(|expiry| expiry > now);
    let secret = match (&user.otp_secret, window_open) {
        (Some(secret), true) => secret,
        _ => return Err(ApiError::BadRequest("OTP expired, please log in again".to_string())),
    };

    let valid = totp::verify(secret, &req.otp, now.timestamp().max(0) as u64, state.config.auth.otp_skew_steps)
        .map_err(|e| ApiError::Internal(format!("Stored OTP secret for {} unusable: {}", user.username, e)))?;

    if !valid {
        warn!(username = %user.username, "OTP rejected");
        return Err(ApiError::BadRequest("Invalid OTP".to_string()));
    }

    users::complete_login(&state.db, user.id).await?;
    let token = state.sessions.create(user.id, &user.username, &user.email).await;
    info!(username = %user.username, "OTP verified, session issued");

    Ok(Json(UserResponse {
        username: user.username,
        email: user.email,
        token: Some(token),
    }))
}

/// POST /api/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<MessageResponse> {
    if let Some(token) = bearer_token(&headers) {
        if state.sessions.revoke(token).await {
            info!("Session revoked");
        }
    }
    Json(MessageResponse::new("Logged out"))
}

/// Build account routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify-otp", post(verify_otp))
        .route("/logout", post(logout))
}
