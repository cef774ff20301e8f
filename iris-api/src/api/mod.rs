//! HTTP API handlers for iris-api
//!
//! Every route is mounted under `/api`. Handlers that need the caller's
//! identity take [`CurrentUser`] (token required) or [`OptionalUser`]
//! (guests allowed).

pub mod analyze;
pub mod articles;
pub mod auth;
pub mod health;
pub mod history;

pub use analyze::analyze_routes;
pub use articles::article_routes;
pub use auth::auth_routes;
pub use health::health_routes;
pub use history::history_routes;

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{header, request::Parts, HeaderMap};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::ApiError;
use crate::services::SessionInfo;
use crate::AppState;

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Caller address for rate limiting; in-process requests share one bucket
pub fn client_ip(connect_info: Option<ConnectInfo<SocketAddr>>) -> IpAddr {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Logged-in caller; rejects with 401 when the token is missing or unknown
pub struct CurrentUser(pub SessionInfo);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

        state
            .sessions
            .lookup(token)
            .await
            .map(CurrentUser)
            .ok_or_else(|| ApiError::Unauthorized("Session expired, please log in again".to_string()))
    }
}

/// Caller identity if a valid token was sent
pub struct OptionalUser(pub Option<SessionInfo>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = match bearer_token(&parts.headers) {
            Some(token) => state.sessions.lookup(token).await,
            None => None,
        };
        Ok(OptionalUser(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_client_ip_fallback() {
        assert_eq!(client_ip(None), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let addr: SocketAddr = "192.0.2.7:4000".parse().unwrap();
        assert_eq!(client_ip(Some(ConnectInfo(addr))), addr.ip());
    }
}
