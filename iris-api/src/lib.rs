//! iris-api library interface
//!
//! Exposes the router and state so integration tests can drive the server
//! in-process.

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use iris_common::config::IrisConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::services::{InferenceBackend, RateLimiters, SessionRegistry};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Resolved configuration
    pub config: Arc<IrisConfig>,
    /// Bearer tokens of logged-in users
    pub sessions: SessionRegistry,
    /// Per-client quotas for register and login
    pub limiters: RateLimiters,
    /// Classifier relay (remote endpoints or built-in mock)
    pub inference: Arc<dyn InferenceBackend>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: IrisConfig, inference: Arc<dyn InferenceBackend>) -> Self {
        let sessions = SessionRegistry::new(chrono::Duration::hours(config.auth.session_ttl_hours));
        let limiters = RateLimiters::new(&config.rate_limits);
        Self {
            db,
            config: Arc::new(config),
            sessions,
            limiters,
            inference,
            startup_time: Utc::now(),
        }
    }
}

/// Open the database and build the state described by `config`
pub async fn build_state(config: IrisConfig) -> anyhow::Result<AppState> {
    let db = db::init_database_pool(&config.database.path).await?;
    let inference = services::inference::from_config(&config.inference)?;
    Ok(AppState::new(db, config, inference))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    let body_limit = state.config.server.max_upload_mb * 1024 * 1024;

    let api = Router::new()
        .merge(api::auth_routes())
        .merge(api::analyze_routes())
        .merge(api::history_routes())
        .merge(api::article_routes())
        .merge(api::health_routes());

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
