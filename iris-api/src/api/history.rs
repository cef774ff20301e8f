//! Analysis history of the logged-in user

use axum::{extract::State, routing::get, Json, Router};
use iris_common::api::HistoryEntry;

use super::CurrentUser;
use crate::db::contents;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/user/history
pub async fn user_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let entries = contents::list_for_user(&state.db, user.user_id).await?;
    tracing::debug!(username = %user.username, count = entries.len(), "History listed");
    Ok(Json(entries))
}

pub fn history_routes() -> Router<AppState> {
    Router::new().route("/user/history", get(user_history))
}
