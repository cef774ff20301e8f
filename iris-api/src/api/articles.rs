//! Read-only article collection

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use iris_common::api::{ArticleDetail, ArticleSummary};

use crate::db::articles;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/articles
pub async fn list_articles(State(state): State<AppState>) -> ApiResult<Json<Vec<ArticleSummary>>> {
    Ok(Json(articles::list_articles(&state.db).await?))
}

/// GET /api/articles/:slug
pub async fn get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<ArticleDetail>> {
    articles::find_by_slug(&state.db, &slug)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Article not found".to_string()))
}

pub fn article_routes() -> Router<AppState> {
    Router::new()
        .route("/articles", get(list_articles))
        .route("/articles/:slug", get(get_article))
}
