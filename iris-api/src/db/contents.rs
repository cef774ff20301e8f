//! Analysis history

use chrono::{DateTime, Utc};
use iris_common::analysis::WireAnalysis;
use iris_common::api::HistoryEntry;
use iris_common::{ContentType, Verdict};
use sqlx::{Row, SqlitePool};

/// One completed analysis
pub struct NewContent<'a> {
    /// Uploader, `None` for guests
    pub user_id: Option<i64>,
    pub file_name: &'a str,
    pub file_size: i64,
    pub content_type: ContentType,
    pub model: &'a str,
    pub verdict: Verdict,
    pub analysis: &'a WireAnalysis,
}

pub async fn insert_content(pool: &SqlitePool, content: &NewContent<'_>) -> Result<i64, sqlx::Error> {
    let analysis = serde_json::to_string(content.analysis)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    let result = sqlx::query(
        r#"
        INSERT INTO contents (
            user_id, file_name, file_size, content_type, model, verdict, analysis, uploaded_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(content.user_id)
    .bind(content.file_name)
    .bind(content.file_size)
    .bind(content.content_type.as_str())
    .bind(content.model)
    .bind(content.verdict.as_str())
    .bind(&analysis)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// A user's analyses, newest first
pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<HistoryEntry>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, file_name, file_size, content_type, model, verdict, analysis, uploaded_at
        FROM contents
        WHERE user_id = ?
        ORDER BY id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let content_type: String = row.try_get("content_type")?;
        let verdict: String = row.try_get("verdict")?;
        let analysis: String = row.try_get("analysis")?;
        let uploaded_at: DateTime<Utc> = row.try_get("uploaded_at")?;

        entries.push(HistoryEntry {
            id: row.try_get("id")?,
            file_name: row.try_get("file_name")?,
            file_size: row.try_get("file_size")?,
            content_type: content_type
                .parse()
                .map_err(|e: iris_common::Error| sqlx::Error::Decode(Box::new(e)))?,
            model: row.try_get("model")?,
            verdict: Verdict::parse(&verdict),
            analysis: serde_json::from_str(&analysis)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            uploaded_at,
        });
    }

    Ok(entries)
}
