//! Article collection

use iris_common::api::{ArticleDetail, ArticleSummary};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

/// Article to insert
pub struct NewArticle<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub author: &'a str,
    pub date: &'a str,
    pub excerpt: &'a str,
    pub content: &'a str,
}

/// Articles shipped with a fresh database
const SEED_ARTICLES: &[NewArticle<'static>] = &[
    NewArticle {
        slug: "what-is-a-deepfake",
        title: "What Is a Deepfake?",
        author: "Iris Team",
        date: "2024-03-04",
        excerpt: "Deepfakes are images, audio or video generated or altered by machine learning \
                  to show things that never happened.",
        content: "Deepfakes are synthetic media produced by neural networks trained to imitate \
                  a real person's face or voice. Early examples needed hours of footage and \
                  a powerful GPU; today a single photo and a consumer laptop are enough for a \
                  convincing face swap.\n\nThe same techniques power legitimate uses such as \
                  film dubbing and accessibility tools, which is why detection focuses on the \
                  artifacts generation leaves behind rather than on the technique itself.",
    },
    NewArticle {
        slug: "spotting-manipulated-images",
        title: "Spotting Manipulated Images",
        author: "Iris Team",
        date: "2024-04-15",
        excerpt: "Lighting, edges and skin texture give away most face swaps. Here is what to \
                  look for before trusting a picture.",
        content: "Look first at the light: shadows on a pasted face often fall in a different \
                  direction from those in the rest of the scene. Then look at the edges, \
                  especially the hairline, ears and jaw, where blending leaves soft or warped \
                  outlines.\n\nSkin that is smoother than everything around it, mismatched \
                  earrings and teeth that merge into a single block are further clues. None \
                  of them is proof on its own, which is why a detector reports a confidence \
                  rather than a yes or no.",
    },
    NewArticle {
        slug: "voice-cloning-scams",
        title: "Voice Cloning Scams and How to Avoid Them",
        author: "Iris Team",
        date: "2024-06-02",
        excerpt: "A few seconds of recorded speech can be enough to clone a voice. Agree on a \
                  family code word before you need one.",
        content: "Voice cloning models can reproduce a speaker from a short sample taken from \
                  a video or voicemail. Scammers use them to fake urgent calls from relatives \
                  or managers asking for money.\n\nListen for flat intonation, missing breaths \
                  and odd pauses, and always call back on a number you already know. A shared \
                  code word defeats even a perfect clone.",
    },
];

fn summary_from_row(row: &SqliteRow) -> Result<ArticleSummary, sqlx::Error> {
    Ok(ArticleSummary {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        date: row.try_get("date")?,
        excerpt: row.try_get("excerpt")?,
        slug: row.try_get("slug")?,
    })
}

pub async fn insert_article(pool: &SqlitePool, article: &NewArticle<'_>) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO articles (slug, title, author, date, excerpt, content)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(article.slug)
    .bind(article.title)
    .bind(article.author)
    .bind(article.date)
    .bind(article.excerpt)
    .bind(article.content)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Insert the built-in articles when the table is empty
pub async fn seed_if_empty(pool: &SqlitePool) -> Result<usize, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(0);
    }

    for article in SEED_ARTICLES {
        insert_article(pool, article).await?;
    }
    tracing::info!("Seeded {} articles", SEED_ARTICLES.len());
    Ok(SEED_ARTICLES.len())
}

/// Summaries, newest first
pub async fn list_articles(pool: &SqlitePool) -> Result<Vec<ArticleSummary>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, title, author, date, excerpt, slug FROM articles ORDER BY date DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(summary_from_row).collect()
}

pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<ArticleDetail>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, title, author, date, excerpt, slug, content FROM articles WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(ArticleDetail {
            summary: summary_from_row(&row)?,
            content: row.try_get("content")?,
        })),
        None => Ok(None),
    }
}
