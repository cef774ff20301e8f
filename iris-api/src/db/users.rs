//! User account queries

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

/// Row of the `users` table
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub failed_attempts: i64,
    pub lockout_until: Option<DateTime<Utc>>,
    pub otp_secret: Option<String>,
    /// End of the window in which a password-verified login may submit its OTP
    pub otp_expiry: Option<DateTime<Utc>>,
}

impl UserRecord {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
            failed_attempts: row.try_get("failed_attempts")?,
            lockout_until: row.try_get("lockout_until")?,
            otp_secret: row.try_get("otp_secret")?,
            otp_expiry: row.try_get("otp_expiry")?,
        })
    }

    /// Lockout deadline, if one is still in the future
    pub fn active_lockout(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.lockout_until.filter(|until| *until > now)
    }
}

/// Fields of a new account
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub otp_secret: &'a str,
}

const SELECT_USER: &str = r#"
    SELECT id, username, email, password_hash, created_at, failed_attempts,
           lockout_until, otp_secret, otp_expiry
    FROM users
"#;

pub async fn find_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<UserRecord>, sqlx::Error> {
    let sql = format!("{} WHERE username = ?", SELECT_USER);
    sqlx::query(&sql)
        .bind(username)
        .fetch_optional(pool)
        .await?
        .map(|row| UserRecord::from_row(&row))
        .transpose()
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn username_exists(pool: &SqlitePool, username: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Insert a new account, returning its id
pub async fn insert_user(pool: &SqlitePool, user: &NewUser<'_>) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, created_at, otp_secret)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.username)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(Utc::now())
    .bind(user.otp_secret)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Store the failure count and, once the threshold is reached, the lockout deadline
pub async fn record_failed_attempt(
    pool: &SqlitePool,
    user_id: i64,
    failed_attempts: i64,
    lockout_until: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET failed_attempts = ?, lockout_until = ? WHERE id = ?")
        .bind(failed_attempts)
        .bind(lockout_until)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Password accepted: open the OTP window
pub async fn open_otp_window(
    pool: &SqlitePool,
    user_id: i64,
    expiry: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET otp_expiry = ? WHERE id = ?")
        .bind(expiry)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Login completed: close the OTP window and clear failure state
pub async fn complete_login(pool: &SqlitePool, user_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE users
        SET otp_expiry = NULL, failed_attempts = 0, lockout_until = NULL
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    fn new_user<'a>(username: &'a str, email: &'a str) -> NewUser<'a> {
        NewUser {
            username,
            email,
            password_hash: "$argon2id$placeholder",
            otp_secret: "JBSWY3DPEHPK3PXP",
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let pool = pool().await;
        let id = insert_user(&pool, &new_user("testuser", "test@example.com"))
            .await
            .unwrap();

        let user = find_by_username(&pool, "testuser").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.failed_attempts, 0);
        assert!(user.lockout_until.is_none());
        assert_eq!(user.otp_secret.as_deref(), Some("JBSWY3DPEHPK3PXP"));

        assert!(find_by_username(&pool, "nobody").await.unwrap().is_none());
        assert!(email_exists(&pool, "test@example.com").await.unwrap());
        assert!(username_exists(&pool, "testuser").await.unwrap());
        assert!(!username_exists(&pool, "other").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_violates_unique() {
        let pool = pool().await;
        insert_user(&pool, &new_user("dup", "a@example.com")).await.unwrap();
        assert!(insert_user(&pool, &new_user("dup", "b@example.com")).await.is_err());
    }

    #[tokio::test]
    async fn test_failure_state_is_cleared_by_complete_login() {
        let pool = pool().await;
        let id = insert_user(&pool, &new_user("u", "u@example.com")).await.unwrap();
        let until = Utc::now() + Duration::minutes(15);

        record_failed_attempt(&pool, id, 5, Some(until)).await.unwrap();
        open_otp_window(&pool, id, Utc::now()).await.unwrap();
        let user = find_by_username(&pool, "u").await.unwrap().unwrap();
        assert_eq!(user.failed_attempts, 5);
        assert!(user.active_lockout(Utc::now()).is_some());
        assert!(user.otp_expiry.is_some());

        complete_login(&pool, id).await.unwrap();
        let user = find_by_username(&pool, "u").await.unwrap().unwrap();
        assert_eq!(user.failed_attempts, 0);
        assert!(user.lockout_until.is_none());
        assert!(user.otp_expiry.is_none());
    }

    #[test]
    fn test_past_lockout_is_not_active() {
        let now = Utc::now();
        let user = UserRecord {
            id: 1,
            username: "u".to_string(),
            email: "u@example.com".to_string(),
            password_hash: String::new(),
            created_at: now,
            failed_attempts: 5,
            lockout_until: Some(now - Duration::seconds(1)),
            otp_secret: None,
            otp_expiry: None,
        };
        assert!(user.active_lockout(now).is_none());
    }
}
