use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// Credential record.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String, // argon2 PHC string, never exposed
    pub is_verified: bool,
    pub avatar_url: Option<String>,
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Returns `None` when the email is already taken.
    async fn create(&self, email: &str, hashed_password: &str) -> anyhow::Result<Option<User>>;

    /// Returns `false` when no user has this email.
    async fn mark_verified(&self, email: &str) -> anyhow::Result<bool>;

    async fn set_avatar(&self, user_id: i64, avatar_url: &str) -> anyhow::Result<User>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, is_verified, avatar_url, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn create(&self, email: &str, hashed_password: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, hashed_password)
            VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, hashed_password, is_verified, avatar_url, created_at
            "#,
        )
        .bind(email)
        .bind(hashed_password)
        .fetch_optional(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn mark_verified(&self, email: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"UPDATE users SET is_verified = TRUE WHERE email = $1"#)
            .bind(email)
            .execute(&self.db)
            .await
            .context("mark user verified")?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_avatar(&self, user_id: i64, avatar_url: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET avatar_url = $2
            WHERE id = $1
            RETURNING id, email, hashed_password, is_verified, avatar_url, created_at
            "#,
        )
        .bind(user_id)
        .bind(avatar_url)
        .fetch_one(&self.db)
        .await
        .context("update user avatar")?;
        Ok(user)
    }
}
