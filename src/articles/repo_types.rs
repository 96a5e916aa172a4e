use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;

/// Article joined with its owner, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub user: User,
}

/// Writable fields, used for both insert and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleFields {
    pub title: String,
    pub description: String,
    pub user_id: Uuid,
}

/// Flat row of `articles JOIN users`.
#[derive(Debug, FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub user_name: String,
    pub user_email: String,
    pub user_password_hash: String,
    pub user_email_verified_at: Option<OffsetDateTime>,
    pub user_created_at: OffsetDateTime,
    pub user_updated_at: OffsetDateTime,
}

impl From<ArticleRow> for Article {
    fn from(r: ArticleRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            user_id: r.user_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
            user: User {
                id: r.user_id,
                name: r.user_name,
                email: r.user_email,
                password_hash: r.user_password_hash,
                email_verified_at: r.user_email_verified_at,
                created_at: r.user_created_at,
                updated_at: r.user_updated_at,
            },
        }
    }
}
