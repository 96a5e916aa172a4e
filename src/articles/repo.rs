use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    articles::repo_types::{Article, ArticleFields, ArticleRow},
    store::StoreError,
};

/// Article persistence. Every read returns the owner joined in.
/// A `user_id` that matches no user is `StoreError::ForeignKeyViolation`.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Article>, StoreError>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Article>, StoreError>;
    async fn find(&self, id: i64) -> Result<Option<Article>, StoreError>;
    async fn create(&self, fields: ArticleFields) -> Result<Article, StoreError>;
    /// `updated_at` only moves when a field actually changes.
    async fn update(&self, id: i64, fields: ArticleFields) -> Result<Option<Article>, StoreError>;
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

/// `a` is the article source (table or CTE), `u` the joined owner.
macro_rules! joined_select {
    ($from:literal, $tail:literal) => {
        concat!(
            "SELECT a.id, a.title, a.description, a.user_id, a.created_at, a.updated_at, ",
            "u.name AS user_name, u.email AS user_email, u.password_hash AS user_password_hash, ",
            "u.email_verified_at AS user_email_verified_at, ",
            "u.created_at AS user_created_at, u.updated_at AS user_updated_at ",
            "FROM ",
            $from,
            " JOIN users u ON u.id = a.user_id ",
            $tail
        )
    };
}

#[derive(Clone)]
pub struct PgArticleStore {
    db: PgPool,
}

impl PgArticleStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn list(&self) -> Result<Vec<Article>, StoreError> {
        let rows = sqlx::query_as::<_, ArticleRow>(joined_select!("articles a", "ORDER BY a.id"))
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Article>, StoreError> {
        let rows = sqlx::query_as::<_, ArticleRow>(joined_select!(
            "articles a",
            "WHERE a.user_id = $1 ORDER BY a.id"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Article>, StoreError> {
        let row = sqlx::query_as::<_, ArticleRow>(joined_select!("articles a", "WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Article::from))
    }

    async fn create(&self, fields: ArticleFields) -> Result<Article, StoreError> {
        let row = sqlx::query_as::<_, ArticleRow>(concat!(
            "WITH a AS (
                INSERT INTO articles (title, description, user_id)
                VALUES ($1, $2, $3)
                RETURNING id, title, description, user_id, created_at, updated_at
            ) ",
            joined_select!("a", "")
        ))
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn update(&self, id: i64, fields: ArticleFields) -> Result<Option<Article>, StoreError> {
        let row = sqlx::query_as::<_, ArticleRow>(concat!(
            "WITH a AS (
                UPDATE articles
                SET title = $2,
                    description = $3,
                    user_id = $4,
                    updated_at = CASE
                        WHEN (title, description, user_id) IS DISTINCT FROM ($2, $3, $4) THEN now()
                        ELSE updated_at
                    END
                WHERE id = $1
                RETURNING id, title, description, user_id, created_at, updated_at
            ) ",
            joined_select!("a", "")
        ))
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Article::from))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(r#"DELETE FROM articles WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
