use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::StoreError;

/// Token ids revoked before their natural expiry (logout, refresh).
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Idempotent.
    async fn revoke(&self, jti: Uuid, expires_at: OffsetDateTime) -> Result<(), StoreError>;
    async fn is_revoked(&self, jti: Uuid) -> Result<bool, StoreError>;
    /// Drops entries whose token has expired anyway. Returns how many went.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct PgRevocationStore {
    db: PgPool,
}

impl PgRevocationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn revoke(&self, jti: Uuid, expires_at: OffsetDateTime) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, StoreError> {
        let revoked: bool =
            sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE jti = $1)"#)
                .bind(jti)
                .fetch_one(&self.db)
                .await?;
        Ok(revoked)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query(r#"DELETE FROM revoked_tokens WHERE expires_at < now()"#)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}
