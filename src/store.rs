use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    articles::repo::{ArticleStore, PgArticleStore},
    auth::{
        repo::{PgUserStore, UserStore},
        revocation::{PgRevocationStore, RevocationStore},
    },
    config::AppConfig,
    memory::MemoryStore,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("foreign key constraint violated")]
    ForeignKeyViolation,
    #[error("db error")]
    Db(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(dbe) = &e {
            if dbe.is_unique_violation() {
                return StoreError::UniqueViolation;
            }
            if dbe.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation;
            }
        }
        StoreError::Db(e)
    }
}

/// Store handles the rest of the app is wired with.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub articles: Arc<dyn ArticleStore>,
    pub revocations: Arc<dyn RevocationStore>,
}

impl Stores {
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            users: store.clone(),
            articles: store.clone(),
            revocations: store,
        }
    }

    /// Postgres when `DATABASE_URL` is set, memory otherwise.
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let Some(url) = config.database_url.as_deref() else {
            warn!("DATABASE_URL not set; using in-memory stores, data is lost on restart");
            return Ok(Self::memory());
        };

        let db = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(url)
            .await
            .context("connect to database")?;
        info!(max_connections = config.db_max_connections, "connected to postgres");

        Ok(Self {
            users: Arc::new(PgUserStore::new(db.clone())),
            articles: Arc::new(PgArticleStore::new(db.clone())),
            revocations: Arc::new(PgRevocationStore::new(db)),
        })
    }
}
