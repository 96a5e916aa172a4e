use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    articles::{
        repo::ArticleStore,
        repo_types::{Article, ArticleFields},
    },
    auth::{
        repo::UserStore,
        repo_types::{NewUser, User},
        revocation::RevocationStore,
    },
    store::StoreError,
};

#[derive(Debug, Clone)]
struct ArticleRecord {
    id: i64,
    fields: ArticleFields,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    emails: HashMap<String, Uuid>,
    articles: BTreeMap<i64, ArticleRecord>,
    next_article_id: i64,
    revoked: HashMap<Uuid, OffsetDateTime>,
}

impl Tables {
    fn join(&self, record: &ArticleRecord) -> Result<Article, StoreError> {
        let user = self
            .users
            .get(&record.fields.user_id)
            .cloned()
            .ok_or(StoreError::ForeignKeyViolation)?;
        Ok(Article {
            id: record.id,
            title: record.fields.title.clone(),
            description: record.fields.description.clone(),
            user_id: record.fields.user_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            user,
        })
    }

    fn join_all<'a>(
        &self,
        records: impl Iterator<Item = &'a ArticleRecord>,
    ) -> Result<Vec<Article>, StoreError> {
        records.map(|r| self.join(r)).collect()
    }
}

/// In-process backend with the same constraints as the Postgres schema:
/// unique emails, article owners must exist.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.emails.get(email).and_then(|id| t.users.get(id)).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.emails.contains_key(email))
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut t = self.tables.write().await;
        if t.emails.contains_key(&user.email) {
            return Err(StoreError::UniqueViolation);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            email_verified_at: None,
            created_at: now,
            updated_at: now,
        };
        t.emails.insert(user.email.clone(), user.id);
        t.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Article>, StoreError> {
        let t = self.tables.read().await;
        t.join_all(t.articles.values())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Article>, StoreError> {
        let t = self.tables.read().await;
        t.join_all(t.articles.values().filter(|r| r.fields.user_id == user_id))
    }

    async fn find(&self, id: i64) -> Result<Option<Article>, StoreError> {
        let t = self.tables.read().await;
        t.articles.get(&id).map(|r| t.join(r)).transpose()
    }

    async fn create(&self, fields: ArticleFields) -> Result<Article, StoreError> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&fields.user_id) {
            return Err(StoreError::ForeignKeyViolation);
        }
        t.next_article_id += 1;
        let now = OffsetDateTime::now_utc();
        let record = ArticleRecord {
            id: t.next_article_id,
            fields,
            created_at: now,
            updated_at: now,
        };
        let article = t.join(&record)?;
        t.articles.insert(record.id, record);
        Ok(article)
    }

    async fn update(&self, id: i64, fields: ArticleFields) -> Result<Option<Article>, StoreError> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&fields.user_id) {
            return Err(StoreError::ForeignKeyViolation);
        }
        let Some(record) = t.articles.get_mut(&id) else {
            return Ok(None);
        };
        if record.fields != fields {
            record.fields = fields;
            record.updated_at = OffsetDateTime::now_utc();
        }
        let record = record.clone();
        t.join(&record).map(Some)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.articles.remove(&id).is_some())
    }
}

#[async_trait]
impl RevocationStore for MemoryStore {
    async fn revoke(&self, jti: Uuid, expires_at: OffsetDateTime) -> Result<(), StoreError> {
        self.tables.write().await.revoked.entry(jti).or_insert(expires_at);
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.revoked.contains_key(&jti))
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = OffsetDateTime::now_utc();
        let mut t = self.tables.write().await;
        let before = t.revoked.len();
        t.revoked.retain(|_, expires_at| *expires_at >= now);
        Ok((before - t.revoked.len()) as u64)
    }
}
