use std::sync::Arc;

use crate::{
    articles::repo::ArticleStore,
    auth::{
        extractors::AuthGate, jwt::JwtKeys, repo::UserStore, revocation::RevocationStore,
    },
    config::AppConfig,
    store::Stores,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: Arc<JwtKeys>,
    pub gate: Arc<AuthGate>,
    pub users: Arc<dyn UserStore>,
    pub articles: Arc<dyn ArticleStore>,
    pub revocations: Arc<dyn RevocationStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let stores = Stores::connect(&config).await?;
        Ok(Self::from_parts(config, stores))
    }

    pub fn from_parts(config: Arc<AppConfig>, stores: Stores) -> Self {
        let keys = Arc::new(JwtKeys::new(&config.jwt));
        let gate = Arc::new(AuthGate::new(
            keys.clone(),
            stores.users.clone(),
            stores.revocations.clone(),
        ));
        Self {
            config,
            keys,
            gate,
            users: stores.users,
            articles: stores.articles,
            revocations: stores.revocations,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with(true)
    }

    #[cfg(test)]
    pub fn fake_with(blacklist_enabled: bool) -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            db_max_connections: 1,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                blacklist_enabled,
            },
        });
        Self::from_parts(config, Stores::memory())
    }
}
