use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    /// Revoke tokens on logout/refresh. When off, a logged-out or refreshed
    /// token stays valid until its own `exp`.
    pub blacklist_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` selects the in-process memory backend.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let db_max_connections = env_parse("DB_MAX_CONNECTIONS").unwrap_or(10);
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "articles".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "articles-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            blacklist_enabled: env_parse("JWT_BLACKLIST_ENABLED").unwrap_or(true),
        };
        anyhow::ensure!(!jwt.secret.is_empty(), "JWT_SECRET must not be empty");
        anyhow::ensure!(jwt.ttl_minutes > 0, "JWT_TTL_MINUTES must be positive");
        Ok(Self {
            database_url,
            db_max_connections,
            jwt,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
