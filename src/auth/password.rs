use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("argon2 hash error: {0}")]
    Hash(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
    #[error("password worker failed")]
    Worker(#[from] tokio::task::JoinError),
}

pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            PasswordError::Hash(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on mismatch; errors only when `hash` cannot be parsed.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        PasswordError::MalformedHash(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Runs `hash_password` on the blocking pool.
pub async fn hash_password_blocking(plain: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&plain)).await?
}

/// Runs `verify_password` on the blocking pool.
pub async fn verify_password_blocking(plain: String, hash: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await?
}

static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

/// Burns one Argon2 verification against a throwaway hash, so a login for an
/// unknown email costs as much as one with a wrong password.
pub async fn verify_dummy_blocking(plain: String) -> Result<(), PasswordError> {
    let hash = DUMMY_HASH
        .get_or_try_init(|| hash_password_blocking("no-such-user-password".into()))
        .await?;
    verify_password_blocking(plain, hash.clone()).await?;
    Ok(())
}
