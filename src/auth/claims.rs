use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// JWT payload used for authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // user ID
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub jti: Uuid,   // token ID, key for revocation
    pub iss: String, // issuer
    pub aud: String, // audience
}

impl Claims {
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.exp as i64).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}
