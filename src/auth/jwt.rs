use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::claims::Claims, config::JwtConfig};

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("token is malformed")]
    MalformedToken,
    #[error("token has expired")]
    ExpiredToken,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token issuer or audience mismatch")]
    InvalidClaims,
    #[error("token has been revoked")]
    RevokedToken,
    #[error("token subject no longer exists")]
    UnknownSubject,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
            ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::ImmatureSignature => AuthError::InvalidClaims,
            _ => AuthError::MalformedToken,
        }
    }
}

/// A freshly signed token plus the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Signing and verification keys with config data. Built once at startup.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: TimeDuration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: TimeDuration::minutes(cfg.ttl_minutes),
        }
    }

    fn sign(&self, claims: Claims) -> Result<IssuedToken, AuthError> {
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(AuthError::Signing)?;
        debug!(user_id = %claims.sub, jti = %claims.jti, "jwt signed");
        Ok(IssuedToken { token, claims })
    }

    pub fn issue(&self, user_id: Uuid) -> Result<IssuedToken, AuthError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + self.ttl;
        self.sign(Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            jti: Uuid::new_v4(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        })
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        // Shape and expiry first: an expired token reports expiry whatever its signature.
        let mut unchecked = Validation::new(ALGORITHM);
        unchecked.insecure_disable_signature_validation();
        unchecked.validate_aud = false;
        unchecked.leeway = 0;
        decode::<Claims>(token, &self.decoding, &unchecked)?;

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, jti = %data.claims.jti, "jwt verified");
        Ok(data.claims)
    }

    /// New token for the subject of already validated `claims`.
    /// Revoking the old token is up to the caller.
    pub fn refresh(&self, claims: &Claims) -> Result<IssuedToken, AuthError> {
        self.issue(claims.sub)
    }

    #[cfg(test)]
    pub(crate) fn sign_claims(&self, claims: Claims) -> String {
        self.sign(claims).expect("sign claims").token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 60,
            blacklist_enabled: true,
        })
    }

    fn now() -> usize {
        OffsetDateTime::now_utc().unix_timestamp() as usize
    }

    fn expired_claims(keys: &JwtKeys) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            iat: now() - 7200,
            exp: now() - 120,
            jti: Uuid::new_v4(),
            iss: keys.issuer.clone(),
            aud: keys.audience.clone(),
        }
    }

    fn tamper_signature(token: &str) -> String {
        let (message, signature) = token.rsplit_once('.').unwrap();
        let mut sig: Vec<char> = signature.chars().collect();
        sig[0] = if sig[0] == 'A' { 'B' } else { 'A' };
        format!("{}.{}", message, sig.into_iter().collect::<String>())
    }

    #[test]
    fn issue_and_validate() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let user_id = Uuid::new_v4();
        let issued = keys.issue(user_id).expect("issue");
        let claims = keys.validate(&issued.token).expect("validate");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims, issued.claims);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn each_token_gets_its_own_id() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let user_id = Uuid::new_v4();
        let a = keys.issue(user_id).unwrap();
        let b = keys.issue(user_id).unwrap();
        assert_ne!(a.claims.jti, b.claims.jti);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.sign_claims(expired_claims(&keys));
        assert!(matches!(keys.validate(&token), Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn expiry_wins_over_bad_signature() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = tamper_signature(&keys.sign_claims(expired_claims(&keys)));
        assert!(matches!(keys.validate(&token), Err(AuthError::ExpiredToken)));

        let other = make_keys("other-secret", "iss", "aud");
        let foreign = other.sign_claims(expired_claims(&other));
        assert!(matches!(keys.validate(&foreign), Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn altered_signature_is_rejected() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = tamper_signature(&keys.issue(Uuid::new_v4()).unwrap().token);
        assert!(matches!(keys.validate(&token), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn rotated_key_is_rejected() {
        let old = make_keys("old-secret", "iss", "aud");
        let new = make_keys("new-secret", "iss", "aud");
        let token = old.issue(Uuid::new_v4()).unwrap().token;
        assert!(matches!(new.validate(&token), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert!(matches!(keys.validate("not-a-token"), Err(AuthError::MalformedToken)));
        assert!(matches!(keys.validate("a.b.c"), Err(AuthError::MalformedToken)));
        assert!(matches!(keys.validate(""), Err(AuthError::MalformedToken)));
    }

    #[test]
    fn wrong_issuer_or_audience_is_rejected() {
        let good = make_keys("same-secret", "good-iss", "good-aud");
        let bad = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good.issue(Uuid::new_v4()).unwrap().token;
        assert!(matches!(bad.validate(&token), Err(AuthError::InvalidClaims)));
    }

    #[test]
    fn refresh_issues_new_token_for_same_subject() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let user_id = Uuid::new_v4();
        let first = keys.issue(user_id).unwrap();
        let claims = keys.validate(&first.token).unwrap();
        let second = keys.refresh(&claims).expect("refresh");
        assert_eq!(second.claims.sub, user_id);
        assert_ne!(second.claims.jti, first.claims.jti);
        // stateless: the old token still validates on its own
        assert!(keys.validate(&first.token).is_ok());
    }

    #[test]
    fn refresh_starts_a_fresh_window() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let stale = expired_claims(&keys);
        let fresh = keys.refresh(&stale).unwrap();
        assert_eq!(fresh.claims.sub, stale.sub);
        assert!(fresh.claims.exp > now());
        assert!(keys.validate(&fresh.token).is_ok());
    }
}
