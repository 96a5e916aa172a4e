use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    auth::{
        claims::Claims,
        jwt::{AuthError, JwtKeys},
        repo::UserStore,
        repo_types::User,
        revocation::RevocationStore,
    },
    error::AppError,
};

/// The authenticated caller, bound to the request by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub claims: Claims,
}

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

/// Resolves a request's bearer token to a `CurrentUser`.
pub struct AuthGate {
    keys: Arc<JwtKeys>,
    users: Arc<dyn UserStore>,
    revocations: Arc<dyn RevocationStore>,
}

impl AuthGate {
    pub fn new(
        keys: Arc<JwtKeys>,
        users: Arc<dyn UserStore>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        Self {
            keys,
            users,
            revocations,
        }
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<CurrentUser, AppError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;

        let claims = match self.keys.validate(token) {
            Ok(c) => c,
            Err(e) => {
                warn!(reason = %e, "bearer token rejected");
                return Err(e.into());
            }
        };

        if self.revocations.is_revoked(claims.jti).await? {
            warn!(jti = %claims.jti, "revoked token presented");
            return Err(AuthError::RevokedToken.into());
        }

        let user = match self.users.find_by_id(claims.sub).await? {
            Some(u) => u,
            None => {
                warn!(user_id = %claims.sub, "token subject not found");
                return Err(AuthError::UnknownSubject.into());
            }
        };

        debug!(user_id = %user.id, "request authenticated");
        Ok(CurrentUser { user, claims })
    }
}

/// `Authorization: Bearer <token>`, scheme case-insensitive. Empty counts as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Middleware for protected routes: the handler only runs for an authenticated request.
pub async fn require_auth(
    State(gate): State<Arc<AuthGate>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current = gate.authenticate(req.headers()).await?;
    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::repo_types::NewUser, config::JwtConfig, memory::MemoryStore,
    };
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    async fn gate_with_user() -> (AuthGate, Arc<JwtKeys>, Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::default());
        let keys = Arc::new(JwtKeys::new(&JwtConfig {
            secret: "gate-secret".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes: 5,
            blacklist_enabled: true,
        }));
        let user = store
            .insert(NewUser {
                name: "Jhon Doe".into(),
                email: "user1@mail.com".into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap();
        let gate = AuthGate::new(keys.clone(), store.clone(), store.clone());
        (gate, keys, store, user)
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn valid_token_resolves_user() {
        let (gate, keys, _, user) = gate_with_user().await;
        let token = keys.issue(user.id).unwrap().token;
        let current = gate
            .authenticate(&headers(&format!("Bearer {token}")))
            .await
            .expect("authenticated");
        assert_eq!(current.id(), user.id);
        assert_eq!(current.user.email, "user1@mail.com");
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let (gate, ..) = gate_with_user().await;
        let err = gate.authenticate(&HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let (gate, keys, store, user) = gate_with_user().await;
        let issued = keys.issue(user.id).unwrap();
        store
            .revoke(issued.claims.jti, issued.claims.expires_at())
            .await
            .unwrap();
        let err = gate
            .authenticate(&headers(&format!("Bearer {}", issued.token)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[tokio::test]
    async fn unknown_subject_is_rejected() {
        let (gate, keys, ..) = gate_with_user().await;
        let token = keys.issue(Uuid::new_v4()).unwrap().token;
        let err = gate
            .authenticate(&headers(&format!("Bearer {token}")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }
}
