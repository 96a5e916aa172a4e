use tracing::{info, warn};

use crate::{
    auth::{
        claims::Claims,
        dto::{LoginInput, RegisterInput},
        extractors::CurrentUser,
        jwt::IssuedToken,
        password::{hash_password_blocking, verify_dummy_blocking, verify_password_blocking},
        repo_types::{NewUser, User},
    },
    error::AppError,
    state::AppState,
    store::StoreError,
    validation::ValidationErrors,
};

fn email_taken() -> AppError {
    AppError::Conflict(ValidationErrors::single(
        "email",
        "The email has already been taken.",
    ))
}

pub async fn register(state: &AppState, input: RegisterInput) -> Result<(User, IssuedToken), AppError> {
    if state.users.exists_by_email(&input.email).await? {
        warn!(email = %input.email, "email already registered");
        return Err(email_taken());
    }

    let password_hash = hash_password_blocking(input.password).await?;

    let user = match state
        .users
        .insert(NewUser {
            name: input.name,
            email: input.email,
            password_hash,
        })
        .await
    {
        Ok(u) => u,
        // lost a race with a concurrent registration
        Err(StoreError::UniqueViolation) => return Err(email_taken()),
        Err(e) => return Err(e.into()),
    };

    let issued = state.keys.issue(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((user, issued))
}

pub async fn login(state: &AppState, input: LoginInput) -> Result<(User, IssuedToken), AppError> {
    let user = match state.users.find_by_email(&input.email).await? {
        Some(u) => u,
        None => {
            verify_dummy_blocking(input.password).await?;
            warn!(email = %input.email, "login unknown email");
            return Err(AppError::Unauthenticated);
        }
    };

    if !verify_password_blocking(input.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthenticated);
    }

    let issued = state.keys.issue(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok((user, issued))
}

async fn revoke(state: &AppState, claims: &Claims) -> Result<(), AppError> {
    if state.config.jwt.blacklist_enabled {
        state
            .revocations
            .revoke(claims.jti, claims.expires_at())
            .await?;
    }
    Ok(())
}

/// Without the blacklist this only tells the client to discard its token.
pub async fn logout(state: &AppState, current: &CurrentUser) -> Result<(), AppError> {
    revoke(state, &current.claims).await?;
    info!(user_id = %current.id(), jti = %current.claims.jti, "user logged out");
    Ok(())
}

pub async fn refresh(state: &AppState, current: &CurrentUser) -> Result<IssuedToken, AppError> {
    let issued = state.keys.refresh(&current.claims)?;
    revoke(state, &current.claims).await?;
    info!(user_id = %current.id(), old_jti = %current.claims.jti, jti = %issued.claims.jti, "token refreshed");
    Ok(issued)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{http::StatusCode, response::IntoResponse};
    use uuid::Uuid;

    use super::*;
    use crate::{auth::repo::UserStore, memory::MemoryStore};

    /// Answers "no" to the pre-check, as when a concurrent registration
    /// commits between `exists_by_email` and `insert`.
    struct StaleExists(MemoryStore);

    #[async_trait]
    impl UserStore for StaleExists {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            self.0.find_by_email(email).await
        }
        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            self.0.find_by_id(id).await
        }
        async fn exists_by_email(&self, _email: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
            UserStore::insert(&self.0, user).await
        }
    }

    fn input(name: &str, email: &str) -> RegisterInput {
        RegisterInput {
            name: name.into(),
            email: email.into(),
            password: "PassWord12345".into(),
        }
    }

    #[tokio::test]
    async fn register_race_on_email_is_a_validation_error() {
        let store = MemoryStore::default();
        let first = UserStore::insert(
            &store,
            NewUser {
                name: "First".into(),
                email: "user1@mail.com".into(),
                password_hash: "hash".into(),
            },
        )
        .await
        .unwrap();

        let users: Arc<dyn UserStore> = Arc::new(StaleExists(store));
        let mut state = AppState::fake();
        state.users = users.clone();

        let err = register(&state, input("Second", "user1@mail.com")).await.unwrap_err();
        match &err {
            AppError::Conflict(errors) => assert_eq!(
                errors.get("email").unwrap(),
                ["The email has already been taken.".to_string()]
            ),
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let kept = users.find_by_email("user1@mail.com").await.unwrap().unwrap();
        assert_eq!(kept.id, first.id);
        assert_eq!(kept.name, "First");
        assert_eq!(kept.password_hash, "hash");
    }

    #[tokio::test]
    async fn login_unknown_email_is_unauthenticated() {
        let state = AppState::fake();
        let err = login(
            &state,
            LoginInput {
                email: "ghost@mail.com".into(),
                password: "PassWord12345".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }
}
