use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, Authorisation, LoginRequest, RegisterRequest, StatusResponse},
        extractors::CurrentUser,
        services,
    },
    error::AppError,
    state::AppState,
    validation::Valid,
};

/// Routes that hand out tokens; exempt from the auth gate.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
}

/// Routes that need a bearer token.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
}

#[instrument(skip(state, input))]
pub async fn register(
    State(state): State<AppState>,
    Valid(input): Valid<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (user, issued) = services::register(&state, input).await?;
    Ok(Json(AuthResponse {
        status: None,
        user,
        authorisation: Authorisation::bearer(issued.token),
    }))
}

#[instrument(skip(state, input))]
pub async fn login(
    State(state): State<AppState>,
    Valid(input): Valid<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (user, issued) = services::login(&state, input).await?;
    Ok(Json(AuthResponse {
        status: None,
        user,
        authorisation: Authorisation::bearer(issued.token),
    }))
}

#[instrument(skip(state, current), fields(user_id = %current.id()))]
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<StatusResponse>, AppError> {
    services::logout(&state, &current).await?;
    Ok(Json(StatusResponse {
        status: "success",
        message: "Successfully logged out",
    }))
}

#[instrument(skip(state, current), fields(user_id = %current.id()))]
pub async fn refresh(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<AuthResponse>, AppError> {
    let issued = services::refresh(&state, &current).await?;
    Ok(Json(AuthResponse {
        status: Some("success"),
        user: current.user,
        authorisation: Authorisation::bearer(issued.token),
    }))
}
