use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    articles::{
        dto::{ArticleRequest, DataResponse},
        repo_types::Article,
        services,
    },
    auth::extractors::CurrentUser,
    error::AppError,
    state::AppState,
    validation::Valid,
};

/// Ids that do not parse name no article, so they are plain 404s.
fn article_id(raw: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/article", get(list_articles).post(create_article))
        .route(
            "/article/:id",
            get(get_article)
                .patch(update_article)
                .put(update_article)
                .delete(delete_article),
        )
        .route("/article/user/:user_id", get(list_user_articles))
}

#[instrument(skip(state))]
pub async fn list_articles(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<Article>>>, AppError> {
    let data = state.articles.list().await?;
    Ok(Json(DataResponse { data }))
}

#[instrument(skip(state))]
pub async fn list_user_articles(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DataResponse<Vec<Article>>>, AppError> {
    let data = match Uuid::parse_str(&user_id) {
        Ok(user_id) => state.articles.list_by_user(user_id).await?,
        Err(_) => Vec::new(),
    };
    Ok(Json(DataResponse { data }))
}

#[instrument(skip(state))]
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Article>>, AppError> {
    let data = state.articles.find(article_id(&id)?).await?.ok_or(AppError::NotFound)?;
    Ok(Json(DataResponse { data }))
}

#[instrument(skip(state, current, input), fields(user_id = %current.id()))]
pub async fn create_article(
    State(state): State<AppState>,
    current: CurrentUser,
    Valid(input): Valid<ArticleRequest>,
) -> Result<(StatusCode, Json<Article>), AppError> {
    let article = services::create(&state, &current, input).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

#[instrument(skip(state, current, input), fields(user_id = %current.id()))]
pub async fn update_article(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Valid(input): Valid<ArticleRequest>,
) -> Result<Json<Article>, AppError> {
    let article = services::update(&state, &current, article_id(&id)?, input).await?;
    Ok(Json(article))
}

#[instrument(skip(state, current), fields(user_id = %current.id()))]
pub async fn delete_article(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    services::delete(&state, &current, article_id(&id)?).await?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_id_parses_integers_only() {
        assert_eq!(article_id("42").unwrap(), 42);
        assert!(matches!(article_id("abc"), Err(AppError::NotFound)));
        assert!(matches!(article_id("99999999999999999999"), Err(AppError::NotFound)));
        assert!(matches!(article_id(""), Err(AppError::NotFound)));
    }
}
