use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    articles::{
        dto::ArticleInput,
        repo_types::{Article, ArticleFields},
    },
    auth::extractors::CurrentUser,
    error::AppError,
    state::AppState,
    store::StoreError,
    validation::invalid_selection,
};

/// Checks that `user_id` names an existing user before it is written.
async fn ensure_user_exists(state: &AppState, user_id: Uuid) -> Result<(), AppError> {
    match state.users.find_by_id(user_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::Validation(invalid_selection("user_id"))),
    }
}

fn map_write_error(e: StoreError) -> AppError {
    match e {
        StoreError::ForeignKeyViolation => AppError::Validation(invalid_selection("user_id")),
        other => other.into(),
    }
}

/// Loads an article the caller may modify.
async fn find_owned(state: &AppState, current: &CurrentUser, id: i64) -> Result<Article, AppError> {
    let article = state.articles.find(id).await?.ok_or(AppError::NotFound)?;
    if article.user_id != current.id() {
        warn!(article_id = id, owner = %article.user_id, user_id = %current.id(), "not the article owner");
        return Err(AppError::Forbidden);
    }
    Ok(article)
}

pub async fn create(
    state: &AppState,
    current: &CurrentUser,
    input: ArticleInput,
) -> Result<Article, AppError> {
    let user_id = input.user_id.unwrap_or_else(|| current.id());
    if user_id != current.id() {
        ensure_user_exists(state, user_id).await?;
    }

    let article = state
        .articles
        .create(ArticleFields {
            title: input.title,
            description: input.description,
            user_id,
        })
        .await
        .map_err(map_write_error)?;
    info!(article_id = article.id, user_id = %article.user_id, "article created");
    Ok(article)
}

pub async fn update(
    state: &AppState,
    current: &CurrentUser,
    id: i64,
    input: ArticleInput,
) -> Result<Article, AppError> {
    let existing = find_owned(state, current, id).await?;

    let user_id = input.user_id.unwrap_or(existing.user_id);
    if user_id != existing.user_id {
        ensure_user_exists(state, user_id).await?;
    }

    let article = state
        .articles
        .update(
            id,
            ArticleFields {
                title: input.title,
                description: input.description,
                user_id,
            },
        )
        .await
        .map_err(map_write_error)?
        .ok_or(AppError::NotFound)?;
    info!(article_id = id, "article updated");
    Ok(article)
}

pub async fn delete(state: &AppState, current: &CurrentUser, id: i64) -> Result<(), AppError> {
    find_owned(state, current, id).await?;
    if !state.articles.delete(id).await? {
        return Err(AppError::NotFound);
    }
    info!(article_id = id, "article deleted");
    Ok(())
}
