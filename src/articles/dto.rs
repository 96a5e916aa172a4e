use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::validation::{self, Validate, ValidationErrors};

/// Body of `POST /article` and `PATCH /article/{id}`.
#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    pub title: Option<Value>,
    pub description: Option<Value>,
    /// Defaults to the caller on create and to the current owner on update.
    pub user_id: Option<Value>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ArticleInput {
    pub title: String,
    pub description: String,
    pub user_id: Option<Uuid>,
}

impl Validate for ArticleRequest {
    type Output = ArticleInput;

    fn validate(self) -> Result<ArticleInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = validation::required(&mut errors, "title", self.title);
        if let Some(title) = &title {
            validation::max_chars(&mut errors, "title", title, 255);
        }
        let description = validation::required(&mut errors, "description", self.description);

        let user_id = validation::string(&mut errors, "user_id", self.user_id);
        let user_id = match user_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match Uuid::parse_str(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("user_id", "The selected user id is invalid.");
                    None
                }
            },
        };

        errors.finish(|| ArticleInput {
            title: title.unwrap_or_default(),
            description: description.unwrap_or_default(),
            user_id,
        })
    }
}

/// `{ "data": ... }` envelope used by the read endpoints.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}
