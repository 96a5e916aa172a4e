use std::collections::BTreeMap;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// Field name -> messages, in the shape clients get under `errors`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

/// Turns a raw request body into checked input.
pub trait Validate {
    type Output;

    fn validate(self) -> Result<Self::Output, ValidationErrors>;
}

fn label(field: &str) -> String {
    field.replace('_', " ")
}

fn not_a_string(errors: &mut ValidationErrors, field: &str) {
    errors.add(field, format!("The {} must be a string.", label(field)));
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<Value>,
    trim: bool,
) -> Option<String> {
    match value {
        Some(Value::String(s)) => {
            let s = if trim { s.trim().to_string() } else { s };
            if s.is_empty() {
                errors.add(field, format!("The {} field is required.", label(field)));
                return None;
            }
            Some(s)
        }
        None | Some(Value::Null) => {
            errors.add(field, format!("The {} field is required.", label(field)));
            None
        }
        Some(_) => {
            not_a_string(errors, field);
            None
        }
    }
}

/// Trimmed string, or a "required" / "must be a string" error.
pub fn required(errors: &mut ValidationErrors, field: &str, value: Option<Value>) -> Option<String> {
    required_text(errors, field, value, true)
}

/// Like `required` but keeps the value byte for byte (passwords).
pub fn required_verbatim(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<Value>,
) -> Option<String> {
    required_text(errors, field, value, false)
}

/// Optional string field. `null` and absent are both `None`.
pub fn string(errors: &mut ValidationErrors, field: &str, value: Option<Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            not_a_string(errors, field);
            None
        }
    }
}

pub fn max_chars(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) -> bool {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("The {} must not be greater than {} characters.", label(field), max),
        );
        return false;
    }
    true
}

pub fn min_chars(errors: &mut ValidationErrors, field: &str, value: &str, min: usize) -> bool {
    if value.chars().count() < min {
        errors.add(
            field,
            format!("The {} must be at least {} characters.", label(field), min),
        );
        return false;
    }
    true
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn email(errors: &mut ValidationErrors, field: &str, value: &str) -> bool {
    if !is_valid_email(value) {
        errors.add(
            field,
            format!("The {} must be a valid email address.", label(field)),
        );
        return false;
    }
    true
}

pub fn invalid_selection(field: &str) -> ValidationErrors {
    ValidationErrors::single(field, format!("The selected {} is invalid.", label(field)))
}

/// JSON body extractor that runs `Validate` before the handler sees it.
pub struct Valid<T: Validate>(pub T::Output);

#[async_trait]
impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
    T::Output: Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(raw) = Json::<T>::from_request(req, state).await?;
        raw.validate().map(Valid).map_err(AppError::Validation)
    }
}
