use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    auth::repo_types::User,
    validation::{self, Validate, ValidationErrors},
};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<Value>,
    pub email: Option<Value>,
    pub password: Option<Value>,
}

#[derive(Debug)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    type Output = RegisterInput;

    fn validate(self) -> Result<RegisterInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = validation::required(&mut errors, "name", self.name);
        if let Some(name) = &name {
            validation::max_chars(&mut errors, "name", name, 32);
        }

        let email = validation::required(&mut errors, "email", self.email).map(|e| e.to_lowercase());
        if let Some(email) = &email {
            if validation::email(&mut errors, "email", email) {
                validation::max_chars(&mut errors, "email", email, 255);
            }
        }

        let password = validation::required_verbatim(&mut errors, "password", self.password);
        if let Some(password) = &password {
            validation::min_chars(&mut errors, "password", password, 6);
        }

        errors.finish(|| RegisterInput {
            name: name.unwrap_or_default(),
            email: email.unwrap_or_default(),
            password: password.unwrap_or_default(),
        })
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<Value>,
    pub password: Option<Value>,
}

#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    type Output = LoginInput;

    fn validate(self) -> Result<LoginInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let email = validation::required(&mut errors, "email", self.email).map(|e| e.to_lowercase());
        if let Some(email) = &email {
            validation::email(&mut errors, "email", email);
        }
        let password = validation::required_verbatim(&mut errors, "password", self.password);

        errors.finish(|| LoginInput {
            email: email.unwrap_or_default(),
            password: password.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct Authorisation {
    pub token: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl Authorisation {
    pub fn bearer(token: String) -> Self {
        Self {
            token,
            kind: "bearer",
        }
    }
}

/// Response returned after login, register or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    pub user: User,
    pub authorisation: Authorisation,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(name: Option<&str>, email: Option<&str>, password: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            name: name.map(Into::into),
            email: email.map(Into::into),
            password: password.map(Into::into),
        }
    }

    #[test]
    fn register_accepts_valid_input_and_normalizes_email() {
        let input = register(Some("Jhon Doe"), Some(" User1@Mail.com "), Some("PassWord12345"))
            .validate()
            .expect("valid");
        assert_eq!(input.name, "Jhon Doe");
        assert_eq!(input.email, "user1@mail.com");
        assert_eq!(input.password, "PassWord12345");
    }

    #[test]
    fn register_reports_every_field() {
        let errors = register(None, Some("nope"), Some("123")).validate().unwrap_err();
        assert_eq!(errors.get("name").unwrap(), ["The name field is required.".to_string()]);
        assert_eq!(
            errors.get("email").unwrap(),
            ["The email must be a valid email address.".to_string()]
        );
        assert_eq!(
            errors.get("password").unwrap(),
            ["The password must be at least 6 characters.".to_string()]
        );
    }

    #[test]
    fn register_bounds_name_and_email() {
        let long_email = format!("{}@mail.com", "a".repeat(250));
        let errors = register(Some(&"n".repeat(33)), Some(&long_email), Some("secret"))
            .validate()
            .unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_none());
    }

    #[test]
    fn login_requires_both_fields() {
        let errors = LoginRequest { email: None, password: Some("".into()) }
            .validate()
            .unwrap_err();
        assert!(errors.get("email").is_some());
        assert_eq!(
            errors.get("password").unwrap(),
            ["The password field is required.".to_string()]
        );
    }

    #[test]
    fn non_string_fields_are_reported_per_field() {
        let raw = serde_json::json!({ "name": 5, "email": ["a@b.co"], "password": 123456 });
        let errors = serde_json::from_value::<RegisterRequest>(raw)
            .unwrap()
            .validate()
            .unwrap_err();
        assert_eq!(errors.get("name").unwrap(), ["The name must be a string.".to_string()]);
        assert_eq!(errors.get("email").unwrap(), ["The email must be a string.".to_string()]);
        assert_eq!(
            errors.get("password").unwrap(),
            ["The password must be a string.".to_string()]
        );
    }

    #[test]
    fn authorisation_serializes_type() {
        let json = serde_json::to_value(Authorisation::bearer("t".into())).unwrap();
        assert_eq!(json, serde_json::json!({ "token": "t", "type": "bearer" }));
    }
}
