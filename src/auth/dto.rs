use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    auth::{repo_types::User, services::normalize_email},
    validation::{is_valid_email, required_string, string_value, FieldErrors},
};

pub const EMAIL_TAKEN: &str = "The email has already been taken.";
const MAX_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 8;

/// Request body for user registration. Fields stay raw JSON so a wrong type is
/// reported per field instead of failing the whole body.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<Value>,
    pub email: Option<Value>,
    pub password: Option<Value>,
    pub password_confirmation: Option<Value>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<Value>,
    pub password: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub email: String,
    pub password: String,
}

/// Outcome of the local register rules, before the email uniqueness lookup.
#[derive(Debug)]
pub struct RegisterCheck {
    /// Normalised email, set whenever the email itself passed its rules.
    pub email: Option<String>,
    errors: FieldErrors,
    registration: Option<Registration>,
}

impl RegisterCheck {
    pub fn reject_email_taken(&mut self) {
        self.errors.add("email", EMAIL_TAKEN);
        self.registration = None;
    }

    pub fn finish(self) -> Result<Registration, FieldErrors> {
        match self.registration {
            Some(registration) if self.errors.is_empty() => Ok(registration),
            _ => Err(self.errors),
        }
    }
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn text_rule<'a>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&'a Value>,
    max: usize,
) -> Option<&'a str> {
    let text = string_value(errors, field, value)?;
    required_string(errors, field, text, max)
}

fn email_rule(errors: &mut FieldErrors, value: Option<&Value>, max: usize) -> Option<String> {
    let email = text_rule(errors, "email", value, max)?;
    if !is_valid_email(email) {
        errors.add("email", "The email field must be a valid email address.");
        return None;
    }
    Some(normalize_email(email))
}

fn password_rule(errors: &mut FieldErrors, value: Option<&Value>) -> Option<String> {
    // passwords are taken verbatim, surrounding whitespace included
    match string_value(errors, "password", value)?.filter(|p| !p.is_empty()) {
        None => {
            errors.add("password", "The password field is required.");
            None
        }
        Some(p) => Some(p.to_string()),
    }
}

impl RegisterRequest {
    pub fn check(&self) -> RegisterCheck {
        let mut errors = FieldErrors::new();
        let name = text_rule(&mut errors, "name", self.name.as_ref(), MAX_LEN);
        let email = email_rule(&mut errors, self.email.as_ref(), MAX_LEN);
        let confirmation = self.password_confirmation.as_ref().and_then(Value::as_str);
        let password = password_rule(&mut errors, self.password.as_ref()).filter(|p| {
            if p.chars().count() < MIN_PASSWORD_LEN {
                errors.add(
                    "password",
                    format!("The password field must be at least {MIN_PASSWORD_LEN} characters."),
                );
                return false;
            }
            if confirmation != Some(p.as_str()) {
                errors.add("password", "The password field confirmation does not match.");
                return false;
            }
            true
        });

        let registration = match (name, email.clone(), password) {
            (Some(name), Some(email), Some(password)) if errors.is_empty() => Some(Registration {
                name: name.to_string(),
                email,
                password,
            }),
            _ => None,
        };
        RegisterCheck {
            email,
            errors,
            registration,
        }
    }
}

impl LoginRequest {
    pub fn validate(&self) -> Result<Login, FieldErrors> {
        let mut errors = FieldErrors::new();
        let email = email_rule(&mut errors, self.email.as_ref(), usize::MAX);
        let password = password_rule(&mut errors, self.password.as_ref());
        match (email, password) {
            (Some(email), Some(password)) => Ok(Login { email, password }),
            _ => Err(errors),
        }
    }
}
