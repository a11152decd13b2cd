use serde::{Deserialize, Serialize};
use strum_macros::Display;
use uuid::Uuid;

use crate::error::ValidationError;

pub type UserId = Uuid;
const USER_EMAIL_LENGTH_LIMIT: usize = 254;
const USER_PASSWORD_MIN_LENGTH: usize = 6;
const USER_PASSWORD_MAX_LENGTH: usize = 72;

#[derive(Clone, Debug, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Regular,
}

/// Mirror of an auth identity in the `user` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
}

/// Login and registration form; the email travels as `username`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsForm {
    pub fn trimmed(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            password: self.password.trim().to_string(),
        }
    }

    pub fn require_both(&self) -> Result<(), ValidationError> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(ValidationError::MissingField {
                field: if self.username.is_empty() {
                    "username"
                } else {
                    "password"
                },
            });
        }
        Ok(())
    }
}

pub fn validate_user_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::InvalidInput {
            value: email.to_string(),
            reason: "email cannot be empty".to_string(),
        });
    }
    if email.len() > USER_EMAIL_LENGTH_LIMIT {
        return Err(ValidationError::InvalidInput {
            value: email.to_string(),
            reason: format!(
                "email cannot be longer than {} chars",
                USER_EMAIL_LENGTH_LIMIT
            ),
        });
    }
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        }
        None => false,
    };
    if !well_formed || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidInput {
            value: email.to_string(),
            reason: "email address is malformed".to_string(),
        });
    }
    Ok(())
}

pub fn validate_user_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < USER_PASSWORD_MIN_LENGTH || password.len() > USER_PASSWORD_MAX_LENGTH {
        return Err(ValidationError::InvalidInput {
            value: "<password>".to_string(),
            reason: format!(
                "password should be at least {} and at most {} characters long",
                USER_PASSWORD_MIN_LENGTH, USER_PASSWORD_MAX_LENGTH
            ),
        });
    }
    Ok(())
}
