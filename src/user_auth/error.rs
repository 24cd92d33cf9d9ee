//! Authentication error types

use thiserror::Error;

use crate::account::ValidationError;
use crate::gateway::types::{ApiError, error_codes, response::status_from_u16};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Admin role required")]
    AdminRequired,

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Email already exists")]
    EmailTaken,

    #[error("Phone number already in use")]
    PhoneTaken,

    #[error("Username, email or phone already in use")]
    Duplicate,

    #[error("Old password is incorrect")]
    OldPasswordMismatch,

    #[error("User not found")]
    UserNotFound,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token encoding failed: {0}")]
    TokenEncoding(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::AccountDisabled => "ACCOUNT_DISABLED",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::AdminRequired => "ADMIN_REQUIRED",
            AuthError::Validation(_) => "VALIDATION_FAILED",
            AuthError::UsernameTaken => "USERNAME_TAKEN",
            AuthError::EmailTaken => "EMAIL_TAKEN",
            AuthError::PhoneTaken => "PHONE_TAKEN",
            AuthError::Duplicate => "DUPLICATE",
            AuthError::OldPasswordMismatch => "OLD_PASSWORD_MISMATCH",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::Hashing(_) => "HASHING_ERROR",
            AuthError::TokenEncoding(_) => "TOKEN_ERROR",
            AuthError::Database(_) => "DATABASE_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            AuthError::InvalidCredentials | AuthError::InvalidToken => 401,
            AuthError::AccountDisabled | AuthError::AdminRequired => 403,
            AuthError::Validation(_) | AuthError::OldPasswordMismatch => 400,
            AuthError::UsernameTaken
            | AuthError::EmailTaken
            | AuthError::PhoneTaken
            | AuthError::Duplicate => 409,
            AuthError::UserNotFound => 404,
            AuthError::Hashing(_) | AuthError::TokenEncoding(_) | AuthError::Database(_) => 500,
        }
    }

    fn api_code(&self) -> i32 {
        match self {
            AuthError::InvalidCredentials | AuthError::InvalidToken => error_codes::AUTH_FAILED,
            AuthError::AccountDisabled => error_codes::ACCOUNT_DISABLED,
            AuthError::AdminRequired => error_codes::PERMISSION_DENIED,
            AuthError::Validation(_) | AuthError::OldPasswordMismatch => {
                error_codes::INVALID_PARAMETER
            }
            AuthError::UsernameTaken
            | AuthError::EmailTaken
            | AuthError::PhoneTaken
            | AuthError::Duplicate => error_codes::CONFLICT,
            AuthError::UserNotFound => error_codes::NOT_FOUND,
            AuthError::Hashing(_) | AuthError::TokenEncoding(_) | AuthError::Database(_) => {
                error_codes::INTERNAL_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        if crate::db::is_unique_violation(&err) {
            AuthError::Duplicate
        } else {
            AuthError::Database(err.to_string())
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = err.http_status();
        if status >= 500 {
            tracing::error!(code = err.code(), error = %err, "auth request failed");
            return ApiError::internal("Internal server error");
        }
        ApiError::new(status_from_u16(status), err.api_code(), err.to_string())
    }
}
