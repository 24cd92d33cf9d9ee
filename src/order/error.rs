//! Purchase error types

use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::ValidationError;
use crate::gateway::types::{ApiError, error_codes, response::status_from_u16};
use crate::money::MoneyError;

#[derive(Error, Debug)]
pub enum PurchaseError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid instance password: {0}")]
    WeakPassword(#[from] ValidationError),

    #[error("Product not found")]
    ProductNotFound,

    #[error("Product is not on sale")]
    ProductOffline,

    #[error("Provider is not available")]
    ProviderUnavailable,

    #[error("User not found")]
    UserNotFound,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Decimal, available: Decimal },

    #[error("{0}")]
    Amount(#[from] MoneyError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PurchaseError {
    pub fn code(&self) -> &'static str {
        match self {
            PurchaseError::InvalidRequest(_) => "INVALID_REQUEST",
            PurchaseError::WeakPassword(_) => "WEAK_PASSWORD",
            PurchaseError::ProductNotFound => "PRODUCT_NOT_FOUND",
            PurchaseError::ProductOffline => "PRODUCT_OFFLINE",
            PurchaseError::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            PurchaseError::UserNotFound => "USER_NOT_FOUND",
            PurchaseError::AccountDisabled => "ACCOUNT_DISABLED",
            PurchaseError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            PurchaseError::Amount(_) => "INVALID_AMOUNT",
            PurchaseError::Hashing(_) => "HASHING_ERROR",
            PurchaseError::Database(_) => "DATABASE_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            PurchaseError::InvalidRequest(_)
            | PurchaseError::WeakPassword(_)
            | PurchaseError::ProductOffline
            | PurchaseError::InsufficientBalance { .. }
            | PurchaseError::Amount(_) => 400,
            PurchaseError::AccountDisabled => 403,
            PurchaseError::ProductNotFound | PurchaseError::UserNotFound => 404,
            PurchaseError::ProviderUnavailable => 503,
            PurchaseError::Hashing(_) | PurchaseError::Database(_) => 500,
        }
    }

    fn api_code(&self) -> i32 {
        match self {
            PurchaseError::InvalidRequest(_)
            | PurchaseError::WeakPassword(_)
            | PurchaseError::Amount(_) => error_codes::INVALID_PARAMETER,
            PurchaseError::ProductOffline => error_codes::PRODUCT_UNAVAILABLE,
            PurchaseError::InsufficientBalance { .. } => error_codes::INSUFFICIENT_BALANCE,
            PurchaseError::AccountDisabled => error_codes::ACCOUNT_DISABLED,
            PurchaseError::ProductNotFound | PurchaseError::UserNotFound => error_codes::NOT_FOUND,
            PurchaseError::ProviderUnavailable => error_codes::SERVICE_UNAVAILABLE,
            PurchaseError::Hashing(_) | PurchaseError::Database(_) => error_codes::INTERNAL_ERROR,
        }
    }
}

impl From<PurchaseError> for ApiError {
    fn from(err: PurchaseError) -> Self {
        let status = err.http_status();
        if status >= 500 && !matches!(err, PurchaseError::ProviderUnavailable) {
            tracing::error!(code = err.code(), error = %err, "purchase failed");
            return ApiError::internal("Internal server error");
        }
        ApiError::new(status_from_u16(status), err.api_code(), err.to_string())
    }
}

impl From<validator::ValidationErrors> for PurchaseError {
    fn from(errors: validator::ValidationErrors) -> Self {
        PurchaseError::InvalidRequest(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_balance_mapping() {
        let err = PurchaseError::InsufficientBalance {
            required: Decimal::new(16200, 2),
            available: Decimal::new(10000, 2),
        };
        let api: ApiError = err.into();
        assert_eq!(api.status.as_u16(), 400);
        assert_eq!(api.code, error_codes::INSUFFICIENT_BALANCE);
        assert!(api.msg.contains("162.00"));
    }

    #[test]
    fn test_provider_unavailable_is_503_with_message() {
        let api: ApiError = PurchaseError::ProviderUnavailable.into();
        assert_eq!(api.status.as_u16(), 503);
        assert_eq!(api.msg, "Provider is not available");
    }

    #[test]
    fn test_database_details_hidden() {
        let api: ApiError = PurchaseError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(api.status.as_u16(), 500);
        assert_eq!(api.msg, "Internal server error");
    }

    #[test]
    fn test_offline_product_code() {
        let api: ApiError = PurchaseError::ProductOffline.into();
        assert_eq!(api.code, error_codes::PRODUCT_UNAVAILABLE);
    }
}
