//! Cloud provider adapters
//!
//! Every vendor is wrapped in a [`CloudProvider`] implementation that speaks
//! the vendor-neutral types in [`types`]. The [`ProviderRegistry`] maps a
//! provider code (`providers.code`) to its adapter; server lifecycle code only
//! ever talks to the registry.

pub mod config;
pub mod registry;
pub mod tencent;
pub mod types;

use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

use crate::gateway::types::{ApiError, error_codes};

pub use config::ProviderSettings;
pub use registry::ProviderRegistry;
pub use tencent::TencentLighthouseProvider;
pub use types::*;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider config incomplete: {0}")]
    IncompleteConfig(String),

    #[error("Provider config is not valid JSON: {0}")]
    InvalidConfig(String),

    #[error("No adapter available for provider: {0}")]
    Unsupported(String),

    #[error("Provider not available: {0}")]
    Unavailable(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Vendor rejected request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::IncompleteConfig(_) => "PROVIDER_CONFIG_INCOMPLETE",
            ProviderError::InvalidConfig(_) => "PROVIDER_CONFIG_INVALID",
            ProviderError::Unsupported(_) => "PROVIDER_UNSUPPORTED",
            ProviderError::Unavailable(_) => "PROVIDER_UNAVAILABLE",
            ProviderError::InstanceNotFound(_) => "INSTANCE_NOT_FOUND",
            ProviderError::Rejected { .. } => "VENDOR_REJECTED",
            ProviderError::Network(_) => "VENDOR_NETWORK_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ProviderError::Unsupported(_) | ProviderError::Unavailable(_) => 503,
            ProviderError::InstanceNotFound(_) => 404,
            ProviderError::Rejected { .. } => 409,
            ProviderError::IncompleteConfig(_)
            | ProviderError::InvalidConfig(_)
            | ProviderError::Network(_) => 502,
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err.http_status() {
            503 => ApiError::service_unavailable(err.to_string()),
            404 => ApiError::not_found(err.to_string()),
            409 => ApiError::conflict(err.to_string()).with_code(error_codes::PROVIDER_ERROR),
            _ => {
                tracing::error!(code = err.code(), error = %err, "vendor call failed");
                ApiError::new(
                    axum::http::StatusCode::BAD_GATEWAY,
                    error_codes::PROVIDER_ERROR,
                    "Cloud provider request failed",
                )
            }
        }
    }
}

/// Uniform instance-management contract over one vendor API.
///
/// Instance ids are the vendor's own identifiers.
#[async_trait]
pub trait CloudProvider: Send + Sync + Debug {
    /// Human readable vendor name
    fn name(&self) -> &str;

    /// Registry key, equal to `providers.code`
    fn code(&self) -> &str;

    async fn create_instance(
        &self,
        req: &CreateInstanceRequest,
    ) -> Result<CreateInstanceResponse, ProviderError>;

    async fn delete_instance(&self, instance_id: &str) -> Result<(), ProviderError>;

    async fn start_instance(&self, instance_id: &str) -> Result<(), ProviderError>;

    async fn stop_instance(&self, instance_id: &str) -> Result<(), ProviderError>;

    async fn restart_instance(&self, instance_id: &str) -> Result<(), ProviderError>;

    async fn describe_instance(&self, instance_id: &str) -> Result<InstanceSnapshot, ProviderError>;

    async fn list_instances(
        &self,
        req: &ListInstancesRequest,
    ) -> Result<InstanceList, ProviderError>;

    async fn instance_metrics(&self, req: &MetricsRequest) -> Result<MetricSeries, ProviderError>;

    async fn reset_password(
        &self,
        instance_id: &str,
        new_password: &str,
    ) -> Result<(), ProviderError>;

    async fn rebuild_instance(
        &self,
        instance_id: &str,
        image_id: &str,
        password: &str,
    ) -> Result<(), ProviderError>;

    async fn regions(&self) -> Result<Vec<Region>, ProviderError>;

    async fn images(&self, filter: &ImageFilter) -> Result<Vec<Image>, ProviderError>;

    async fn instance_types(&self, region: Option<&str>)
    -> Result<Vec<InstanceType>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ProviderError::Unavailable("aliyun".into()).http_status(), 503);
        assert_eq!(ProviderError::InstanceNotFound("x".into()).http_status(), 404);
        assert_eq!(
            ProviderError::Rejected {
                code: "InvalidInstanceState".into(),
                message: "busy".into()
            }
            .http_status(),
            409
        );
        assert_eq!(ProviderError::Network("timeout".into()).code(), "VENDOR_NETWORK_ERROR");
    }

    #[test]
    fn test_vendor_details_hidden() {
        let api: ApiError = ProviderError::Network("tls handshake with 10.1.2.3".into()).into();
        assert_eq!(api.status.as_u16(), 502);
        assert_eq!(api.code, error_codes::PROVIDER_ERROR);
        assert!(!api.msg.contains("10.1.2.3"));

        let api: ApiError = ProviderError::Unavailable("aliyun".into()).into();
        assert_eq!(api.status.as_u16(), 503);
    }
}
