//! Provider code -> adapter lookup

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;

use super::config::ProviderSettings;
use super::{CloudProvider, ProviderError};
use crate::catalog::{CatalogRepository, Provider};
use crate::config::ProviderCredentials;

/// Build the adapter for one provider row.
pub fn build_adapter(
    code: &str,
    settings: ProviderSettings,
) -> Result<Arc<dyn CloudProvider>, ProviderError> {
    match code {
        #[cfg(feature = "mock-provider")]
        super::tencent::CODE => Ok(Arc::new(super::TencentLighthouseProvider::new(settings)?)),
        other => {
            let _ = settings;
            Err(ProviderError::Unsupported(other.to_string()))
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<String, Arc<dyn CloudProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own code, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn CloudProvider>) {
        self.adapters.insert(adapter.code().to_string(), adapter);
    }

    pub fn get(&self, code: &str) -> Result<Arc<dyn CloudProvider>, ProviderError> {
        self.adapters
            .get(code)
            .cloned()
            .ok_or_else(|| ProviderError::Unavailable(code.to_string()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.adapters.contains_key(code)
    }

    /// Registered codes, sorted
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Build adapters for the given provider rows. Inactive rows, unknown
    /// codes and broken configs are skipped with a warning.
    pub fn from_providers(
        providers: &[Provider],
        credentials: &HashMap<String, ProviderCredentials>,
    ) -> Self {
        let mut registry = Self::new();
        for provider in providers.iter().filter(|p| p.is_active()) {
            let adapter = ProviderSettings::from_json(&provider.config)
                .map(|s| s.with_credentials(credentials.get(&provider.code)))
                .and_then(|s| build_adapter(&provider.code, s));
            match adapter {
                Ok(adapter) => {
                    tracing::info!(code = %provider.code, name = adapter.name(), "provider adapter registered");
                    registry.register(adapter);
                }
                Err(e) => {
                    tracing::warn!(
                        code = %provider.code,
                        error_code = e.code(),
                        "skipping provider: {}",
                        e
                    );
                }
            }
        }
        registry
    }

    /// Load active providers from the database and build their adapters.
    pub async fn load(
        pool: &PgPool,
        credentials: &HashMap<String, ProviderCredentials>,
    ) -> Result<Self, sqlx::Error> {
        let providers = CatalogRepository::list_active_providers(pool).await?;
        Ok(Self::from_providers(&providers, credentials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProviderStatus;
    use crate::catalog::models::tests::sample_provider;

    fn provider(code: &str, status: ProviderStatus, config: &str) -> Provider {
        Provider {
            code: code.into(),
            status,
            config: config.into(),
            ..sample_provider()
        }
    }

    #[test]
    fn test_unknown_code_unavailable() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get("tencent"),
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[cfg(feature = "mock-provider")]
    #[test]
    fn test_from_providers_skips_bad_rows() {
        let rows = vec![
            sample_provider(),
            provider("aliyun", ProviderStatus::Active, "{}"),
            provider("tencent-broken", ProviderStatus::Active, "{oops"),
            provider("tencent", ProviderStatus::Inactive, "{}"),
        ];
        let registry = ProviderRegistry::from_providers(&rows, &HashMap::new());
        assert_eq!(registry.codes(), vec!["tencent"]);
        assert_eq!(registry.get("tencent").unwrap().name(), "Tencent Cloud");
        assert!(registry.get("aliyun").is_err());
    }

    #[cfg(feature = "mock-provider")]
    #[test]
    fn test_credentials_from_config_file() {
        let rows = vec![provider("tencent", ProviderStatus::Active, "{}")];

        // No keys anywhere: skipped
        let registry = ProviderRegistry::from_providers(&rows, &HashMap::new());
        assert!(!registry.contains("tencent"));

        let mut creds = HashMap::new();
        creds.insert(
            "tencent".to_string(),
            ProviderCredentials {
                secret_id: Some("AKID".into()),
                secret_key: Some("sk".into()),
                region: None,
                endpoint: None,
            },
        );
        let registry = ProviderRegistry::from_providers(&rows, &creds);
        assert!(registry.contains("tencent"));
        assert_eq!(registry.len(), 1);
    }
}
