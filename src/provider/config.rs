//! Adapter settings: provider row JSON merged with YAML credentials

use serde::Deserialize;
use std::fmt;

use super::ProviderError;
use crate::config::ProviderCredentials;

#[derive(Clone, Default, Deserialize, PartialEq)]
pub struct ProviderSettings {
    #[serde(default)]
    pub secret_id: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, alias = "api_endpoint")]
    pub endpoint: String,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ProviderSettings {
    /// Parse the `providers.config` column. Blank text counts as `{}`.
    pub fn from_json(raw: &str) -> Result<Self, ProviderError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(|e| ProviderError::InvalidConfig(e.to_string()))
    }

    /// Apply YAML credentials on top; set fields win.
    pub fn with_credentials(mut self, creds: Option<&ProviderCredentials>) -> Self {
        let Some(creds) = creds else {
            return self;
        };
        if let Some(ref v) = creds.secret_id {
            self.secret_id = v.clone();
        }
        if let Some(ref v) = creds.secret_key {
            self.secret_key = v.clone();
        }
        if let Some(ref v) = creds.region {
            self.region = v.clone();
        }
        if let Some(ref v) = creds.endpoint {
            self.endpoint = v.clone();
        }
        self
    }

    /// Fill blank endpoint/region with vendor defaults
    pub fn with_defaults(mut self, endpoint: &str, region: &str) -> Self {
        if self.endpoint.is_empty() {
            self.endpoint = endpoint.to_string();
        }
        if self.region.is_empty() {
            self.region = region.to_string();
        }
        self
    }

    pub fn require_keys(&self) -> Result<(), ProviderError> {
        if self.secret_id.is_empty() || self.secret_key.is_empty() {
            return Err(ProviderError::IncompleteConfig(
                "secret_id and secret_key are required".to_string(),
            ));
        }
        Ok(())
    }
}
