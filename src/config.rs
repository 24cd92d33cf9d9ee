use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Admin account created on startup when no user with that name exists
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
    /// Per-provider credential overlay, keyed by provider code (e.g. `tencent`)
    #[serde(default)]
    pub providers: HashMap<String, ProviderCredentials>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    #[serde(default)]
    pub use_json: bool,
    /// hourly | daily | never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: i64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: i64,
}

fn default_issuer() -> String {
    "cloud-reseller".to_string()
}

fn default_access_ttl() -> i64 {
    3600
}

fn default_refresh_ttl() -> i64 {
    7 * 24 * 3600
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: default_issuer(),
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Vendor credentials kept out of the database.
///
/// Any field set here wins over the same key in the provider row's JSON config.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderCredentials {
    #[serde(default)]
    pub secret_id: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl AppConfig {
    /// Load `config/{env}.yaml` and apply environment overrides
    /// (`DATABASE_URL`, `JWT_SECRET`).
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config yaml: {}", config_path))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < 16 {
            anyhow::bail!("auth.jwt_secret must be at least 16 bytes (set it in config or JWT_SECRET)");
        }
        if self.auth.access_token_ttl_secs <= 0 || self.auth.refresh_token_ttl_secs <= 0 {
            anyhow::bail!("token TTLs must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
logging:
  level: info
  dir: ./logs
  file: test.log
gateway:
  host: 127.0.0.1
  port: 8080
auth:
  jwt_secret: "0123456789abcdef0123"
"#;

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let cfg = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(cfg.logging.rotation, "daily");
        assert!(!cfg.logging.use_json);
        assert_eq!(cfg.database.max_connections, 20);
        assert!(cfg.database.run_migrations);
        assert_eq!(cfg.auth.issuer, "cloud-reseller");
        assert_eq!(cfg.auth.access_token_ttl_secs, 3600);
        assert!(cfg.bootstrap_admin.is_none());
        assert!(cfg.providers.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_provider_credentials_parse() {
        let yaml = format!(
            "{}\nproviders:\n  tencent:\n    secret_id: AKID\n    secret_key: SK\n",
            MINIMAL
        );
        let cfg = AppConfig::from_yaml(&yaml).unwrap();
        let creds = cfg.providers.get("tencent").unwrap();
        assert_eq!(creds.secret_id.as_deref(), Some("AKID"));
        assert!(creds.region.is_none());
    }

    #[test]
    fn test_short_secret_rejected() {
        let yaml = MINIMAL.replace("0123456789abcdef0123", "short");
        let cfg = AppConfig::from_yaml(&yaml).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_missing_section_is_error() {
        assert!(AppConfig::from_yaml("gateway:\n  host: x\n  port: 1\n").is_err());
    }
}
