//! Cloud Reseller gateway
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌───────────┐    ┌──────────┐
//! │  Config  │───▶│ Postgres │───▶│ Providers │───▶│ Gateway  │
//! │  (YAML)  │    │(migrate) │    │(registry) │    │  (axum)  │
//! └──────────┘    └──────────┘    └───────────┘    └──────────┘
//! ```
//!
//! Usage: `cloud_reseller [--env dev] [--port 8080]`

use anyhow::Context;
use std::sync::Arc;

use cloud_reseller::config::AppConfig;
use cloud_reseller::db::{Database, seed};
use cloud_reseller::gateway::{self, state::AppState};
use cloud_reseller::provider::ProviderRegistry;
use cloud_reseller::user_auth::TokenManager;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }
    let _log_guard = cloud_reseller::logging::init_logging(&app_config.logging);

    tracing::info!(env = %env, "Starting cloud reseller gateway");

    let url = app_config
        .database
        .url
        .as_deref()
        .context("database.url is not set (config or DATABASE_URL)")?;
    let db = Database::connect(url, app_config.database.max_connections)
        .await
        .context("failed to connect to PostgreSQL")?;
    if app_config.database.run_migrations {
        db.migrate().await.context("migration failed")?;
    }

    if let Some(admin) = &app_config.bootstrap_admin {
        match seed::ensure_bootstrap_admin(db.pool(), admin).await {
            Ok(true) => tracing::info!(username = %admin.username, "bootstrap admin created"),
            Ok(false) => {}
            Err(e) => tracing::warn!("bootstrap admin skipped: {}", e),
        }
    }

    let providers = ProviderRegistry::load(db.pool(), &app_config.providers)
        .await
        .context("failed to load providers")?;
    if providers.is_empty() {
        tracing::warn!("no provider adapters registered; purchases will be rejected");
    } else {
        tracing::info!(providers = ?providers.codes(), "provider adapters registered");
    }

    let tokens = Arc::new(TokenManager::new(&app_config.auth));
    let state = Arc::new(AppState::new(db, tokens, Arc::new(providers)));

    gateway::run_server(&app_config.gateway, state).await
}
