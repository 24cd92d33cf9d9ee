//! Cloud Reseller - multi-tenant VPS reselling backend
//!
//! # Modules
//!
//! - [`account`] - Users, balances and field validation
//! - [`user_auth`] - Password hashing, JWT sessions and route guards
//! - [`catalog`] - Providers and products on sale
//! - [`provider`] - Vendor adapter trait, registry and simulated vendors
//! - [`order`] - Wallet purchase transaction and post-commit provisioning
//! - [`instance`] - Purchased servers and their lifecycle
//! - [`admin`] - Dashboard, listings and management actions
//! - [`audit`] - Best-effort operation log
//! - [`gateway`] - HTTP router, shared state and OpenAPI docs

pub mod account;
pub mod admin;
pub mod audit;
pub mod catalog;
pub mod config;
pub mod db;
pub mod gateway;
pub mod instance;
pub mod logging;
pub mod money;
pub mod order;
pub mod provider;
pub mod user_auth;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use db::Database;
pub use gateway::state::AppState;
pub use provider::{CloudProvider, ProviderError, ProviderRegistry};
