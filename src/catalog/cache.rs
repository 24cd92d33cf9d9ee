//! TTL cache for the active provider list
//!
//! Provider rows change rarely but are read on every storefront request.
//! Admin changes become visible within [`TTL_SECONDS`].

use cached::proc_macro::cached;
use sqlx::PgPool;

use super::models::Provider;
use super::repository::CatalogRepository;

/// TTL for the provider cache in seconds
pub const TTL_SECONDS: u64 = 5;

#[cached(
    time = 5,
    key = "String",
    convert = r#"{ "active_providers".to_string() }"#,
    result = true
)]
pub async fn load_active_providers_cached(pool: PgPool) -> Result<Vec<Provider>, String> {
    tracing::debug!("[cache] Loading active providers from database");
    CatalogRepository::list_active_providers(&pool)
        .await
        .map_err(|e| format!("Failed to load providers: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_constant() {
        assert_eq!(TTL_SECONDS, 5);
    }
}
