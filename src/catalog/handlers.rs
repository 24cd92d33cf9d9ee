use axum::extract::{Path, Query, State};
use std::sync::Arc;

use super::cache::load_active_providers_cached;
use super::models::{ProductFilter, ProductView, Provider};
use super::repository::CatalogRepository;
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, ApiResponse, ApiResult, ok};
use crate::provider::{Image, ImageFilter, InstanceType, Region, RegionFilter};

/// Products on sale
///
/// GET /api/v1/server/products
#[utoipa::path(
    get,
    path = "/api/v1/server/products",
    params(ProductFilter),
    responses(
        (status = 200, description = "Online products of active providers", body = ApiResponse<Vec<ProductView>>)
    ),
    tag = "Catalog"
)]
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Vec<ProductView>> {
    let products = CatalogRepository::list_online_products(state.db.pool(), &filter)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list products: {}", e);
            ApiError::internal("Internal server error")
        })?;
    ok(products)
}

/// Active providers (cached)
///
/// GET /api/v1/server/providers
#[utoipa::path(
    get,
    path = "/api/v1/server/providers",
    responses(
        (status = 200, description = "Active providers", body = ApiResponse<Vec<Provider>>)
    ),
    tag = "Catalog"
)]
pub async fn list_providers(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Provider>> {
    let providers = load_active_providers_cached(state.db.pool().clone())
        .await
        .map_err(|e| {
            tracing::error!("{}", e);
            ApiError::internal("Internal server error")
        })?;
    ok(providers)
}

/// Regions and zones offered by a provider
#[utoipa::path(
    get,
    path = "/api/v1/server/providers/{code}/regions",
    params(("code" = String, Path, description = "Provider code, e.g. tencent")),
    responses(
        (status = 200, description = "Regions", body = ApiResponse<Vec<Region>>),
        (status = 503, description = "Provider not available")
    ),
    tag = "Catalog"
)]
pub async fn list_regions(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<Vec<Region>> {
    let adapter = state.providers.get(&code)?;
    ok(adapter.regions().await?)
}

/// OS images offered by a provider
#[utoipa::path(
    get,
    path = "/api/v1/server/providers/{code}/images",
    params(("code" = String, Path, description = "Provider code"), ImageFilter),
    responses(
        (status = 200, description = "Images", body = ApiResponse<Vec<Image>>),
        (status = 503, description = "Provider not available")
    ),
    tag = "Catalog"
)]
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(filter): Query<ImageFilter>,
) -> ApiResult<Vec<Image>> {
    let adapter = state.providers.get(&code)?;
    ok(adapter.images(&filter).await?)
}

/// Instance bundles offered by a provider
#[utoipa::path(
    get,
    path = "/api/v1/server/providers/{code}/instance-types",
    params(("code" = String, Path, description = "Provider code"), RegionFilter),
    responses(
        (status = 200, description = "Instance types", body = ApiResponse<Vec<InstanceType>>),
        (status = 503, description = "Provider not available")
    ),
    tag = "Catalog"
)]
pub async fn list_instance_types(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(filter): Query<RegionFilter>,
) -> ApiResult<Vec<InstanceType>> {
    let adapter = state.providers.get(&code)?;
    ok(adapter.instance_types(filter.region.as_deref()).await?)
}
