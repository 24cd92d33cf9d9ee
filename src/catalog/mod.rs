//! Provider and product catalog
//!
//! Storefront listings plus the provider metadata passthrough (regions,
//! images, instance types) served by the registered adapters.

pub mod cache;
pub mod handlers;
pub mod models;
pub mod repository;

pub use models::{Product, ProductFilter, ProductStatus, ProductView, Provider, ProviderStatus};
pub use repository::CatalogRepository;
