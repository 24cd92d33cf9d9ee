//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::account::{AdminUserView, UserProfile};
use crate::admin::service::{
    AdminProductList, BalanceAdjustRequest, BalanceAdjustResult, DashboardStats,
    ProductStatusRequest, UserStatusRequest,
};
use crate::catalog::{Product, ProductView, Provider};
use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::Ack;
use crate::instance::{Server, ServerView};
use crate::order::{Order, OrderView, PurchaseReceipt, PurchaseRequest};
use crate::provider::{Image, InstanceType, Region, Zone};
use crate::user_auth::TokenPair;
use crate::user_auth::service::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest, RegisterRequest,
    UpdateProfileRequest,
};

/// JWT bearer scheme used by every non-public route
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("JWT")
                .description(Some(
                    "Access token from /api/v1/auth/login: `Authorization: Bearer <token>`",
                ))
                .build();
            components.add_security_scheme("bearer_auth", SecurityScheme::Http(scheme));
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cloud Reseller API",
        version = "1.0.0",
        description = "Multi-tenant VPS reselling: wallet purchases, server lifecycle and admin reporting.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        // Auth
        crate::user_auth::handlers::register,
        crate::user_auth::handlers::login,
        crate::user_auth::handlers::refresh,
        crate::user_auth::handlers::logout,
        // User center
        crate::user_auth::handlers::get_profile,
        crate::user_auth::handlers::update_profile,
        crate::user_auth::handlers::change_password,
        crate::instance::handlers::list_servers,
        // Catalog
        crate::catalog::handlers::list_products,
        crate::catalog::handlers::list_providers,
        crate::catalog::handlers::list_regions,
        crate::catalog::handlers::list_images,
        crate::catalog::handlers::list_instance_types,
        // Servers
        crate::order::handlers::purchase,
        crate::instance::handlers::get_server,
        crate::instance::handlers::start_server,
        crate::instance::handlers::stop_server,
        crate::instance::handlers::restart_server,
        crate::instance::handlers::sync_server,
        // Admin
        crate::admin::handlers::dashboard,
        crate::admin::handlers::list_users,
        crate::admin::handlers::list_orders,
        crate::admin::handlers::list_products,
        crate::admin::handlers::set_user_status,
        crate::admin::handlers::adjust_balance,
        crate::admin::handlers::set_product_status,
    ),
    components(
        schemas(
            HealthResponse,
            Ack,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            RefreshRequest,
            TokenPair,
            UpdateProfileRequest,
            ChangePasswordRequest,
            UserProfile,
            AdminUserView,
            Provider,
            Product,
            ProductView,
            Region,
            Zone,
            Image,
            InstanceType,
            PurchaseRequest,
            PurchaseReceipt,
            Order,
            OrderView,
            Server,
            ServerView,
            DashboardStats,
            AdminProductList,
            UserStatusRequest,
            ProductStatusRequest,
            BalanceAdjustRequest,
            BalanceAdjustResult,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token refresh"),
        (name = "User", description = "Profile and password (auth required)"),
        (name = "Catalog", description = "Providers, products and provider metadata (public)"),
        (name = "Server", description = "Purchase and server lifecycle (auth required)"),
        (name = "Admin", description = "Dashboard, listings and management (admin role required)"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Cloud Reseller API");
        assert_eq!(spec.info.version, "1.0.0");
    }

    #[test]
    fn test_openapi_json_serializable() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("Cloud Reseller API"));
    }

    #[test]
    fn test_endpoints_registered() {
        let paths = ApiDoc::openapi().paths.paths;
        assert!(paths.contains_key("/api/v1/health"));
        assert!(paths.contains_key("/api/v1/auth/login"));
        assert!(paths.contains_key("/api/v1/server/products"));
        assert!(paths.contains_key("/api/v1/server/purchase"));
        assert!(paths.contains_key("/api/v1/server/{id}/restart"));
        assert!(paths.contains_key("/api/v1/server/providers/{code}/images"));
        assert!(paths.contains_key("/api/v1/admin/users/{id}/balance"));
    }

    #[test]
    fn test_security_scheme_registered() {
        let components = ApiDoc::openapi().components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
