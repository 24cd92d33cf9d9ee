pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GatewayConfig;
use crate::user_auth::middleware::{jwt_auth_middleware, require_admin};
use crate::{admin, catalog, instance, order, user_auth};
use state::AppState;

/// Assemble every route. Split out of [`run_server`] so tests can drive the
/// router with `oneshot` without binding a socket.
pub fn build_router(state: Arc<AppState>) -> Router {
    // ==========================================================================
    // Auth routes: public except logout
    // ==========================================================================
    let auth_routes = Router::new()
        .route(
            "/logout",
            post(user_auth::handlers::logout)
                .layer(from_fn_with_state(state.clone(), jwt_auth_middleware)),
        )
        .route("/register", post(user_auth::handlers::register))
        .route("/login", post(user_auth::handlers::login))
        .route("/refresh", post(user_auth::handlers::refresh));

    // ==========================================================================
    // User center: JWT
    // ==========================================================================
    let user_routes = Router::new()
        .route(
            "/profile",
            get(user_auth::handlers::get_profile).put(user_auth::handlers::update_profile),
        )
        .route("/change-password", post(user_auth::handlers::change_password))
        .route("/servers", get(instance::handlers::list_servers))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    // ==========================================================================
    // Server routes: catalog is public, purchase and lifecycle need a JWT
    // ==========================================================================
    let catalog_routes = Router::new()
        .route("/products", get(catalog::handlers::list_products))
        .route("/providers", get(catalog::handlers::list_providers))
        .route(
            "/providers/{code}/regions",
            get(catalog::handlers::list_regions),
        )
        .route("/providers/{code}/images", get(catalog::handlers::list_images))
        .route(
            "/providers/{code}/instance-types",
            get(catalog::handlers::list_instance_types),
        );

    let server_routes = Router::new()
        .route("/purchase", post(order::handlers::purchase))
        .route("/{id}", get(instance::handlers::get_server))
        .route("/{id}/start", post(instance::handlers::start_server))
        .route("/{id}/stop", post(instance::handlers::stop_server))
        .route("/{id}/restart", post(instance::handlers::restart_server))
        .route("/{id}/sync", post(instance::handlers::sync_server))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    // ==========================================================================
    // Admin routes: JWT + admin role. Layers run bottom-up, so the JWT layer
    // is added last to run first.
    // ==========================================================================
    let admin_routes = Router::new()
        .route("/dashboard", get(admin::handlers::dashboard))
        .route("/users", get(admin::handlers::list_users))
        .route("/users/{id}/status", put(admin::handlers::set_user_status))
        .route("/users/{id}/balance", post(admin::handlers::adjust_balance))
        .route("/orders", get(admin::handlers::list_orders))
        .route("/products", get(admin::handlers::list_products))
        .route(
            "/products/{id}/status",
            put(admin::handlers::set_product_status),
        )
        .layer(from_fn_with_state(state.clone(), require_admin))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/user", user_routes)
        .nest("/api/v1/server", catalog_routes.merge(server_routes))
        .nest("/api/v1/admin", admin_routes)
        .with_state(state)
        // Stateless, added after with_state
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Start HTTP Gateway server
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        anyhow::anyhow!(
            "failed to bind {}: {} (is port {} already in use?)",
            addr,
            e,
            config.port
        )
    })?;

    tracing::info!("Gateway listening on http://{}", addr);
    tracing::info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
