use axum::{
    Extension,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::models::ServerView;
use super::service::LifecycleAction;
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiResponse, ApiResult, Page, PageQuery, ok};
use crate::user_auth::Claims;

/// Current user's servers, newest first
#[utoipa::path(
    get,
    path = "/api/v1/user/servers",
    params(PageQuery),
    responses(
        (status = 200, description = "Servers", body = ApiResponse<Page<ServerView>>),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Server"
)]
pub async fn list_servers(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Page<ServerView>> {
    ok(state.instances.list(claims.user_id(), page.window()).await?)
}

/// Server detail (owner only)
#[utoipa::path(
    get,
    path = "/api/v1/server/{id}",
    params(("id" = i64, Path, description = "Server id")),
    responses(
        (status = 200, description = "Server", body = ApiResponse<ServerView>),
        (status = 404, description = "No such server for this user")
    ),
    security(("bearer_auth" = [])),
    tag = "Server"
)]
pub async fn get_server(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> ApiResult<ServerView> {
    ok(state.instances.detail(claims.user_id(), id).await?)
}

async fn lifecycle(
    state: &AppState,
    claims: &Claims,
    id: i64,
    action: LifecycleAction,
) -> ApiResult<ServerView> {
    let view = state
        .instances
        .perform(claims.user_id(), &claims.username, id, action)
        .await
        .inspect_err(|e| {
            tracing::warn!(server_id = id, action = action.as_str(), code = e.code(), "{}", e);
        })?;
    ok(view)
}

/// Power on a stopped server
#[utoipa::path(
    post,
    path = "/api/v1/server/{id}/start",
    params(("id" = i64, Path, description = "Server id")),
    responses(
        (status = 200, description = "Started", body = ApiResponse<ServerView>),
        (status = 404, description = "No such server for this user"),
        (status = 409, description = "Server is not stopped, expired or still provisioning")
    ),
    security(("bearer_auth" = [])),
    tag = "Server"
)]
pub async fn start_server(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> ApiResult<ServerView> {
    lifecycle(&state, &claims, id, LifecycleAction::Start).await
}

/// Power off a running server
#[utoipa::path(
    post,
    path = "/api/v1/server/{id}/stop",
    params(("id" = i64, Path, description = "Server id")),
    responses(
        (status = 200, description = "Stopped", body = ApiResponse<ServerView>),
        (status = 404, description = "No such server for this user"),
        (status = 409, description = "Server is not running, expired or still provisioning")
    ),
    security(("bearer_auth" = [])),
    tag = "Server"
)]
pub async fn stop_server(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> ApiResult<ServerView> {
    lifecycle(&state, &claims, id, LifecycleAction::Stop).await
}

/// Reboot a running server
#[utoipa::path(
    post,
    path = "/api/v1/server/{id}/restart",
    params(("id" = i64, Path, description = "Server id")),
    responses(
        (status = 200, description = "Restarted", body = ApiResponse<ServerView>),
        (status = 404, description = "No such server for this user"),
        (status = 409, description = "Server is not running, expired or still provisioning")
    ),
    security(("bearer_auth" = [])),
    tag = "Server"
)]
pub async fn restart_server(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> ApiResult<ServerView> {
    lifecycle(&state, &claims, id, LifecycleAction::Restart).await
}

/// Refresh state, IPs and specs from the vendor
#[utoipa::path(
    post,
    path = "/api/v1/server/{id}/sync",
    params(("id" = i64, Path, description = "Server id")),
    responses(
        (status = 200, description = "Synced", body = ApiResponse<ServerView>),
        (status = 404, description = "No such server for this user")
    ),
    security(("bearer_auth" = [])),
    tag = "Server"
)]
pub async fn sync_server(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> ApiResult<ServerView> {
    ok(state.instances.sync(claims.user_id(), id).await?)
}
