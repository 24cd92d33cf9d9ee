//! Admin endpoints. Routed behind `jwt_auth_middleware` + `require_admin`.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::service::{
    AdminProductList, BalanceAdjustRequest, BalanceAdjustResult, DashboardStats, OrderListQuery,
    ProductListQuery, ProductStatusRequest, UserListQuery, UserStatusRequest,
};
use crate::account::AdminUserView;
use crate::gateway::state::AppState;
use crate::gateway::types::{Ack, ApiResponse, ApiResult, Page, ok};
use crate::order::OrderView;
use crate::user_auth::Claims;

#[utoipa::path(
    get,
    path = "/api/v1/admin/dashboard",
    responses(
        (status = 200, description = "Headline numbers", body = ApiResponse<DashboardStats>),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn dashboard(State(state): State<Arc<AppState>>) -> ApiResult<DashboardStats> {
    ok(state.admin.dashboard().await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(UserListQuery),
    responses((status = 200, description = "Users", body = ApiResponse<Page<AdminUserView>>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserListQuery>,
) -> ApiResult<Page<AdminUserView>> {
    ok(state.admin.list_users(&q).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders", body = ApiResponse<Page<OrderView>>),
        (status = 400, description = "Unknown status filter")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(q): Query<OrderListQuery>,
) -> ApiResult<Page<OrderView>> {
    ok(state.admin.list_orders(&q).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/products",
    params(ProductListQuery),
    responses((status = 200, description = "Products and providers", body = ApiResponse<AdminProductList>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ProductListQuery>,
) -> ApiResult<AdminProductList> {
    ok(state.admin.list_products(&q).await?)
}

/// Enable or disable a user
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/status",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserStatusRequest,
    responses(
        (status = 200, description = "Updated", body = ApiResponse<Ack>),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn set_user_status(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<UserStatusRequest>,
) -> ApiResult<Ack> {
    state.admin.set_user_status(&claims, id, req.status).await?;
    ok(Ack::new())
}

/// Credit or debit a user's balance
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/balance",
    params(("id" = i64, Path, description = "User id")),
    request_body = BalanceAdjustRequest,
    responses(
        (status = 200, description = "New balance", body = ApiResponse<BalanceAdjustResult>),
        (status = 400, description = "Zero amount, bad precision or balance would go negative"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn adjust_balance(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<BalanceAdjustRequest>,
) -> ApiResult<BalanceAdjustResult> {
    ok(state.admin.adjust_balance(&claims, id, req).await?)
}

/// Put a product on or off sale
#[utoipa::path(
    put,
    path = "/api/v1/admin/products/{id}/status",
    params(("id" = i64, Path, description = "Product id")),
    request_body = ProductStatusRequest,
    responses(
        (status = 200, description = "Updated", body = ApiResponse<Ack>),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn set_product_status(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<ProductStatusRequest>,
) -> ApiResult<Ack> {
    state.admin.set_product_status(&claims, id, req.status).await?;
    ok(Ack::new())
}
