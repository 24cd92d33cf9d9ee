use axum::{Extension, Json, extract::State};
use std::sync::Arc;

use super::purchase::{PurchaseReceipt, PurchaseRequest};
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiResponse, ApiResult, created};
use crate::user_auth::Claims;

/// Buy servers with account balance
///
/// POST /api/v1/server/purchase
///
/// The order is paid atomically; instances are created in the background.
#[utoipa::path(
    post,
    path = "/api/v1/server/purchase",
    request_body = PurchaseRequest,
    responses(
        (status = 201, description = "Order paid, provisioning started", body = ApiResponse<PurchaseReceipt>),
        (status = 400, description = "Invalid request, product offline or insufficient balance"),
        (status = 404, description = "Product not found"),
        (status = 503, description = "Provider not available")
    ),
    security(("bearer_auth" = [])),
    tag = "Server"
)]
pub async fn purchase(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PurchaseRequest>,
) -> ApiResult<PurchaseReceipt> {
    let receipt = state
        .purchases
        .purchase(claims.user_id(), req)
        .await
        .inspect_err(|e| {
            tracing::warn!(user_id = claims.user_id(), code = e.code(), "purchase rejected: {}", e);
        })?;
    created(receipt)
}
