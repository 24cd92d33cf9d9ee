use axum::{Extension, Json, extract::State};
use std::sync::Arc;
use validator::Validate;

use super::jwt::Claims;
use super::service::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest, RegisterRequest,
    UpdateProfileRequest,
};
use crate::account::UserProfile;
use crate::gateway::state::AppState;
use crate::gateway::types::{Ack, ApiResponse, ApiResult, created, ok};

/// Register a new user
///
/// POST /api/v1/auth/register
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username, email or phone already exists")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<UserProfile> {
    let profile = state.user_auth.register(req).await.inspect_err(|e| {
        tracing::warn!(code = e.code(), "registration rejected: {}", e);
    })?;
    created(profile)
}

/// Login with username, email or phone
///
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account disabled")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    req.validate()?;
    let resp = state.user_auth.login(req).await.inspect_err(|e| {
        tracing::warn!(code = e.code(), "login failed");
    })?;
    ok(resp)
}

/// Exchange a refresh token for a new token pair
///
/// POST /api/v1/auth/refresh
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid or expired refresh token")
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<LoginResponse> {
    ok(state.user_auth.refresh(&req.refresh_token).await?)
}

/// Logout. Tokens are stateless; the client discards them.
///
/// POST /api/v1/auth/logout
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 200, description = "Logged out", body = ApiResponse<Ack>)),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(Extension(claims): Extension<Claims>) -> ApiResult<Ack> {
    tracing::info!(user_id = claims.user_id(), "user logged out");
    ok(Ack::new())
}

/// Current user's profile (contact details masked)
#[utoipa::path(
    get,
    path = "/api/v1/user/profile",
    responses(
        (status = 200, description = "Profile", body = ApiResponse<UserProfile>),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<UserProfile> {
    ok(state.user_auth.profile(claims.user_id()).await?)
}

/// Update avatar, real name or phone
#[utoipa::path(
    put,
    path = "/api/v1/user/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid phone number"),
        (status = 409, description = "Phone number already in use")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<UserProfile> {
    req.validate()?;
    ok(state.user_auth.update_profile(claims.user_id(), req).await?)
}

/// Change password (requires the current one)
#[utoipa::path(
    post,
    path = "/api/v1/user/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<Ack>),
        (status = 400, description = "Old password incorrect or new password too weak")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Ack> {
    req.validate()?;
    state
        .user_auth
        .change_password(claims.user_id(), req)
        .await?;
    ok(Ack::new())
}
