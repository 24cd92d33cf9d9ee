use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::error::AuthError;
use super::jwt::{Claims, TokenType};
use crate::account::UserRepository;
use crate::gateway::{state::AppState, types::ApiError};

/// Require a valid bearer access token; injects [`Claims`] into request
/// extensions for handlers to pick up with `Extension<Claims>`.
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::missing_auth("Missing Authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Invalid token format"))?;

    let claims = state.tokens.verify(token, TokenType::Access)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Must run after [`jwt_auth_middleware`]. The claimed role is checked
/// first; the account row is then re-read so an admin disabled or demoted
/// after the token was issued loses access immediately.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let (user_id, claimed_admin) = request
        .extensions()
        .get::<Claims>()
        .map(|c| (c.user_id(), c.is_admin()))
        .ok_or_else(|| ApiError::missing_auth("Missing Authorization header"))?;
    if !claimed_admin {
        return Err(AuthError::AdminRequired.into());
    }

    let user = UserRepository::get_by_id(state.db.pool(), user_id)
        .await
        .map_err(AuthError::from)?
        .ok_or(AuthError::InvalidToken)?;
    if !user.is_active() {
        return Err(AuthError::AccountDisabled.into());
    }
    if !user.is_admin() {
        return Err(AuthError::AdminRequired.into());
    }
    Ok(next.run(request).await)
}
