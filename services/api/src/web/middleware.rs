//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use finance_core::domain::TokenKind;
use finance_core::ports::PortError;
use std::sync::Arc;
use tracing::{info_span, Instrument};

use crate::error::ApiError;
use crate::web::state::{AppState, AuthUser};

/// Middleware that validates the bearer access token and resolves the caller.
///
/// If valid, inserts an `AuthUser` into request extensions for handlers to use
/// and runs the rest of the request inside a span carrying the user id.
/// If invalid or missing, returns 401 Unauthorized before any handler runs.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the bearer token
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ApiError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?
        .to_string();

    // 2. Resolve it to an active user
    let user = state
        .db
        .validate_auth_token(&token, TokenKind::Access)
        .await
        .map_err(|e| match e {
            PortError::Unauthorized | PortError::NotFound(_) => {
                ApiError::Unauthorized("Given token not valid or expired.".to_string())
            }
            other => ApiError::Port(other),
        })?;

    // 3. Insert the caller into request extensions
    let span = info_span!("request", user_id = user.id);
    req.extensions_mut().insert(AuthUser::from(&user));

    // 4. Continue to the handler
    Ok(next.run(req).instrument(span).await)
}
