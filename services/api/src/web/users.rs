//! services/api/src/web/users.rs
//!
//! The user directory. Staff see everyone; everyone else sees only themselves.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use finance_core::domain::{UserId, UserUpdate};
use finance_core::validation::{expect_record, merge_records, FieldErrors, Validate};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::web::dto::{as_record, UserResponse};
use crate::web::state::{AppState, AuthUser};

fn ensure_may_access(caller: &AuthUser, user_id: UserId) -> Result<(), ApiError> {
    if caller.is_staff || caller.id == user_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You don't have permission to access this user".to_string(),
        ))
    }
}

/// GET /users/
#[utoipa::path(
    get,
    path = "/users/",
    responses(
        (status = 200, description = "Visible users", body = [UserResponse]),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer" = []))
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = if caller.is_staff {
        state.db.list_users().await?
    } else {
        vec![state.db.get_user(caller.id).await?]
    };
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// GET /users/{id}/
#[utoipa::path(
    get,
    path = "/users/{id}/",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 403, description = "Another user's identity"),
        (status = 404, description = "No such user")
    ),
    security(("bearer" = []))
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserResponse>, ApiError> {
    ensure_may_access(&caller, user_id)?;
    let user = state.db.get_user(user_id).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// PATCH /users/{id}/ - Update email and names
#[utoipa::path(
    patch,
    path = "/users/{id}/",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "The updated user", body = UserResponse),
        (status = 400, description = "Field errors"),
        (status = 403, description = "Another user's identity"),
        (status = 404, description = "No such user")
    ),
    security(("bearer" = []))
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<UserId>,
    Json(body): Json<Value>,
) -> Result<Json<UserResponse>, ApiError> {
    ensure_may_access(&caller, user_id)?;
    let current = state.db.get_user(user_id).await?;

    let merged = merge_records(as_record(&UserResponse::from(&current)), expect_record(&body)?);
    let update = UserUpdate::validate(&merged, state.today())?;
    if state.db.email_taken(&update.email, Some(user_id)).await? {
        return Err(ApiError::Validation(FieldErrors::single(
            "email",
            "A user with that email already exists.",
        )));
    }

    let user = state.db.update_user(user_id, &update).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// DELETE /users/{id}/ - Remove a user and everything they own
#[utoipa::path(
    delete,
    path = "/users/{id}/",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Another user's identity"),
        (status = 404, description = "No such user")
    ),
    security(("bearer" = []))
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<UserId>,
) -> Result<StatusCode, ApiError> {
    ensure_may_access(&caller, user_id)?;
    state.db.delete_user(user_id).await?;
    info!(deleted_user_id = user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
