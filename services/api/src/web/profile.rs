//! services/api/src/web/profile.rs
//!
//! The caller's financial profile. At most one per user; the advice endpoints
//! refuse to run without it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use finance_core::domain::NewFinancialProfile;
use finance_core::ports::PortError;
use finance_core::validation::{expect_record, merge_records, Validate};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::web::dto::{as_record, ProfileResponse};
use crate::web::state::{AppState, AuthUser};

const DUPLICATE_PROFILE: &str = "Financial profile already exists for this user.";

/// POST /profile/create/
#[utoipa::path(
    post,
    path = "/profile/create/",
    responses(
        (status = 201, description = "Profile created", body = ProfileResponse),
        (status = 400, description = "Field errors, or a profile already exists"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer" = []))
)]
pub async fn create_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<ProfileResponse>), ApiError> {
    // A duplicate is refused whatever the payload looks like.
    if state.db.get_profile_for_user(caller.id).await?.is_some() {
        return Err(PortError::Conflict(DUPLICATE_PROFILE.to_string()).into());
    }
    let draft = NewFinancialProfile::validate(expect_record(&body)?, state.today())?;
    let profile = state.db.create_profile(caller.id, &draft).await?;
    info!(profile_id = profile.id, "Financial profile created");
    Ok((StatusCode::CREATED, Json(ProfileResponse::from(&profile))))
}

/// GET /profile/ - The caller's own profile
#[utoipa::path(
    get,
    path = "/profile/",
    responses(
        (status = 200, description = "The caller's profile", body = ProfileResponse),
        (status = 404, description = "No profile yet")
    ),
    security(("bearer" = []))
)]
pub async fn my_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .db
        .get_profile_for_user(caller.id)
        .await?
        .ok_or_else(|| PortError::NotFound("Financial profile".to_string()))?;
    Ok(Json(ProfileResponse::from(&profile)))
}

/// GET /profile/{id}/
#[utoipa::path(
    get,
    path = "/profile/{id}/",
    params(("id" = i64, Path, description = "Profile id")),
    responses(
        (status = 200, description = "The profile", body = ProfileResponse),
        (status = 404, description = "Missing or owned by someone else")
    ),
    security(("bearer" = []))
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(profile_id): Path<i64>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.db.get_profile(caller.id, profile_id).await?;
    Ok(Json(ProfileResponse::from(&profile)))
}

/// PUT /profile/{id}/
#[utoipa::path(
    put,
    path = "/profile/{id}/",
    params(("id" = i64, Path, description = "Profile id")),
    responses(
        (status = 200, description = "The updated profile", body = ProfileResponse),
        (status = 400, description = "Field errors"),
        (status = 404, description = "Missing or owned by someone else")
    ),
    security(("bearer" = []))
)]
pub async fn replace_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(profile_id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<ProfileResponse>, ApiError> {
    state.db.get_profile(caller.id, profile_id).await?;
    let draft = NewFinancialProfile::validate(expect_record(&body)?, state.today())?;
    let profile = state.db.update_profile(caller.id, profile_id, &draft).await?;
    Ok(Json(ProfileResponse::from(&profile)))
}

/// PATCH /profile/{id}/
#[utoipa::path(
    patch,
    path = "/profile/{id}/",
    params(("id" = i64, Path, description = "Profile id")),
    responses(
        (status = 200, description = "The updated profile", body = ProfileResponse),
        (status = 400, description = "Field errors"),
        (status = 404, description = "Missing or owned by someone else")
    ),
    security(("bearer" = []))
)]
pub async fn patch_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(profile_id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let current = state.db.get_profile(caller.id, profile_id).await?;
    let merged = merge_records(
        as_record(&ProfileResponse::from(&current)),
        expect_record(&body)?,
    );
    let draft = NewFinancialProfile::validate(&merged, state.today())?;
    let profile = state.db.update_profile(caller.id, profile_id, &draft).await?;
    Ok(Json(ProfileResponse::from(&profile)))
}

/// DELETE /profile/{id}/
#[utoipa::path(
    delete,
    path = "/profile/{id}/",
    params(("id" = i64, Path, description = "Profile id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Missing or owned by someone else")
    ),
    security(("bearer" = []))
)]
pub async fn delete_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(profile_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_profile(caller.id, profile_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
