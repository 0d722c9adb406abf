//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, token refresh and logout.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::Utc;
use finance_core::domain::{TokenKind, User, UserId};
use finance_core::ports::PortError;
use finance_core::validation::{
    expect_record, FieldErrors, FieldReader, LoginAttempt, Registration, Validate,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::dto::{AccessTokenResponse, AuthResponse, TokenPair, UserResponse};
use crate::web::state::{AppState, AuthUser};

//=========================================================================================
// Request Types (documentation only; bodies are validated field by field)
//=========================================================================================

#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub password2: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

fn verify_password(password: &str, hashed: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hashed).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

async fn issue_token(
    state: &AppState,
    user_id: UserId,
    kind: TokenKind,
) -> Result<String, ApiError> {
    let token = Uuid::new_v4().to_string();
    let ttl = match kind {
        TokenKind::Access => state.config.access_token_ttl,
        TokenKind::Refresh => state.config.refresh_token_ttl,
    };
    state
        .db
        .create_auth_token(&token, user_id, kind, Utc::now() + ttl)
        .await?;
    Ok(token)
}

async fn issue_token_pair(state: &AppState, user: &User) -> Result<AuthResponse, ApiError> {
    let access = issue_token(state, user.id, TokenKind::Access).await?;
    let refresh = issue_token(state, user.id, TokenKind::Refresh).await?;
    Ok(AuthResponse {
        status: "success",
        user: UserResponse::from(user),
        tokens: TokenPair { access, refresh },
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register/ - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/register/",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Field errors"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Validate the shape of every field
    let registration = Registration::validate(expect_record(&body)?, state.today())?;

    // 2. Uniqueness needs storage
    let mut taken = FieldErrors::new();
    if state.db.username_taken(&registration.user.username).await? {
        taken.add("username", "A user with that username already exists.");
    }
    if state.db.email_taken(&registration.user.email, None).await? {
        taken.add("email", "A user with that email already exists.");
    }
    if !taken.is_empty() {
        return Err(ApiError::Validation(taken));
    }

    // 3. Hash the password and store the user
    let password_hash = hash_password(&registration.password)?;
    let user = state
        .db
        .create_user(&registration.user, &password_hash)
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => ApiError::Validation(FieldErrors::single(
                "username",
                "A user with that username already exists.",
            )),
            other => ApiError::Port(other),
        })?;
    info!(user_id = user.id, "Registered a new user");

    // 4. Log them straight in
    let response = issue_token_pair(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login/ - Login with an existing account
#[utoipa::path(
    post,
    path = "/auth/login/",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let attempt = LoginAttempt::validate(expect_record(&body)?, state.today())?;

    // 1. Get user by username
    let credentials = match state.db.get_credentials_by_username(&attempt.username).await {
        Ok(credentials) => credentials,
        Err(PortError::NotFound(_)) => return Err(ApiError::InvalidCredentials),
        Err(other) => return Err(other.into()),
    };

    // 2. Verify password and account state
    if !verify_password(&attempt.password, &credentials.hashed_password)?
        || !credentials.user.is_active
    {
        return Err(ApiError::InvalidCredentials);
    }

    // 3. Issue tokens
    let response = issue_token_pair(&state, &credentials.user).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// POST /auth/token/refresh/ - Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/auth/token/refresh/",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 400, description = "Missing refresh token"),
        (status = 401, description = "Refresh token invalid or expired")
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let mut fields = FieldReader::new(expect_record(&body)?);
    let refresh = fields.secret("refresh");
    let refresh = fields.finish(move || refresh)?;

    let user = state
        .db
        .validate_auth_token(&refresh, TokenKind::Refresh)
        .await
        .map_err(|e| match e {
            PortError::Unauthorized | PortError::NotFound(_) => {
                ApiError::Unauthorized("Token is invalid or expired".to_string())
            }
            other => ApiError::Port(other),
        })?;

    let access = issue_token(&state, user.id, TokenKind::Access).await?;
    Ok(Json(AccessTokenResponse { access }))
}

/// POST /auth/logout/ - Revoke every token of the caller
#[utoipa::path(
    post,
    path = "/auth/logout/",
    responses(
        (status = 204, description = "Logout successful"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer" = []))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    state.db.revoke_auth_tokens(caller.id).await?;
    info!("User logged out");
    Ok(StatusCode::NO_CONTENT)
}
