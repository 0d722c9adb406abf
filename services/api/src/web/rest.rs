//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification. The generic ledger
//! handlers are not listed; their schemas are.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::web::{ai, auth, dashboard, dto, profile, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::refresh_handler,
        auth::logout_handler,
        users::list_users_handler,
        users::get_user_handler,
        users::update_user_handler,
        users::delete_user_handler,
        dashboard::dashboard_handler,
        profile::create_profile_handler,
        profile::my_profile_handler,
        profile::get_profile_handler,
        profile::replace_profile_handler,
        profile::patch_profile_handler,
        profile::delete_profile_handler,
        ai::insights_handler,
        ai::chat_handler,
        ai::similar_investments_handler,
        ai::loan_analysis_handler,
        ai::list_chat_histories_handler,
        ai::get_chat_history_handler,
        ai::delete_chat_history_handler,
    ),
    components(
        schemas(
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::RefreshRequest,
            dto::UserResponse,
            dto::TokenPair,
            dto::AuthResponse,
            dto::AccessTokenResponse,
            dto::ProfileResponse,
            dto::IncomeResponse,
            dto::ExpenseResponse,
            dto::InvestmentResponse,
            dto::DashboardResponse,
            dto::AdviceResponse,
            dto::RecommendationsResponse,
            dto::LoanAnalysisResponse,
            dto::ChatRequest,
            dto::ChatResponse,
            dto::ChatHistoryResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Finance Tracker API", description = "Personal finance records and AI-generated advice.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by the protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}
