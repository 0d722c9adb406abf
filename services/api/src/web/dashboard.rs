//! services/api/src/web/dashboard.rs

use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::dto::{
    DashboardResponse, ExpenseResponse, IncomeResponse, InvestmentResponse, ProfileResponse,
};
use crate::web::state::{AppState, AuthUser};

/// GET /dashboard/ - Identity, profile and every ledger of the caller in one read
#[utoipa::path(
    get,
    path = "/dashboard/",
    responses(
        (status = 200, description = "The caller's finances", body = DashboardResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer" = []))
)]
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let db = state.db.as_ref();
    let user = db.get_user(caller.id).await?;
    let profile = db.get_profile_for_user(caller.id).await?;
    let incomes = db.list_incomes(caller.id).await?;
    let expenses = db.list_expenses(caller.id).await?;
    let investments = db.list_investments(caller.id).await?;

    Ok(Json(DashboardResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        financial_profile: profile.as_ref().map(ProfileResponse::from),
        incomes: incomes.iter().map(IncomeResponse::from).collect(),
        expenses: expenses.iter().map(ExpenseResponse::from).collect(),
        investments: investments.iter().map(InvestmentResponse::from).collect(),
    }))
}
