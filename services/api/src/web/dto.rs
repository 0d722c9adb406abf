//! services/api/src/web/dto.rs
//!
//! Wire representations of the domain types. Domain structs stay free of HTTP
//! and OpenAPI concerns; these carry the `Serialize`/`ToSchema` derives instead.

use chrono::{DateTime, NaiveDate, Utc};
use finance_core::domain::{
    ChatHistory, ChatMessage, Expense, FinancialProfile, Income, Investment, User, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

//=========================================================================================
// Users and Tokens
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub status: &'static str,
    pub user: UserResponse,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access: String,
}

//=========================================================================================
// Finance Records
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: i64,
    pub user: UserId,
    pub age: i32,
    pub monthly_salary: i64,
    pub monthly_savings: i64,
    pub risk_tolerance: String,
    pub created_at: DateTime<Utc>,
}

impl From<&FinancialProfile> for ProfileResponse {
    fn from(p: &FinancialProfile) -> Self {
        Self {
            id: p.id,
            user: p.user_id,
            age: p.age,
            monthly_salary: p.monthly_salary,
            monthly_savings: p.monthly_savings,
            risk_tolerance: p.risk_tolerance.as_str().to_string(),
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IncomeResponse {
    pub id: i64,
    pub user: UserId,
    pub source: String,
    pub amount: Decimal,
    pub date_received: NaiveDate,
}

impl From<&Income> for IncomeResponse {
    fn from(i: &Income) -> Self {
        Self {
            id: i.id,
            user: i.user_id,
            source: i.source.clone(),
            amount: i.amount,
            date_received: i.date_received,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExpenseResponse {
    pub id: i64,
    pub user: UserId,
    pub category: String,
    pub amount: Decimal,
    pub date_spent: NaiveDate,
}

impl From<&Expense> for ExpenseResponse {
    fn from(e: &Expense) -> Self {
        Self {
            id: e.id,
            user: e.user_id,
            category: e.category.clone(),
            amount: e.amount,
            date_spent: e.date_spent,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvestmentResponse {
    pub id: i64,
    pub user: UserId,
    pub name: String,
    pub investment_type: String,
    pub amount_invested: Decimal,
    pub current_value: Decimal,
    pub date_invested: NaiveDate,
    pub interest_rate: Option<Decimal>,
    pub years: Option<i32>,
}

impl From<&Investment> for InvestmentResponse {
    fn from(i: &Investment) -> Self {
        Self {
            id: i.id,
            user: i.user_id,
            name: i.name.clone(),
            investment_type: i.investment_type.as_str().to_string(),
            amount_invested: i.amount_invested,
            current_value: i.current_value,
            date_invested: i.date_invested,
            interest_rate: i.interest_rate,
            years: i.years,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub financial_profile: Option<ProfileResponse>,
    pub incomes: Vec<IncomeResponse>,
    pub expenses: Vec<ExpenseResponse>,
    pub investments: Vec<InvestmentResponse>,
}

//=========================================================================================
// Advice
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct AdviceResponse {
    pub advice: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecommendationsResponse {
    pub recommendations: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoanAnalysisResponse {
    pub advice: String,
    pub emi: Decimal,
    pub total_emi: Decimal,
    /// Percent of monthly salary; null when no salary is recorded.
    pub dti_ratio: Option<Decimal>,
}

/// Documentation only; the handler validates the body field by field.
#[allow(dead_code)]
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
    /// Prior turns kept by the client; overrides the stored history when present.
    #[schema(value_type = Option<Vec<Object>>)]
    pub history: Option<Vec<ChatMessage>>,
    pub chat_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub response: String,
    pub status: &'static str,
    pub chat_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatHistoryResponse {
    pub id: i64,
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ChatHistory> for ChatHistoryResponse {
    fn from(h: &ChatHistory) -> Self {
        Self {
            id: h.id,
            messages: h.messages.clone(),
            created_at: h.created_at,
            updated_at: h.updated_at,
        }
    }
}

/// The stored form of a record as a JSON object, used as the base of a PATCH merge.
pub fn as_record<T: Serialize>(value: &T) -> serde_json::Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}
