//! crates/finance_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.
//!
//! Every finance-record operation takes the owner explicitly. Implementations must
//! scope reads and writes to that owner, and report a record owned by someone else
//! exactly like a missing one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    ChatHistory, ChatMessage, Expense, FinancialProfile, Income, Investment, NewExpense,
    NewFinancialProfile, NewIncome, NewInvestment, NewUser, TokenKind, User, UserCredentials,
    UserId, UserUpdate,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// The remote service answered, but with nothing usable.
    #[error("Upstream returned an invalid response: {0}")]
    Upstream(String),
    /// The remote service could not be reached in time, or at all.
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user(&self, new_user: &NewUser, hashed_password: &str) -> PortResult<User>;

    /// Case-insensitive.
    async fn username_taken(&self, username: &str) -> PortResult<bool>;

    /// Case-insensitive; `exclude` skips the caller's own row on update.
    async fn email_taken(&self, email: &str, exclude: Option<UserId>) -> PortResult<bool>;

    /// Case-insensitive lookup used by login.
    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    async fn get_user(&self, user_id: UserId) -> PortResult<User>;

    async fn list_users(&self) -> PortResult<Vec<User>>;

    async fn update_user(&self, user_id: UserId, update: &UserUpdate) -> PortResult<User>;

    /// Removes the user and, by cascade, everything they own.
    async fn delete_user(&self, user_id: UserId) -> PortResult<()>;

    // --- Auth Tokens ---
    async fn create_auth_token(
        &self,
        token: &str,
        user_id: UserId,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves an unexpired token of the given kind to its active user.
    async fn validate_auth_token(&self, token: &str, kind: TokenKind) -> PortResult<User>;

    async fn revoke_auth_tokens(&self, user_id: UserId) -> PortResult<()>;

    // --- Financial Profile ---
    async fn get_profile_for_user(&self, owner: UserId) -> PortResult<Option<FinancialProfile>>;

    async fn get_profile(&self, owner: UserId, profile_id: i64) -> PortResult<FinancialProfile>;

    /// Fails with `Conflict` when the owner already has a profile.
    async fn create_profile(
        &self,
        owner: UserId,
        profile: &NewFinancialProfile,
    ) -> PortResult<FinancialProfile>;

    async fn update_profile(
        &self,
        owner: UserId,
        profile_id: i64,
        profile: &NewFinancialProfile,
    ) -> PortResult<FinancialProfile>;

    async fn delete_profile(&self, owner: UserId, profile_id: i64) -> PortResult<()>;

    // --- Incomes ---
    async fn list_incomes(&self, owner: UserId) -> PortResult<Vec<Income>>;

    async fn get_income(&self, owner: UserId, income_id: i64) -> PortResult<Income>;

    /// All-or-nothing: either every entry is stored or none is.
    async fn create_incomes(&self, owner: UserId, incomes: &[NewIncome]) -> PortResult<Vec<Income>>;

    async fn update_income(
        &self,
        owner: UserId,
        income_id: i64,
        income: &NewIncome,
    ) -> PortResult<Income>;

    async fn delete_income(&self, owner: UserId, income_id: i64) -> PortResult<()>;

    // --- Expenses ---
    async fn list_expenses(&self, owner: UserId) -> PortResult<Vec<Expense>>;

    async fn get_expense(&self, owner: UserId, expense_id: i64) -> PortResult<Expense>;

    async fn create_expenses(
        &self,
        owner: UserId,
        expenses: &[NewExpense],
    ) -> PortResult<Vec<Expense>>;

    async fn update_expense(
        &self,
        owner: UserId,
        expense_id: i64,
        expense: &NewExpense,
    ) -> PortResult<Expense>;

    async fn delete_expense(&self, owner: UserId, expense_id: i64) -> PortResult<()>;

    // --- Investments ---
    async fn list_investments(&self, owner: UserId) -> PortResult<Vec<Investment>>;

    async fn get_investment(&self, owner: UserId, investment_id: i64) -> PortResult<Investment>;

    async fn create_investments(
        &self,
        owner: UserId,
        investments: &[NewInvestment],
    ) -> PortResult<Vec<Investment>>;

    async fn update_investment(
        &self,
        owner: UserId,
        investment_id: i64,
        investment: &NewInvestment,
    ) -> PortResult<Investment>;

    async fn delete_investment(&self, owner: UserId, investment_id: i64) -> PortResult<()>;

    // --- Chat History ---
    /// Most recently updated first.
    async fn list_chat_histories(&self, owner: UserId) -> PortResult<Vec<ChatHistory>>;

    async fn get_chat_history(&self, owner: UserId, chat_id: i64) -> PortResult<ChatHistory>;

    async fn create_chat_history(&self, owner: UserId) -> PortResult<ChatHistory>;

    /// Appends turns in a single atomic write, so concurrent appends never drop each other.
    async fn append_chat_messages(
        &self,
        owner: UserId,
        chat_id: i64,
        messages: &[ChatMessage],
    ) -> PortResult<ChatHistory>;

    async fn delete_chat_history(&self, owner: UserId, chat_id: i64) -> PortResult<()>;
}

#[async_trait]
pub trait AdviceService: Send + Sync {
    /// Sends an ordered conversation to the remote model and returns its reply text.
    async fn complete(&self, messages: &[ChatMessage]) -> PortResult<String>;
}
