//! crates/finance_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or HTTP representation.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable integer identity of a registered user.
pub type UserId = i64;

//=========================================================================================
// Users and Credentials
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

/// A validated registration, minus the password which never leaves the auth handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// The mutable part of a user identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpdate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Distinguishes short-lived bearer tokens from the long-lived ones used to mint them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

//=========================================================================================
// Financial Profile
//=========================================================================================

/// Coarse appetite for risk, used to tailor every piece of advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl RiskTolerance {
    pub const ALLOWED: [&'static str; 3] = ["low", "medium", "high"];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTolerance::Low => "low",
            RiskTolerance::Medium => "medium",
            RiskTolerance::High => "high",
        }
    }
}

impl FromStr for RiskTolerance {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(RiskTolerance::Low),
            "medium" => Ok(RiskTolerance::Medium),
            "high" => Ok(RiskTolerance::High),
            _ => Err(()),
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinancialProfile {
    pub id: i64,
    pub user_id: UserId,
    pub age: i32,
    pub monthly_salary: i64,
    pub monthly_savings: i64,
    pub risk_tolerance: RiskTolerance,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFinancialProfile {
    pub age: i32,
    pub monthly_salary: i64,
    pub monthly_savings: i64,
    pub risk_tolerance: RiskTolerance,
}

//=========================================================================================
// Ledger Entries
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Income {
    pub id: i64,
    pub user_id: UserId,
    pub source: String,
    pub amount: Decimal,
    pub date_received: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIncome {
    pub source: String,
    pub amount: Decimal,
    pub date_received: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expense {
    pub id: i64,
    pub user_id: UserId,
    pub category: String,
    pub amount: Decimal,
    pub date_spent: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub category: String,
    pub amount: Decimal,
    pub date_spent: NaiveDate,
}

//=========================================================================================
// Investments
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvestmentType {
    Stocks,
    MutualFunds,
    Sip,
    Fd,
    Gold,
}

impl InvestmentType {
    pub const ALLOWED: [&'static str; 5] = ["stocks", "mutual_funds", "sip", "fd", "gold"];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentType::Stocks => "stocks",
            InvestmentType::MutualFunds => "mutual_funds",
            InvestmentType::Sip => "sip",
            InvestmentType::Fd => "fd",
            InvestmentType::Gold => "gold",
        }
    }

    /// SIPs and fixed deposits carry a rate and a term; the others do not.
    pub fn requires_rate_and_term(&self) -> bool {
        matches!(self, InvestmentType::Sip | InvestmentType::Fd)
    }
}

impl FromStr for InvestmentType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stocks" => Ok(InvestmentType::Stocks),
            "mutual_funds" => Ok(InvestmentType::MutualFunds),
            "sip" => Ok(InvestmentType::Sip),
            "fd" => Ok(InvestmentType::Fd),
            "gold" => Ok(InvestmentType::Gold),
            _ => Err(()),
        }
    }
}

impl fmt::Display for InvestmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Investment {
    pub id: i64,
    pub user_id: UserId,
    pub name: String,
    pub investment_type: InvestmentType,
    pub amount_invested: Decimal,
    pub current_value: Decimal,
    pub date_invested: NaiveDate,
    pub interest_rate: Option<Decimal>,
    pub years: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvestment {
    pub name: String,
    pub investment_type: InvestmentType,
    pub amount_invested: Decimal,
    pub current_value: Decimal,
    pub date_invested: NaiveDate,
    pub interest_rate: Option<Decimal>,
    pub years: Option<i32>,
}

//=========================================================================================
// Conversation
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn of a conversation with the advice model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// A chat request after validation. `history`, when sent, stands in for the stored turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub message: String,
    pub history: Option<Vec<ChatMessage>>,
    pub chat_id: Option<i64>,
}

/// A persisted advice-chat session. Listings order these most-recently-updated first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHistory {
    pub id: i64,
    pub user_id: UserId,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//=========================================================================================
// Loan Analysis
//=========================================================================================

/// Terms of a prospective loan submitted for affordability analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanTerms {
    pub loan_type: Option<String>,
    pub principal: Decimal,
    pub annual_rate: Decimal,
    pub tenure_years: i32,
    pub existing_emi: Decimal,
}
