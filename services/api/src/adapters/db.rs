//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Every finance-record statement carries `user_id = $owner` in its `WHERE`
//! clause, so a row owned by someone else is indistinguishable from a missing one.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use finance_core::domain::{
    ChatHistory, ChatMessage, Expense, FinancialProfile, Income, Investment, InvestmentType,
    NewExpense, NewFinancialProfile, NewIncome, NewInvestment, NewUser, RiskTolerance, TokenKind,
    User, UserCredentials, UserId, UserUpdate,
};
use finance_core::ports::{DatabaseService, PortError, PortResult};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Promotes an existing account to staff. Only used by the seed binary.
    pub async fn set_staff(&self, user_id: UserId, is_staff: bool) -> PortResult<()> {
        sqlx::query("UPDATE users SET is_staff = $2 WHERE id = $1")
            .bind(user_id)
            .bind(is_staff)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

fn not_found(what: &'static str) -> impl Fn(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what.to_string()),
        other => unexpected(other),
    }
}

fn expect_deleted(rows_affected: u64, what: &str) -> PortResult<()> {
    if rows_affected == 0 {
        Err(PortError::NotFound(what.to_string()))
    } else {
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, is_staff, is_active, date_joined";

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    is_staff: bool,
    is_active: bool,
    date_joined: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            is_staff: self.is_staff,
            is_active: self.is_active,
            date_joined: self.date_joined,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    #[sqlx(flatten)]
    user: UserRecord,
    hashed_password: String,
}

const PROFILE_COLUMNS: &str =
    "id, user_id, age, monthly_salary, monthly_savings, risk_tolerance, created_at";

#[derive(FromRow)]
struct ProfileRecord {
    id: i64,
    user_id: i64,
    age: i32,
    monthly_salary: i64,
    monthly_savings: i64,
    risk_tolerance: String,
    created_at: DateTime<Utc>,
}
impl ProfileRecord {
    fn to_domain(self) -> PortResult<FinancialProfile> {
        let risk_tolerance = self.risk_tolerance.parse::<RiskTolerance>().map_err(|_| {
            PortError::Unexpected(format!("Unknown risk tolerance '{}'", self.risk_tolerance))
        })?;
        Ok(FinancialProfile {
            id: self.id,
            user_id: self.user_id,
            age: self.age,
            monthly_salary: self.monthly_salary,
            monthly_savings: self.monthly_savings,
            risk_tolerance,
            created_at: self.created_at,
        })
    }
}

const INCOME_COLUMNS: &str = "id, user_id, source, amount, date_received";

#[derive(FromRow)]
struct IncomeRecord {
    id: i64,
    user_id: i64,
    source: String,
    amount: Decimal,
    date_received: NaiveDate,
}
impl IncomeRecord {
    fn to_domain(self) -> Income {
        Income {
            id: self.id,
            user_id: self.user_id,
            source: self.source,
            amount: self.amount,
            date_received: self.date_received,
        }
    }
}

const EXPENSE_COLUMNS: &str = "id, user_id, category, amount, date_spent";

#[derive(FromRow)]
struct ExpenseRecord {
    id: i64,
    user_id: i64,
    category: String,
    amount: Decimal,
    date_spent: NaiveDate,
}
impl ExpenseRecord {
    fn to_domain(self) -> Expense {
        Expense {
            id: self.id,
            user_id: self.user_id,
            category: self.category,
            amount: self.amount,
            date_spent: self.date_spent,
        }
    }
}

const INVESTMENT_COLUMNS: &str = "id, user_id, name, investment_type, amount_invested, \
     current_value, date_invested, interest_rate, years";

#[derive(FromRow)]
struct InvestmentRecord {
    id: i64,
    user_id: i64,
    name: String,
    investment_type: String,
    amount_invested: Decimal,
    current_value: Decimal,
    date_invested: NaiveDate,
    interest_rate: Option<Decimal>,
    years: Option<i32>,
}
impl InvestmentRecord {
    fn to_domain(self) -> PortResult<Investment> {
        let investment_type = self.investment_type.parse::<InvestmentType>().map_err(|_| {
            PortError::Unexpected(format!("Unknown investment type '{}'", self.investment_type))
        })?;
        Ok(Investment {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            investment_type,
            amount_invested: self.amount_invested,
            current_value: self.current_value,
            date_invested: self.date_invested,
            interest_rate: self.interest_rate,
            years: self.years,
        })
    }
}

const CHAT_COLUMNS: &str = "id, user_id, messages, created_at, updated_at";

#[derive(FromRow)]
struct ChatHistoryRecord {
    id: i64,
    user_id: i64,
    messages: Json<Vec<ChatMessage>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ChatHistoryRecord {
    fn to_domain(self) -> ChatHistory {
        ChatHistory {
            id: self.id,
            user_id: self.user_id,
            messages: self.messages.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- User Management ---
    async fn create_user(&self, new_user: &NewUser, hashed_password: &str) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, first_name, last_name, hashed_password) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.first_name)
            .bind(&new_user.last_name)
            .bind(hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    PortError::Conflict("A user with that username or email already exists.".into())
                } else {
                    unexpected(e)
                }
            })?;
        Ok(record.to_domain())
    }

    async fn username_taken(&self, username: &str) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn email_taken(&self, email: &str, exclude: Option<UserId>) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) \
             AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let sql = format!(
            "SELECT {}, hashed_password FROM users WHERE LOWER(username) = LOWER($1)",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, CredentialsRecord>(&sql)
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("User"))?;
        Ok(UserCredentials {
            user: record.user.to_domain(),
            hashed_password: record.hashed_password,
        })
    }

    async fn get_user(&self, user_id: UserId) -> PortResult<User> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("User"))?;
        Ok(record.to_domain())
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let records = sqlx::query_as::<_, UserRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_user(&self, user_id: UserId, update: &UserUpdate) -> PortResult<User> {
        let sql = format!(
            "UPDATE users SET email = $2, first_name = $3, last_name = $4 \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .bind(&update.email)
            .bind(&update.first_name)
            .bind(&update.last_name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    PortError::Conflict("A user with that email already exists.".into())
                } else {
                    not_found("User")(e)
                }
            })?;
        Ok(record.to_domain())
    }

    async fn delete_user(&self, user_id: UserId) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_deleted(result.rows_affected(), "User")
    }

    // --- Auth Tokens ---
    async fn create_auth_token(
        &self,
        token: &str,
        user_id: UserId,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO auth_tokens (token, user_id, kind, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(token)
        .bind(user_id)
        .bind(kind.as_str())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_token(&self, token: &str, kind: TokenKind) -> PortResult<User> {
        let sql = format!(
            "SELECT {} FROM users WHERE is_active AND id = (\
                 SELECT user_id FROM auth_tokens \
                 WHERE token = $1 AND kind = $2 AND expires_at > NOW())",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(token)
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or(PortError::Unauthorized)?;
        Ok(record.to_domain())
    }

    async fn revoke_auth_tokens(&self, user_id: UserId) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Financial Profile ---
    async fn get_profile_for_user(&self, owner: UserId) -> PortResult<Option<FinancialProfile>> {
        let sql = format!(
            "SELECT {} FROM financial_profiles WHERE user_id = $1",
            PROFILE_COLUMNS
        );
        sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(ProfileRecord::to_domain)
            .transpose()
    }

    async fn get_profile(&self, owner: UserId, profile_id: i64) -> PortResult<FinancialProfile> {
        let sql = format!(
            "SELECT {} FROM financial_profiles WHERE id = $1 AND user_id = $2",
            PROFILE_COLUMNS
        );
        sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(profile_id)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("Financial profile"))?
            .to_domain()
    }

    async fn create_profile(
        &self,
        owner: UserId,
        profile: &NewFinancialProfile,
    ) -> PortResult<FinancialProfile> {
        let sql = format!(
            "INSERT INTO financial_profiles (user_id, age, monthly_salary, monthly_savings, risk_tolerance) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            PROFILE_COLUMNS
        );
        sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(owner)
            .bind(profile.age)
            .bind(profile.monthly_salary)
            .bind(profile.monthly_savings)
            .bind(profile.risk_tolerance.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    PortError::Conflict("Financial profile already exists for this user.".into())
                } else {
                    unexpected(e)
                }
            })?
            .to_domain()
    }

    async fn update_profile(
        &self,
        owner: UserId,
        profile_id: i64,
        profile: &NewFinancialProfile,
    ) -> PortResult<FinancialProfile> {
        let sql = format!(
            "UPDATE financial_profiles SET age = $3, monthly_salary = $4, monthly_savings = $5, \
             risk_tolerance = $6 WHERE id = $1 AND user_id = $2 RETURNING {}",
            PROFILE_COLUMNS
        );
        sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(profile_id)
            .bind(owner)
            .bind(profile.age)
            .bind(profile.monthly_salary)
            .bind(profile.monthly_savings)
            .bind(profile.risk_tolerance.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("Financial profile"))?
            .to_domain()
    }

    async fn delete_profile(&self, owner: UserId, profile_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM financial_profiles WHERE id = $1 AND user_id = $2")
            .bind(profile_id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_deleted(result.rows_affected(), "Financial profile")
    }

    // --- Incomes ---
    async fn list_incomes(&self, owner: UserId) -> PortResult<Vec<Income>> {
        let sql = format!(
            "SELECT {} FROM incomes WHERE user_id = $1 ORDER BY id",
            INCOME_COLUMNS
        );
        let records = sqlx::query_as::<_, IncomeRecord>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_income(&self, owner: UserId, income_id: i64) -> PortResult<Income> {
        let sql = format!(
            "SELECT {} FROM incomes WHERE id = $1 AND user_id = $2",
            INCOME_COLUMNS
        );
        let record = sqlx::query_as::<_, IncomeRecord>(&sql)
            .bind(income_id)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("Income"))?;
        Ok(record.to_domain())
    }

    async fn create_incomes(
        &self,
        owner: UserId,
        incomes: &[NewIncome],
    ) -> PortResult<Vec<Income>> {
        let sql = format!(
            "INSERT INTO incomes (user_id, source, amount, date_received) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            INCOME_COLUMNS
        );
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut created = Vec::with_capacity(incomes.len());
        for income in incomes {
            let record = sqlx::query_as::<_, IncomeRecord>(&sql)
                .bind(owner)
                .bind(&income.source)
                .bind(income.amount)
                .bind(income.date_received)
                .fetch_one(&mut *tx)
                .await
                .map_err(unexpected)?;
            created.push(record.to_domain());
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(created)
    }

    async fn update_income(
        &self,
        owner: UserId,
        income_id: i64,
        income: &NewIncome,
    ) -> PortResult<Income> {
        let sql = format!(
            "UPDATE incomes SET source = $3, amount = $4, date_received = $5 \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            INCOME_COLUMNS
        );
        let record = sqlx::query_as::<_, IncomeRecord>(&sql)
            .bind(income_id)
            .bind(owner)
            .bind(&income.source)
            .bind(income.amount)
            .bind(income.date_received)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("Income"))?;
        Ok(record.to_domain())
    }

    async fn delete_income(&self, owner: UserId, income_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM incomes WHERE id = $1 AND user_id = $2")
            .bind(income_id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_deleted(result.rows_affected(), "Income")
    }

    // --- Expenses ---
    async fn list_expenses(&self, owner: UserId) -> PortResult<Vec<Expense>> {
        let sql = format!(
            "SELECT {} FROM expenses WHERE user_id = $1 ORDER BY id",
            EXPENSE_COLUMNS
        );
        let records = sqlx::query_as::<_, ExpenseRecord>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_expense(&self, owner: UserId, expense_id: i64) -> PortResult<Expense> {
        let sql = format!(
            "SELECT {} FROM expenses WHERE id = $1 AND user_id = $2",
            EXPENSE_COLUMNS
        );
        let record = sqlx::query_as::<_, ExpenseRecord>(&sql)
            .bind(expense_id)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("Expense"))?;
        Ok(record.to_domain())
    }

    async fn create_expenses(
        &self,
        owner: UserId,
        expenses: &[NewExpense],
    ) -> PortResult<Vec<Expense>> {
        let sql = format!(
            "INSERT INTO expenses (user_id, category, amount, date_spent) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            EXPENSE_COLUMNS
        );
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut created = Vec::with_capacity(expenses.len());
        for expense in expenses {
            let record = sqlx::query_as::<_, ExpenseRecord>(&sql)
                .bind(owner)
                .bind(&expense.category)
                .bind(expense.amount)
                .bind(expense.date_spent)
                .fetch_one(&mut *tx)
                .await
                .map_err(unexpected)?;
            created.push(record.to_domain());
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(created)
    }

    async fn update_expense(
        &self,
        owner: UserId,
        expense_id: i64,
        expense: &NewExpense,
    ) -> PortResult<Expense> {
        let sql = format!(
            "UPDATE expenses SET category = $3, amount = $4, date_spent = $5 \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            EXPENSE_COLUMNS
        );
        let record = sqlx::query_as::<_, ExpenseRecord>(&sql)
            .bind(expense_id)
            .bind(owner)
            .bind(&expense.category)
            .bind(expense.amount)
            .bind(expense.date_spent)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("Expense"))?;
        Ok(record.to_domain())
    }

    async fn delete_expense(&self, owner: UserId, expense_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
            .bind(expense_id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_deleted(result.rows_affected(), "Expense")
    }

    // --- Investments ---
    async fn list_investments(&self, owner: UserId) -> PortResult<Vec<Investment>> {
        let sql = format!(
            "SELECT {} FROM investments WHERE user_id = $1 ORDER BY id",
            INVESTMENT_COLUMNS
        );
        let records = sqlx::query_as::<_, InvestmentRecord>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(InvestmentRecord::to_domain).collect()
    }

    async fn get_investment(&self, owner: UserId, investment_id: i64) -> PortResult<Investment> {
        let sql = format!(
            "SELECT {} FROM investments WHERE id = $1 AND user_id = $2",
            INVESTMENT_COLUMNS
        );
        sqlx::query_as::<_, InvestmentRecord>(&sql)
            .bind(investment_id)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("Investment"))?
            .to_domain()
    }

    async fn create_investments(
        &self,
        owner: UserId,
        investments: &[NewInvestment],
    ) -> PortResult<Vec<Investment>> {
        let sql = format!(
            "INSERT INTO investments (user_id, name, investment_type, amount_invested, \
             current_value, date_invested, interest_rate, years) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            INVESTMENT_COLUMNS
        );
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut created = Vec::with_capacity(investments.len());
        for inv in investments {
            let record = sqlx::query_as::<_, InvestmentRecord>(&sql)
                .bind(owner)
                .bind(&inv.name)
                .bind(inv.investment_type.as_str())
                .bind(inv.amount_invested)
                .bind(inv.current_value)
                .bind(inv.date_invested)
                .bind(inv.interest_rate)
                .bind(inv.years)
                .fetch_one(&mut *tx)
                .await
                .map_err(unexpected)?;
            created.push(record.to_domain()?);
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(created)
    }

    async fn update_investment(
        &self,
        owner: UserId,
        investment_id: i64,
        investment: &NewInvestment,
    ) -> PortResult<Investment> {
        let sql = format!(
            "UPDATE investments SET name = $3, investment_type = $4, amount_invested = $5, \
             current_value = $6, date_invested = $7, interest_rate = $8, years = $9 \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            INVESTMENT_COLUMNS
        );
        sqlx::query_as::<_, InvestmentRecord>(&sql)
            .bind(investment_id)
            .bind(owner)
            .bind(&investment.name)
            .bind(investment.investment_type.as_str())
            .bind(investment.amount_invested)
            .bind(investment.current_value)
            .bind(investment.date_invested)
            .bind(investment.interest_rate)
            .bind(investment.years)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("Investment"))?
            .to_domain()
    }

    async fn delete_investment(&self, owner: UserId, investment_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM investments WHERE id = $1 AND user_id = $2")
            .bind(investment_id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_deleted(result.rows_affected(), "Investment")
    }

    // --- Chat History ---
    async fn list_chat_histories(&self, owner: UserId) -> PortResult<Vec<ChatHistory>> {
        let sql = format!(
            "SELECT {} FROM chat_histories WHERE user_id = $1 ORDER BY updated_at DESC, id DESC",
            CHAT_COLUMNS
        );
        let records = sqlx::query_as::<_, ChatHistoryRecord>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_chat_history(&self, owner: UserId, chat_id: i64) -> PortResult<ChatHistory> {
        let sql = format!(
            "SELECT {} FROM chat_histories WHERE id = $1 AND user_id = $2",
            CHAT_COLUMNS
        );
        let record = sqlx::query_as::<_, ChatHistoryRecord>(&sql)
            .bind(chat_id)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("Chat history"))?;
        Ok(record.to_domain())
    }

    async fn create_chat_history(&self, owner: UserId) -> PortResult<ChatHistory> {
        let sql = format!(
            "INSERT INTO chat_histories (user_id) VALUES ($1) RETURNING {}",
            CHAT_COLUMNS
        );
        let record = sqlx::query_as::<_, ChatHistoryRecord>(&sql)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn append_chat_messages(
        &self,
        owner: UserId,
        chat_id: i64,
        messages: &[ChatMessage],
    ) -> PortResult<ChatHistory> {
        // Concatenation happens inside one UPDATE, so the row lock serialises appends.
        let sql = format!(
            "UPDATE chat_histories SET messages = messages || $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            CHAT_COLUMNS
        );
        let record = sqlx::query_as::<_, ChatHistoryRecord>(&sql)
            .bind(chat_id)
            .bind(owner)
            .bind(Json(messages))
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("Chat history"))?;
        Ok(record.to_domain())
    }

    async fn delete_chat_history(&self, owner: UserId, chat_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM chat_histories WHERE id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_deleted(result.rows_affected(), "Chat history")
    }
}
