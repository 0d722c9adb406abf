//! Shared harness for the HTTP tests: an in-memory `DatabaseService`, a canned
//! `AdviceService`, and helpers that drive the real router with `oneshot`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_lib::config::Config;
use api_lib::web::{build_router, state::AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use finance_core::domain::{
    ChatHistory, ChatMessage, Expense, FinancialProfile, Income, Investment, NewExpense,
    NewFinancialProfile, NewIncome, NewInvestment, NewUser, TokenKind, User, UserCredentials,
    UserId, UserUpdate,
};
use finance_core::ports::{AdviceService, DatabaseService, PortError, PortResult};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const PASSWORD: &str = "StrongPass123!";

//=========================================================================================
// In-memory storage
//=========================================================================================

trait Owned {
    fn id(&self) -> i64;
    fn owner(&self) -> UserId;
}

macro_rules! owned {
    ($($ty:ty),*) => {
        $(impl Owned for $ty {
            fn id(&self) -> i64 { self.id }
            fn owner(&self) -> UserId { self.user_id }
        })*
    };
}

owned!(FinancialProfile, Income, Expense, Investment, ChatHistory);

fn find<T: Owned + Clone>(rows: &[T], owner: UserId, id: i64, what: &str) -> PortResult<T> {
    rows.iter()
        .find(|row| row.id() == id && row.owner() == owner)
        .cloned()
        .ok_or_else(|| PortError::NotFound(what.to_string()))
}

fn find_mut<'a, T: Owned>(
    rows: &'a mut [T],
    owner: UserId,
    id: i64,
    what: &str,
) -> PortResult<&'a mut T> {
    rows.iter_mut()
        .find(|row| row.id() == id && row.owner() == owner)
        .ok_or_else(|| PortError::NotFound(what.to_string()))
}

fn remove<T: Owned>(rows: &mut Vec<T>, owner: UserId, id: i64, what: &str) -> PortResult<()> {
    let before = rows.len();
    rows.retain(|row| !(row.id() == id && row.owner() == owner));
    if rows.len() == before {
        Err(PortError::NotFound(what.to_string()))
    } else {
        Ok(())
    }
}

fn owned_by<T: Owned + Clone>(rows: &[T], owner: UserId) -> Vec<T> {
    rows.iter().filter(|row| row.owner() == owner).cloned().collect()
}

#[derive(Default)]
struct Store {
    last_id: i64,
    users: Vec<UserCredentials>,
    tokens: HashMap<String, (UserId, TokenKind, DateTime<Utc>)>,
    profiles: Vec<FinancialProfile>,
    incomes: Vec<Income>,
    expenses: Vec<Expense>,
    investments: Vec<Investment>,
    chats: Vec<ChatHistory>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Mirrors the Postgres adapter's contract: case-insensitive identities,
/// owner scoping, all-or-nothing batches.
#[derive(Default)]
pub struct MemoryDb {
    store: Mutex<Store>,
}

impl MemoryDb {
    pub fn set_staff(&self, user_id: UserId) {
        let mut store = self.store.lock().unwrap();
        if let Some(row) = store.users.iter_mut().find(|c| c.user.id == user_id) {
            row.user.is_staff = true;
        }
    }

    pub fn income_count(&self) -> usize {
        self.store.lock().unwrap().incomes.len()
    }
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn create_user(&self, new_user: &NewUser, hashed_password: &str) -> PortResult<User> {
        let mut store = self.store.lock().unwrap();
        let taken = store
            .users
            .iter()
            .any(|c| c.user.username.eq_ignore_ascii_case(&new_user.username));
        if taken {
            return Err(PortError::Conflict("username".to_string()));
        }
        let user = User {
            id: store.next_id(),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            is_staff: false,
            is_active: true,
            date_joined: Utc::now(),
        };
        store.users.push(UserCredentials {
            user: user.clone(),
            hashed_password: hashed_password.to_string(),
        });
        Ok(user)
    }

    async fn username_taken(&self, username: &str) -> PortResult<bool> {
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .iter()
            .any(|c| c.user.username.eq_ignore_ascii_case(username)))
    }

    async fn email_taken(&self, email: &str, exclude: Option<UserId>) -> PortResult<bool> {
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .iter()
            .any(|c| c.user.email.eq_ignore_ascii_case(email) && Some(c.user.id) != exclude))
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let store = self.store.lock().unwrap();
        store
            .users
            .iter()
            .find(|c| c.user.username.eq_ignore_ascii_case(username))
            .cloned()
            .ok_or_else(|| PortError::NotFound("User".to_string()))
    }

    async fn get_user(&self, user_id: UserId) -> PortResult<User> {
        let store = self.store.lock().unwrap();
        store
            .users
            .iter()
            .find(|c| c.user.id == user_id)
            .map(|c| c.user.clone())
            .ok_or_else(|| PortError::NotFound("User".to_string()))
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().map(|c| c.user.clone()).collect())
    }

    async fn update_user(&self, user_id: UserId, update: &UserUpdate) -> PortResult<User> {
        let mut store = self.store.lock().unwrap();
        let row = store
            .users
            .iter_mut()
            .find(|c| c.user.id == user_id)
            .ok_or_else(|| PortError::NotFound("User".to_string()))?;
        row.user.email = update.email.clone();
        row.user.first_name = update.first_name.clone();
        row.user.last_name = update.last_name.clone();
        Ok(row.user.clone())
    }

    async fn delete_user(&self, user_id: UserId) -> PortResult<()> {
        let mut store = self.store.lock().unwrap();
        let before = store.users.len();
        store.users.retain(|c| c.user.id != user_id);
        if store.users.len() == before {
            return Err(PortError::NotFound("User".to_string()));
        }
        store.tokens.retain(|_, (owner, _, _)| *owner != user_id);
        store.profiles.retain(|row| row.user_id != user_id);
        store.incomes.retain(|row| row.user_id != user_id);
        store.expenses.retain(|row| row.user_id != user_id);
        store.investments.retain(|row| row.user_id != user_id);
        store.chats.retain(|row| row.user_id != user_id);
        Ok(())
    }

    async fn create_auth_token(
        &self,
        token: &str,
        user_id: UserId,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut store = self.store.lock().unwrap();
        store
            .tokens
            .insert(token.to_string(), (user_id, kind, expires_at));
        Ok(())
    }

    async fn validate_auth_token(&self, token: &str, kind: TokenKind) -> PortResult<User> {
        let store = self.store.lock().unwrap();
        let (user_id, stored_kind, expires_at) =
            *store.tokens.get(token).ok_or(PortError::Unauthorized)?;
        if stored_kind != kind || expires_at <= Utc::now() {
            return Err(PortError::Unauthorized);
        }
        store
            .users
            .iter()
            .find(|c| c.user.id == user_id && c.user.is_active)
            .map(|c| c.user.clone())
            .ok_or(PortError::Unauthorized)
    }

    async fn revoke_auth_tokens(&self, user_id: UserId) -> PortResult<()> {
        let mut store = self.store.lock().unwrap();
        store.tokens.retain(|_, (owner, _, _)| *owner != user_id);
        Ok(())
    }

    async fn get_profile_for_user(&self, owner: UserId) -> PortResult<Option<FinancialProfile>> {
        let store = self.store.lock().unwrap();
        Ok(store.profiles.iter().find(|p| p.user_id == owner).cloned())
    }

    async fn get_profile(&self, owner: UserId, profile_id: i64) -> PortResult<FinancialProfile> {
        let store = self.store.lock().unwrap();
        find(&store.profiles, owner, profile_id, "Financial profile")
    }

    async fn create_profile(
        &self,
        owner: UserId,
        profile: &NewFinancialProfile,
    ) -> PortResult<FinancialProfile> {
        let mut store = self.store.lock().unwrap();
        if store.profiles.iter().any(|p| p.user_id == owner) {
            return Err(PortError::Conflict(
                "Financial profile already exists for this user.".to_string(),
            ));
        }
        let row = FinancialProfile {
            id: store.next_id(),
            user_id: owner,
            age: profile.age,
            monthly_salary: profile.monthly_salary,
            monthly_savings: profile.monthly_savings,
            risk_tolerance: profile.risk_tolerance,
            created_at: Utc::now(),
        };
        store.profiles.push(row.clone());
        Ok(row)
    }

    async fn update_profile(
        &self,
        owner: UserId,
        profile_id: i64,
        profile: &NewFinancialProfile,
    ) -> PortResult<FinancialProfile> {
        let mut store = self.store.lock().unwrap();
        let row = find_mut(&mut store.profiles, owner, profile_id, "Financial profile")?;
        row.age = profile.age;
        row.monthly_salary = profile.monthly_salary;
        row.monthly_savings = profile.monthly_savings;
        row.risk_tolerance = profile.risk_tolerance;
        Ok(row.clone())
    }

    async fn delete_profile(&self, owner: UserId, profile_id: i64) -> PortResult<()> {
        let mut store = self.store.lock().unwrap();
        remove(&mut store.profiles, owner, profile_id, "Financial profile")
    }

    async fn list_incomes(&self, owner: UserId) -> PortResult<Vec<Income>> {
        Ok(owned_by(&self.store.lock().unwrap().incomes, owner))
    }

    async fn get_income(&self, owner: UserId, income_id: i64) -> PortResult<Income> {
        find(&self.store.lock().unwrap().incomes, owner, income_id, "Income")
    }

    async fn create_incomes(
        &self,
        owner: UserId,
        incomes: &[NewIncome],
    ) -> PortResult<Vec<Income>> {
        let mut store = self.store.lock().unwrap();
        let mut created = Vec::with_capacity(incomes.len());
        for draft in incomes {
            let row = Income {
                id: store.next_id(),
                user_id: owner,
                source: draft.source.clone(),
                amount: draft.amount,
                date_received: draft.date_received,
            };
            store.incomes.push(row.clone());
            created.push(row);
        }
        Ok(created)
    }

    async fn update_income(
        &self,
        owner: UserId,
        income_id: i64,
        income: &NewIncome,
    ) -> PortResult<Income> {
        let mut store = self.store.lock().unwrap();
        let row = find_mut(&mut store.incomes, owner, income_id, "Income")?;
        row.source = income.source.clone();
        row.amount = income.amount;
        row.date_received = income.date_received;
        Ok(row.clone())
    }

    async fn delete_income(&self, owner: UserId, income_id: i64) -> PortResult<()> {
        remove(&mut self.store.lock().unwrap().incomes, owner, income_id, "Income")
    }

    async fn list_expenses(&self, owner: UserId) -> PortResult<Vec<Expense>> {
        Ok(owned_by(&self.store.lock().unwrap().expenses, owner))
    }

    async fn get_expense(&self, owner: UserId, expense_id: i64) -> PortResult<Expense> {
        find(&self.store.lock().unwrap().expenses, owner, expense_id, "Expense")
    }

    async fn create_expenses(
        &self,
        owner: UserId,
        expenses: &[NewExpense],
    ) -> PortResult<Vec<Expense>> {
        let mut store = self.store.lock().unwrap();
        let mut created = Vec::with_capacity(expenses.len());
        for draft in expenses {
            let row = Expense {
                id: store.next_id(),
                user_id: owner,
                category: draft.category.clone(),
                amount: draft.amount,
                date_spent: draft.date_spent,
            };
            store.expenses.push(row.clone());
            created.push(row);
        }
        Ok(created)
    }

    async fn update_expense(
        &self,
        owner: UserId,
        expense_id: i64,
        expense: &NewExpense,
    ) -> PortResult<Expense> {
        let mut store = self.store.lock().unwrap();
        let row = find_mut(&mut store.expenses, owner, expense_id, "Expense")?;
        row.category = expense.category.clone();
        row.amount = expense.amount;
        row.date_spent = expense.date_spent;
        Ok(row.clone())
    }

    async fn delete_expense(&self, owner: UserId, expense_id: i64) -> PortResult<()> {
        remove(&mut self.store.lock().unwrap().expenses, owner, expense_id, "Expense")
    }

    async fn list_investments(&self, owner: UserId) -> PortResult<Vec<Investment>> {
        Ok(owned_by(&self.store.lock().unwrap().investments, owner))
    }

    async fn get_investment(&self, owner: UserId, investment_id: i64) -> PortResult<Investment> {
        find(&self.store.lock().unwrap().investments, owner, investment_id, "Investment")
    }

    async fn create_investments(
        &self,
        owner: UserId,
        investments: &[NewInvestment],
    ) -> PortResult<Vec<Investment>> {
        let mut store = self.store.lock().unwrap();
        let mut created = Vec::with_capacity(investments.len());
        for draft in investments {
            let row = Investment {
                id: store.next_id(),
                user_id: owner,
                name: draft.name.clone(),
                investment_type: draft.investment_type,
                amount_invested: draft.amount_invested,
                current_value: draft.current_value,
                date_invested: draft.date_invested,
                interest_rate: draft.interest_rate,
                years: draft.years,
            };
            store.investments.push(row.clone());
            created.push(row);
        }
        Ok(created)
    }

    async fn update_investment(
        &self,
        owner: UserId,
        investment_id: i64,
        investment: &NewInvestment,
    ) -> PortResult<Investment> {
        let mut store = self.store.lock().unwrap();
        let row = find_mut(&mut store.investments, owner, investment_id, "Investment")?;
        row.name = investment.name.clone();
        row.investment_type = investment.investment_type;
        row.amount_invested = investment.amount_invested;
        row.current_value = investment.current_value;
        row.date_invested = investment.date_invested;
        row.interest_rate = investment.interest_rate;
        row.years = investment.years;
        Ok(row.clone())
    }

    async fn delete_investment(&self, owner: UserId, investment_id: i64) -> PortResult<()> {
        remove(
            &mut self.store.lock().unwrap().investments,
            owner,
            investment_id,
            "Investment",
        )
    }

    async fn list_chat_histories(&self, owner: UserId) -> PortResult<Vec<ChatHistory>> {
        let mut chats = owned_by(&self.store.lock().unwrap().chats, owner);
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(chats)
    }

    async fn get_chat_history(&self, owner: UserId, chat_id: i64) -> PortResult<ChatHistory> {
        find(&self.store.lock().unwrap().chats, owner, chat_id, "Chat history")
    }

    async fn create_chat_history(&self, owner: UserId) -> PortResult<ChatHistory> {
        let mut store = self.store.lock().unwrap();
        let now = Utc::now();
        let row = ChatHistory {
            id: store.next_id(),
            user_id: owner,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        store.chats.push(row.clone());
        Ok(row)
    }

    async fn append_chat_messages(
        &self,
        owner: UserId,
        chat_id: i64,
        messages: &[ChatMessage],
    ) -> PortResult<ChatHistory> {
        let mut store = self.store.lock().unwrap();
        let row = find_mut(&mut store.chats, owner, chat_id, "Chat history")?;
        row.messages.extend_from_slice(messages);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_chat_history(&self, owner: UserId, chat_id: i64) -> PortResult<()> {
        remove(&mut self.store.lock().unwrap().chats, owner, chat_id, "Chat history")
    }
}

//=========================================================================================
// Canned advice
//=========================================================================================

/// Answers every completion with the same text and remembers what it was asked.
pub struct StubAdvice {
    reply: String,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<ChatMessage>>,
}

impl StubAdvice {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl AdviceService for StubAdvice {
    async fn complete(&self, messages: &[ChatMessage]) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();
        Ok(self.reply.clone())
    }
}

//=========================================================================================
// Application harness
//=========================================================================================

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: String::new(),
        log_level: tracing::Level::INFO,
        cors_allowed_origin: "http://localhost:5173".to_string(),
        advice_api_key: None,
        advice_api_base: "http://localhost:9/v1".to_string(),
        advice_model: "test-model".to_string(),
        advice_temperature: 0.7,
        advice_timeout: Duration::from_secs(5),
        access_token_ttl: chrono::Duration::minutes(60),
        refresh_token_ttl: chrono::Duration::days(7),
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<MemoryDb>,
    pub advice: Arc<StubAdvice>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_reply("1. Build an emergency fund covering six months of expenses.")
    }

    pub fn with_reply(reply: &str) -> Self {
        let db = Arc::new(MemoryDb::default());
        let advice = Arc::new(StubAdvice::new(reply));
        let state = Arc::new(AppState {
            db: db.clone(),
            config: Arc::new(test_config()),
            advice: advice.clone(),
        });
        Self {
            router: build_router(state),
            db,
            advice,
        }
    }

    /// Sends one request and returns the status and the decoded JSON body
    /// (`Value::Null` for an empty body).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers `username` and returns the full auth response.
    pub async fn register(&self, username: &str) -> Value {
        let (status, body) = self
            .send(Method::POST, "/auth/register/", None, Some(registration(username)))
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body
    }

    /// Registers `username` and returns its access token.
    pub async fn access_token(&self, username: &str) -> String {
        let body = self.register(username).await;
        body["tokens"]["access"].as_str().unwrap().to_string()
    }

    /// Registers `username` with a profile (salary 50000, savings 10000, medium risk).
    pub async fn user_with_profile(&self, username: &str) -> String {
        let token = self.access_token(username).await;
        let (status, body) = self
            .post(
                "/profile/create/",
                &token,
                json!({
                    "age": 30,
                    "monthly_salary": 50000,
                    "monthly_savings": 10000,
                    "risk_tolerance": "medium"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "profile failed: {}", body);
        token
    }
}

pub fn registration(username: &str) -> Value {
    json!({
        "username": username,
        "password": PASSWORD,
        "password2": PASSWORD,
        "email": format!("{}@example.com", username),
        "first_name": "Test",
        "last_name": "User"
    })
}
