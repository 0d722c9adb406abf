//! services/api/src/web/ledger.rs
//!
//! Owner-scoped CRUD for the three ledgers (incomes, expenses, investments).
//! The handlers are generic over `Ledger`, so every ledger shares the same
//! batch, merge and not-found semantics.

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use finance_core::domain::{
    Expense, Income, Investment, NewExpense, NewIncome, NewInvestment, UserId,
};
use finance_core::ports::{DatabaseService, PortResult};
use finance_core::validation::{expect_record, merge_records, validate_submission, Validate};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::web::dto::{as_record, ExpenseResponse, IncomeResponse, InvestmentResponse};
use crate::web::state::{AppState, AuthUser};

/// One kind of owned ledger entry and the port calls that store it.
#[async_trait]
pub trait Ledger: Send + Sync + 'static {
    /// Used in log lines.
    const NAME: &'static str;

    type Entry: Send + Sync;
    type Draft: Validate + Send + Sync;
    type Body: Serialize + Send;

    fn to_body(entry: &Self::Entry) -> Self::Body;

    async fn list(db: &dyn DatabaseService, owner: UserId) -> PortResult<Vec<Self::Entry>>;

    async fn fetch(db: &dyn DatabaseService, owner: UserId, id: i64) -> PortResult<Self::Entry>;

    async fn insert(
        db: &dyn DatabaseService,
        owner: UserId,
        drafts: &[Self::Draft],
    ) -> PortResult<Vec<Self::Entry>>;

    async fn update(
        db: &dyn DatabaseService,
        owner: UserId,
        id: i64,
        draft: &Self::Draft,
    ) -> PortResult<Self::Entry>;

    async fn remove(db: &dyn DatabaseService, owner: UserId, id: i64) -> PortResult<()>;
}

pub struct Incomes;
pub struct Expenses;
pub struct Investments;

#[async_trait]
impl Ledger for Incomes {
    const NAME: &'static str = "income";
    type Entry = Income;
    type Draft = NewIncome;
    type Body = IncomeResponse;

    fn to_body(entry: &Income) -> IncomeResponse {
        IncomeResponse::from(entry)
    }

    async fn list(db: &dyn DatabaseService, owner: UserId) -> PortResult<Vec<Income>> {
        db.list_incomes(owner).await
    }

    async fn fetch(db: &dyn DatabaseService, owner: UserId, id: i64) -> PortResult<Income> {
        db.get_income(owner, id).await
    }

    async fn insert(
        db: &dyn DatabaseService,
        owner: UserId,
        drafts: &[NewIncome],
    ) -> PortResult<Vec<Income>> {
        db.create_incomes(owner, drafts).await
    }

    async fn update(
        db: &dyn DatabaseService,
        owner: UserId,
        id: i64,
        draft: &NewIncome,
    ) -> PortResult<Income> {
        db.update_income(owner, id, draft).await
    }

    async fn remove(db: &dyn DatabaseService, owner: UserId, id: i64) -> PortResult<()> {
        db.delete_income(owner, id).await
    }
}

#[async_trait]
impl Ledger for Expenses {
    const NAME: &'static str = "expense";
    type Entry = Expense;
    type Draft = NewExpense;
    type Body = ExpenseResponse;

    fn to_body(entry: &Expense) -> ExpenseResponse {
        ExpenseResponse::from(entry)
    }

    async fn list(db: &dyn DatabaseService, owner: UserId) -> PortResult<Vec<Expense>> {
        db.list_expenses(owner).await
    }

    async fn fetch(db: &dyn DatabaseService, owner: UserId, id: i64) -> PortResult<Expense> {
        db.get_expense(owner, id).await
    }

    async fn insert(
        db: &dyn DatabaseService,
        owner: UserId,
        drafts: &[NewExpense],
    ) -> PortResult<Vec<Expense>> {
        db.create_expenses(owner, drafts).await
    }

    async fn update(
        db: &dyn DatabaseService,
        owner: UserId,
        id: i64,
        draft: &NewExpense,
    ) -> PortResult<Expense> {
        db.update_expense(owner, id, draft).await
    }

    async fn remove(db: &dyn DatabaseService, owner: UserId, id: i64) -> PortResult<()> {
        db.delete_expense(owner, id).await
    }
}

#[async_trait]
impl Ledger for Investments {
    const NAME: &'static str = "investment";
    type Entry = Investment;
    type Draft = NewInvestment;
    type Body = InvestmentResponse;

    fn to_body(entry: &Investment) -> InvestmentResponse {
        InvestmentResponse::from(entry)
    }

    async fn list(db: &dyn DatabaseService, owner: UserId) -> PortResult<Vec<Investment>> {
        db.list_investments(owner).await
    }

    async fn fetch(db: &dyn DatabaseService, owner: UserId, id: i64) -> PortResult<Investment> {
        db.get_investment(owner, id).await
    }

    async fn insert(
        db: &dyn DatabaseService,
        owner: UserId,
        drafts: &[NewInvestment],
    ) -> PortResult<Vec<Investment>> {
        db.create_investments(owner, drafts).await
    }

    async fn update(
        db: &dyn DatabaseService,
        owner: UserId,
        id: i64,
        draft: &NewInvestment,
    ) -> PortResult<Investment> {
        db.update_investment(owner, id, draft).await
    }

    async fn remove(db: &dyn DatabaseService, owner: UserId, id: i64) -> PortResult<()> {
        db.delete_investment(owner, id).await
    }
}

/// A create answers with an object for an object and a list for a list.
#[derive(Serialize)]
#[serde(untagged)]
pub enum Created<T> {
    One(T),
    Many(Vec<T>),
}

//=========================================================================================
// Handlers
//=========================================================================================

pub async fn list_entries<L: Ledger>(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Vec<L::Body>>, ApiError> {
    let entries = L::list(state.db.as_ref(), caller.id).await?;
    Ok(Json(entries.iter().map(L::to_body).collect()))
}

/// Accepts one object or a non-empty list; a list is stored all-or-nothing.
pub async fn create_entries<L: Ledger>(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Created<L::Body>>), ApiError> {
    let submission = validate_submission::<L::Draft>(&body, state.today())?;
    let is_batch = submission.is_batch();
    let drafts = submission.into_vec();

    let created = L::insert(state.db.as_ref(), caller.id, &drafts).await?;
    info!("Created {} {} entries", created.len(), L::NAME);

    let mut bodies: Vec<L::Body> = created.iter().map(L::to_body).collect();
    let payload = if is_batch {
        Created::Many(bodies)
    } else {
        let only = bodies
            .pop()
            .ok_or_else(|| ApiError::Internal(format!("{} insert returned nothing", L::NAME)))?;
        Created::One(only)
    };
    Ok((StatusCode::CREATED, Json(payload)))
}

pub async fn get_entry<L: Ledger>(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<L::Body>, ApiError> {
    let entry = L::fetch(state.db.as_ref(), caller.id, id).await?;
    Ok(Json(L::to_body(&entry)))
}

/// PUT: the body must be a complete record.
pub async fn replace_entry<L: Ledger>(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<L::Body>, ApiError> {
    // Existence first, so a foreign id is a 404 even with an invalid body.
    L::fetch(state.db.as_ref(), caller.id, id).await?;
    let draft = <L::Draft as Validate>::validate(expect_record(&body)?, state.today())?;
    let entry = L::update(state.db.as_ref(), caller.id, id, &draft).await?;
    Ok(Json(L::to_body(&entry)))
}

/// PATCH: supplied fields are merged over the stored record, then the whole
/// record is validated again.
pub async fn patch_entry<L: Ledger>(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<L::Body>, ApiError> {
    let current = L::fetch(state.db.as_ref(), caller.id, id).await?;
    let merged = merge_records(as_record(&L::to_body(&current)), expect_record(&body)?);
    let draft = <L::Draft as Validate>::validate(&merged, state.today())?;
    let entry = L::update(state.db.as_ref(), caller.id, id, &draft).await?;
    Ok(Json(L::to_body(&entry)))
}

pub async fn delete_entry<L: Ledger>(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    L::remove(state.db.as_ref(), caller.id, id).await?;
    info!("Deleted {} {}", L::NAME, id);
    Ok(StatusCode::NO_CONTENT)
}
