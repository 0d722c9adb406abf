//! services/api/src/web/ai.rs
//!
//! The advice endpoints. Every outbound call runs as its own task, tied to a
//! cancellation token that fires if the request future is dropped (for example
//! when the client disconnects), so no model call outlives its caller.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use finance_core::advice::{
    advise, advise_on, AdviceError, AdvicePrompt, ChatPrompt, InsightPrompt, LoanPrompt,
    SimilarInvestmentsPrompt,
};
use finance_core::domain::{ChatMessage, ChatTurn};
use finance_core::summary::FinancialSnapshot;
use finance_core::validation::{expect_record, Validate};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument, Span};

use crate::error::ApiError;
use crate::web::dto::{
    AdviceResponse, ChatHistoryResponse, ChatRequest, ChatResponse, LoanAnalysisResponse,
    RecommendationsResponse,
};
use crate::web::state::{AppState, AuthUser};

//=========================================================================================
// Task Plumbing
//=========================================================================================

/// Runs `work` on its own task and waits for it. Dropping the returned future
/// cancels the task.
async fn run_cancellable<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, AdviceError>> + Send + 'static,
{
    let token = CancellationToken::new();
    let _cancel_on_drop = token.clone().drop_guard();

    let task = tokio::spawn(
        async move {
            tokio::select! {
                _ = token.cancelled() => Err(AdviceError::Cancelled),
                result = work => result,
            }
        }
        .instrument(Span::current()),
    );

    match task.await {
        Ok(result) => result.map_err(ApiError::from),
        Err(join_error) => {
            error!("Advice task failed to complete: {:?}", join_error);
            Err(ApiError::Internal("advice task failed".to_string()))
        }
    }
}

/// The common path: load the snapshot, build the mode's prompt, return the reply.
async fn run_prompt<P>(state: &AppState, caller: &AuthUser, prompt: P) -> Result<String, ApiError>
where
    P: AdvicePrompt + 'static,
{
    let db = state.db.clone();
    let llm = state.advice.clone();
    let user_id = caller.id;
    info!(mode = prompt.mode(), "Requesting advice");
    run_cancellable(async move { advise(db.as_ref(), llm.as_ref(), user_id, &prompt).await }).await
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /ai/insights/ - Five personalised recommendations
#[utoipa::path(
    get,
    path = "/ai/insights/",
    responses(
        (status = 200, description = "Advice text", body = AdviceResponse),
        (status = 400, description = "Financial profile missing"),
        (status = 502, description = "The model returned nothing usable"),
        (status = 503, description = "The model could not be reached")
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(name = "ai_insights", skip_all)]
pub async fn insights_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<AdviceResponse>, ApiError> {
    let advice = run_prompt(&state, &caller, InsightPrompt).await?;
    Ok(Json(AdviceResponse { advice }))
}

/// POST /ai/chat/ - One conversational turn, persisted to a chat history
#[utoipa::path(
    post,
    path = "/ai/chat/",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "The assistant's reply", body = ChatResponse),
        (status = 400, description = "Message missing or invalid, or financial profile missing"),
        (status = 404, description = "Unknown chat_id"),
        (status = 502, description = "The model returned nothing usable"),
        (status = 503, description = "The model could not be reached")
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(name = "ai_chat", skip_all)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(body): Json<Value>,
) -> Result<Json<ChatResponse>, ApiError> {
    let turn = ChatTurn::validate(expect_record(&body)?, state.today())?;

    // Stored turns are only replayed when the client keeps no history of its own.
    let stored = match turn.chat_id {
        Some(chat_id) => Some(state.db.get_chat_history(caller.id, chat_id).await?),
        None => None,
    };
    let history = match (turn.history, &stored) {
        (Some(turns), _) => turns,
        (None, Some(chat)) => chat.messages.clone(),
        (None, None) => Vec::new(),
    };

    let prompt = ChatPrompt::new(&turn.message, history)?;
    let question = prompt.message().to_string();
    let reply = run_prompt(&state, &caller, prompt).await?;

    let chat_id = match stored {
        Some(chat) => chat.id,
        None => state.db.create_chat_history(caller.id).await?.id,
    };
    state
        .db
        .append_chat_messages(
            caller.id,
            chat_id,
            &[ChatMessage::user(question), ChatMessage::assistant(reply.clone())],
        )
        .await?;

    Ok(Json(ChatResponse {
        response: reply,
        status: "success",
        chat_id,
    }))
}

/// GET /ai/similar-investments/ - Suggestions matching the current holdings
#[utoipa::path(
    get,
    path = "/ai/similar-investments/",
    responses(
        (status = 200, description = "Recommendation text", body = RecommendationsResponse),
        (status = 400, description = "Financial profile missing"),
        (status = 502, description = "The model returned nothing usable"),
        (status = 503, description = "The model could not be reached")
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(name = "ai_similar_investments", skip_all)]
pub async fn similar_investments_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    let recommendations = run_prompt(&state, &caller, SimilarInvestmentsPrompt).await?;
    Ok(Json(RecommendationsResponse { recommendations }))
}

/// POST /ai/loan-analysis/ - Affordability of a prospective loan
#[utoipa::path(
    post,
    path = "/ai/loan-analysis/",
    responses(
        (status = 200, description = "Advice with locally computed EMI and DTI", body = LoanAnalysisResponse),
        (status = 400, description = "Loan terms missing or invalid, or financial profile missing"),
        (status = 502, description = "The model returned nothing usable"),
        (status = 503, description = "The model could not be reached")
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(name = "ai_loan_analysis", skip_all)]
pub async fn loan_analysis_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(body): Json<Value>,
) -> Result<Json<LoanAnalysisResponse>, ApiError> {
    let prompt = LoanPrompt::from_record(expect_record(&body)?, state.today())?;

    let db = state.db.clone();
    let llm = state.advice.clone();
    let user_id = caller.id;
    info!(mode = prompt.mode(), "Requesting advice");
    let (advice, figures) = run_cancellable(async move {
        let snapshot = FinancialSnapshot::load(db.as_ref(), user_id).await?;
        let figures = prompt.figures(&snapshot);
        let advice = advise_on(&snapshot, llm.as_ref(), &prompt).await?;
        Ok::<_, AdviceError>((advice, figures))
    })
    .await?;

    Ok(Json(LoanAnalysisResponse {
        advice,
        emi: figures.emi,
        total_emi: figures.total_emi,
        dti_ratio: figures.dti_percent,
    }))
}

//=========================================================================================
// Chat History
//=========================================================================================

/// GET /ai/chat/history/ - Most recently updated first
#[utoipa::path(
    get,
    path = "/ai/chat/history/",
    responses((status = 200, description = "The caller's conversations", body = [ChatHistoryResponse])),
    security(("bearer" = []))
)]
pub async fn list_chat_histories_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Vec<ChatHistoryResponse>>, ApiError> {
    let histories = state.db.list_chat_histories(caller.id).await?;
    Ok(Json(histories.iter().map(ChatHistoryResponse::from).collect()))
}

/// GET /ai/chat/history/{id}/
#[utoipa::path(
    get,
    path = "/ai/chat/history/{id}/",
    params(("id" = i64, Path, description = "Chat history id")),
    responses(
        (status = 200, description = "One conversation", body = ChatHistoryResponse),
        (status = 404, description = "Missing or owned by someone else")
    ),
    security(("bearer" = []))
)]
pub async fn get_chat_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(chat_id): Path<i64>,
) -> Result<Json<ChatHistoryResponse>, ApiError> {
    let history = state.db.get_chat_history(caller.id, chat_id).await?;
    Ok(Json(ChatHistoryResponse::from(&history)))
}

/// DELETE /ai/chat/history/{id}/
#[utoipa::path(
    delete,
    path = "/ai/chat/history/{id}/",
    params(("id" = i64, Path, description = "Chat history id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Missing or owned by someone else")
    ),
    security(("bearer" = []))
)]
pub async fn delete_chat_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(chat_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_chat_history(caller.id, chat_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
