//! services/api/src/web/routes.rs
//!
//! Assembles the full axum application: public auth routes, bearer-protected
//! routes, CORS, request tracing and the Swagger UI.

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::web::{
    ai, auth, dashboard,
    ledger::{
        create_entries, delete_entry, get_entry, list_entries, patch_entry, replace_entry,
        Expenses, Incomes, Investments, Ledger,
    },
    middleware::require_auth,
    profile,
    rest::ApiDoc,
    state::AppState,
    users,
};

fn ledger_routes<L: Ledger>(collection: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route(collection, get(list_entries::<L>).post(create_entries::<L>))
        .route(
            &format!("{}{{id}}/", collection),
            get(get_entry::<L>)
                .put(replace_entry::<L>)
                .patch(patch_entry::<L>)
                .delete(delete_entry::<L>),
        )
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!("Ignoring invalid CORS_ALLOWED_ORIGIN '{}'", origin);
            layer
        }
    }
}

/// Builds the router used by the server binary and by the integration tests.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register/", post(auth::register_handler))
        .route("/auth/login/", post(auth::login_handler))
        .route("/auth/token/refresh/", post(auth::refresh_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/logout/", post(auth::logout_handler))
        .route("/users/", get(users::list_users_handler))
        .route(
            "/users/{id}/",
            get(users::get_user_handler)
                .patch(users::update_user_handler)
                .delete(users::delete_user_handler),
        )
        .route("/dashboard/", get(dashboard::dashboard_handler))
        .route("/profile/", get(profile::my_profile_handler))
        .route("/profile/create/", post(profile::create_profile_handler))
        .route(
            "/profile/{id}/",
            get(profile::get_profile_handler)
                .put(profile::replace_profile_handler)
                .patch(profile::patch_profile_handler)
                .delete(profile::delete_profile_handler),
        )
        .merge(ledger_routes::<Incomes>("/income/"))
        .merge(ledger_routes::<Expenses>("/expense/"))
        .merge(ledger_routes::<Investments>("/investment/"))
        .route("/ai/insights/", get(ai::insights_handler))
        .route("/ai/chat/", post(ai::chat_handler))
        .route("/ai/chat/history/", get(ai::list_chat_histories_handler))
        .route(
            "/ai/chat/history/{id}/",
            get(ai::get_chat_history_handler).delete(ai::delete_chat_history_handler),
        )
        .route(
            "/ai/similar-investments/",
            get(ai::similar_investments_handler),
        )
        .route("/ai/loan-analysis/", post(ai::loan_analysis_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors_layer(&state.config.cors_allowed_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
