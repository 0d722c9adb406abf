//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the identity of the caller.

use crate::config::Config;
use chrono::{NaiveDate, Utc};
use finance_core::domain::{User, UserId};
use finance_core::ports::{AdviceService, DatabaseService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub advice: Arc<dyn AdviceService>,
}

impl AppState {
    /// The date that bounds every "not in the future" rule.
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// The authenticated caller, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub username: String,
    pub is_staff: bool,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
        }
    }
}
