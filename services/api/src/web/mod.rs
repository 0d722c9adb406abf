pub mod ai;
pub mod auth;
pub mod dashboard;
pub mod dto;
pub mod ledger;
pub mod middleware;
pub mod profile;
pub mod rest;
pub mod routes;
pub mod state;
pub mod users;

// Re-export the router builder to make it easily accessible
// to the server binary and the integration tests.
pub use middleware::require_auth;
pub use routes::build_router;
