//! HTTP route handlers

pub mod health;
pub mod root;

use axum::Router;
use vibes_core::Store;

use crate::server::AppState;

/// Every route the server exposes.
pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new().merge(root::router()).merge(health::router())
}
