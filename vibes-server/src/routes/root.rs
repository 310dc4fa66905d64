//! Welcome route and the unknown-route fallback

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::routing::get;
use axum::Router;
use vibes_core::{Reply, Store};

use crate::server::AppState;

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new().route("/", get(welcome::<S>))
}

async fn welcome<S: Store>(State(state): State<AppState<S>>) -> Reply {
    Reply::message(
        StatusCode::OK,
        format!("Welcome to {}", state.settings.app_name),
    )
}

/// Fallback for paths no route matches.
pub async fn not_found(uri: Uri) -> Reply {
    Reply::error(
        StatusCode::NOT_FOUND,
        format!("route '{}' not found", uri.path()),
    )
}
