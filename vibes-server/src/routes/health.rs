//! Health check endpoint

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tracing::warn;
use vibes_core::{respond, Outcome, Reply, Store};

use crate::server::AppState;

pub const HEALTHY: &str = "healthy";
pub const UNHEALTHY: &str = "unhealthy";

/// Health payload. The API is healthy whenever it answers; the store is
/// probed on every call.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub api_status: &'static str,
    pub db_status: &'static str,
}

pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new().route("/health", get(health::<S>))
}

async fn health<S: Store>(State(state): State<AppState<S>>) -> Reply {
    let db_status = match state.store.ping().await {
        Ok(()) => HEALTHY,
        Err(err) => {
            warn!(error = %err, "store ping failed");
            UNHEALTHY
        }
    };

    respond(
        StatusCode::OK,
        Outcome::default(),
        &HealthStatus {
            api_status: HEALTHY,
            db_status,
        },
    )
}
