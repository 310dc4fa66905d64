//! Axum server setup
//!
//! - CORS restricted to the configured origins
//! - Tracing middleware
//! - Panics converted to the generic 500 envelope
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::any::Any;
use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Router;
use sqlx::migrate::Migrator;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as CorsAny, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use vibes_core::response::boundary::internal_error;
use vibes_core::store::create_pool;
use vibes_core::{catalog, MemoryStore, PgStore, Store};

use crate::config::Settings;
use crate::routes;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Shared application state
#[derive(Clone)]
pub struct AppState<S> {
    pub store: S,
    pub settings: Arc<Settings>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, settings: Settings) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
        }
    }
}

/// Full application router.
pub fn build_router<S: Store>(state: AppState<S>) -> Router {
    with_boundary(routes::router(), &state.settings).with_state(state)
}

/// Wrap routes with the fallback, panic boundary, tracing and CORS layers.
pub fn with_boundary<S: Store>(
    app: Router<AppState<S>>,
    settings: &Settings,
) -> Router<AppState<S>> {
    app.fallback(routes::root::not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors(&settings.allowed_origins))
}

fn cors(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin.trim() == "*") {
        warn!("CORS: all origins allowed");
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(CorsAny)
        .allow_headers(CorsAny)
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(text) = payload.downcast_ref::<String>() {
        text.as_str()
    } else if let Some(text) = payload.downcast_ref::<&str>() {
        *text
    } else {
        "non-string panic payload"
    };
    error!(panic = detail, "request handler panicked");
    internal_error().into_response()
}

/// Run the HTTP server until a shutdown signal arrives.
///
/// # Example
///
/// ```ignore
/// let settings = Settings::parse();
/// run(settings).await?;
/// ```
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    catalog::warm();

    if settings.memory {
        warn!("serving from the in-memory store; data is lost on exit");
        return serve(MemoryStore::new(), settings).await;
    }

    let pool = create_pool(&settings.database_url(), settings.db_max_connections)
        .await
        .context("Failed to connect to database")?;
    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    info!("database migrations applied");

    serve(PgStore::new(pool), settings).await
}

async fn serve<S: Store>(store: S, settings: Settings) -> anyhow::Result<()> {
    let addr = settings.bind_addr();
    let app = build_router(AppState::new(store, settings));

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(ServerError::from)
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::from)?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_origins_are_skipped() {
        // Must not panic on a mix of valid and invalid values.
        let _ = cors(&["http://localhost:3000".into(), "bad\norigin".into(), String::new()]);
    }

    #[test]
    fn wildcard_origin_allows_any() {
        let _ = cors(&["*".into()]);
    }

    #[test]
    fn panic_payload_becomes_generic_reply() {
        let response = handle_panic(Box::new("secret detail".to_string()));
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
