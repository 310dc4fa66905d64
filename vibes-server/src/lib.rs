//! vibes-server - HTTP boundary for the vibes track catalog
//!
//! Settings, tracing setup, embedded migrations and the axum router that
//! turns every outcome into a response envelope.

pub mod config;
pub mod routes;
pub mod server;
pub mod telemetry;

pub use config::Settings;
pub use server::{build_router, run, with_boundary, AppState, ServerError, MIGRATOR};
