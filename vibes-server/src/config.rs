//! Process settings
//!
//! Every setting has a flag and an environment variable. `.env` files are
//! loaded before parsing so they feed the same variables.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};

/// Runtime settings for the `vibes` server
#[derive(Parser, Debug, Clone)]
#[command(name = "vibes", version, about = "Serve the vibes track catalog")]
pub struct Settings {
    /// Application name shown in the welcome message
    #[arg(long, env = "APP_NAME", default_value = "HNG Vibes API")]
    pub app_name: String,

    #[arg(long, env = "APP_VERSION", default_value = "0.1.0")]
    pub app_version: String,

    /// Deployment environment (development, staging, production)
    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    pub environment: String,

    /// Verbose logging when no RUST_LOG is set
    #[arg(
        long,
        env = "DEBUG",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub debug: bool,

    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub api_host: String,

    #[arg(long, env = "API_PORT", default_value_t = 8000)]
    pub api_port: u16,

    /// Comma-separated list of origins allowed by CORS ("*" allows any)
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    #[arg(long, env = "POSTGRES_SERVER", default_value = "localhost")]
    pub postgres_server: String,

    #[arg(long, env = "POSTGRES_USER", default_value = "hng_user")]
    pub postgres_user: String,

    #[arg(long, env = "POSTGRES_PASSWORD", default_value = "hng_password", hide_env_values = true)]
    pub postgres_password: String,

    #[arg(long, env = "POSTGRES_DB", default_value = "hng_vibes")]
    pub postgres_db: String,

    #[arg(long, env = "POSTGRES_PORT", default_value_t = 5432)]
    pub postgres_port: u16,

    /// Full connection string; assembled from the POSTGRES_* parts when empty
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = vibes_core::store::postgres::DEFAULT_MAX_CONNECTIONS)]
    pub db_max_connections: u32,

    /// Serve from an in-process store instead of PostgreSQL
    #[arg(long)]
    pub memory: bool,
}

impl Settings {
    /// Connection string for the pool.
    pub fn database_url(&self) -> String {
        match self.database_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.postgres_user,
                self.postgres_password,
                self.postgres_server,
                self.postgres_port,
                self.postgres_db
            ),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

/// Load a `.env` file from the current directory or its parents.
///
/// Returns the path that was loaded; a missing file is not an error.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}
