use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use vibes_server::{config, telemetry, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();
    let settings = Settings::parse();
    telemetry::init_tracing(settings.debug)?;

    match dotenv {
        Some(path) => info!("Loaded environment from {}", path.display()),
        None => debug!("No .env file found"),
    }
    info!(
        app = %settings.app_name,
        version = %settings.app_version,
        environment = %settings.environment,
        memory = settings.memory,
        "starting"
    );

    vibes_server::run(settings).await
}
