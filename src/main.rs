use anyhow::Result;
use parsony_gateway::config::Settings;
use parsony_gateway::Application;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
#[instrument]
async fn main() -> Result<()> {
    let settings = Settings::new()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    if settings.logging.is_json() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!(
        environment = %settings.application.environment,
        "Starting Parsony gateway application"
    );

    let app = Application::from_settings(settings)?;
    app.run().await?;

    Ok(())
}
