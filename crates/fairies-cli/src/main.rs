//! Fairies headless driver entry point.

use std::error::Error;

use fairies_cli::{Driver, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber. Logs go to stderr; stdout carries the journal.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Fairies headless driver");

    // Read configuration from environment.
    let settings = Settings::from_env()?;
    let config = settings.session_config()?;

    let driver = Driver::assemble(&settings, config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = driver.run(&mut out, settings.realtime).await?;

    if summary.interrupted {
        tracing::info!("Stopped before the session ended");
    }

    Ok(())
}
