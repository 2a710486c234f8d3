pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod shopping;
pub mod state;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::{AppConfig, LogFormat};
use error::{AppError, AppResult};
use state::AppState;

/// Installs the global subscriber, writing to stderr so command output on
/// stdout stays machine-readable. Returns `false` when one was already set.
pub fn init_tracing(config: &AppConfig) -> bool {
    let filter =
        EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Plain => builder.try_init(),
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "global subscriber already installed, keeping it");
            false
        }
    }
}

pub fn run() -> AppResult<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(db) = cli.db.clone() {
        config.database_path = db;
    }

    init_tracing(&config);
    info!(database = %config.database_path.display(), "starting trip-pantry");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| AppError::Config(format!("failed to start runtime: {}", e)))?;

    runtime.block_on(async {
        let state = AppState::init(config)?;
        let output = cli::execute(&state, cli.command).await?;
        debug!(bytes = output.len(), "command finished");
        println!("{}", output);
        Ok(())
    })
}
