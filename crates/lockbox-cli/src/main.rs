//! Lockbox CLI entry point.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use lockbox_core::config::{AppConfig, LoggingConfig};

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config, &cli.env);
    match &config {
        Ok(config) => init_logging(&config.logging),
        Err(_) => init_logging(&LoggingConfig {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }),
    }

    if let Err(e) = cli.execute(config).await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}

/// Logs go to stderr so JSON output on stdout stays parseable.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
