//! tuneforge binary entry point.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = tuneforge::cli::parse_cli();

    // RUST_LOG wins over --log-level; both fall back to "info".
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    tuneforge::cli::run_with_cli(cli).await
}
