//! risk-gate - evaluate, override and report proposal release decisions

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use risk_gate::SqliteStore;
use risk_gate_cli::{build_service, commands::load_config, execute, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Logs go to stderr so stdout stays machine-readable
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("risk_gate={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let config = load_config(&args)?;
    info!(
        db = %args.db.display(),
        ai = args.ai_enabled(),
        environment = ?config.auth.environment,
        "Risk Gate starting"
    );

    let store = Arc::new(SqliteStore::open(&args.db)?);
    let service = build_service(&args, config, store.clone())?;

    match execute(&args.command, &service, &store).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(2);
        }
    }
}
