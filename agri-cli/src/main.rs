mod commands;

use std::process::ExitCode;

use agri_core::{config_dir, ClientConfig, Dispatcher, KeyValueStore};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::{Cli, Outcome};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let mut config = ClientConfig::load();
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    let tokens = load_token_store().await;
    let dispatcher = match Dispatcher::from_config(&config.api, tokens) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match commands::run(cli.command, dispatcher, &config).await {
        Ok(Outcome::Json(value)) => {
            match serde_json::to_string_pretty(&value) {
                Ok(text) => println!("{text}"),
                Err(e) => eprintln!("error: {e}"),
            }
            ExitCode::SUCCESS
        }
        Ok(Outcome::Text(text)) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            if err.is_transient() {
                eprintln!("hint: this looks temporary, run the same command again to retry");
            } else if err.is_auth() {
                eprintln!("hint: store a fresh token with `agri token set <TOKEN>`");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn load_token_store() -> KeyValueStore {
    match config_dir() {
        Ok(dir) => KeyValueStore::load_from(dir.join("credentials.json")).await,
        Err(e) => {
            tracing::warn!(error = %e, "no config dir, credentials kept in memory");
            KeyValueStore::in_memory()
        }
    }
}
