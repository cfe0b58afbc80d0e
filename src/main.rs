//! jarsign-cache - cached jar signing
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use jarsign_cache::cli::{Cli, Commands, LogFormat};
use jarsign_cache::config::ConfigManager;
use jarsign_cache::error::JarsignResult;
use jarsign_cache::ui;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> JarsignResult<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("jarsign_cache=warn"),
        1 => EnvFilter::new("jarsign_cache=info"),
        _ => EnvFilter::new("jarsign_cache=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.without_time().init(),
    }
    ui::init_theme();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    match cli.command {
        Commands::Sign(args) => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, finishing running verifications");
                    on_interrupt.cancel();
                }
            });
            jarsign_cache::cli::commands::sign(args, &config, cancel).await
        }
        Commands::Config(args) => {
            jarsign_cache::cli::commands::config(args, &config, config_manager.path()).await
        }
        Commands::Cache(args) => jarsign_cache::cli::commands::cache(args, &config).await,
    }
}
