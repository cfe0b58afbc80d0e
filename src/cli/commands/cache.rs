//! Cache command - inspect the signing cache

use crate::cli::args::{CacheAction, CacheArgs, OutputFormat, RunOverrides};
use crate::config::Config;
use crate::discovery::{discover_archives, parse_types};
use crate::error::{JarsignError, JarsignResult};
use crate::pipeline::{Candidate, Classification, Orchestrator};
use crate::ui::{self, UiContext};
use serde::Serialize;
use std::path::PathBuf;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> JarsignResult<()> {
    match args.action {
        CacheAction::Path { id, repository } => {
            let overrides = RunOverrides {
                id,
                repository,
                ..RunOverrides::default()
            };
            show_path(&overrides, config)
        }
        CacheAction::Status { overrides, format } => show_status(&overrides, config, format).await,
    }
}

/// Print the cache root, or the namespace directory when an id is known
fn show_path(overrides: &RunOverrides, config: &Config) -> JarsignResult<()> {
    let mut config = config.clone();
    overrides.apply(&mut config);

    let root = config.cache_root();
    let path = match config.id {
        Some(_) => root.join(config.cache_id()?),
        None => root,
    };
    println!("{}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct StatusEntry {
    archive: PathBuf,
    classification: Classification,
}

async fn show_status(
    overrides: &RunOverrides,
    config: &Config,
    format: OutputFormat,
) -> JarsignResult<()> {
    let mut config = config.clone();
    overrides.apply(&mut config);

    let cwd = std::env::current_dir()
        .map_err(|e| JarsignError::io("getting current directory", e))?;
    let jar_directory = config.jar_directory_in(&cwd)?;
    let archives = discover_archives(&jar_directory, &parse_types(&config.types));

    let orchestrator = Orchestrator::from_config(&config).await?;
    let candidates = orchestrator.classify_only(&archives).await?;

    match format {
        OutputFormat::Json => {
            let entries: Vec<StatusEntry> = candidates
                .into_iter()
                .map(|c| StatusEntry {
                    archive: c.archive_path,
                    classification: c.classification,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => print_status(orchestrator.namespace().id(), &candidates, &jar_directory),
    }
    Ok(())
}

fn print_status(id: &str, candidates: &[Candidate], jar_directory: &std::path::Path) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, &format!("Cache namespace {}", id));

    if candidates.is_empty() {
        ui::step_info(
            &ctx,
            &format!("No archives found under {}", jar_directory.display()),
        );
        return;
    }

    for candidate in candidates {
        let shown = candidate
            .archive_path
            .strip_prefix(jar_directory)
            .unwrap_or(&candidate.archive_path);
        ui::candidate_row(&ctx, candidate.classification, &shown.display().to_string());
    }

    let count = |wanted: Classification| {
        candidates
            .iter()
            .filter(|c| c.classification == wanted)
            .count()
    };
    println!();
    println!(
        "{} new, {} cached, {} already signed",
        count(Classification::New),
        count(Classification::Cached),
        count(Classification::Signed)
    );
}
