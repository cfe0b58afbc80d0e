//! Sign command - sign and verify the archives of one build

use crate::cli::args::{OutputFormat, SignArgs};
use crate::config::Config;
use crate::discovery::{discover_archives, parse_types};
use crate::error::{JarsignError, JarsignResult};
use crate::pipeline::{Orchestrator, RunReport};
use crate::ui::{self, TaskSpinner, UiContext};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Execute the sign command
pub async fn execute(
    args: SignArgs,
    config: &Config,
    cancel: CancellationToken,
) -> JarsignResult<()> {
    let mut config = config.clone();
    args.overrides.apply(&mut config);

    let cwd = std::env::current_dir()
        .map_err(|e| JarsignError::io("getting current directory", e))?;
    let jar_directory = config.jar_directory_in(&cwd)?;
    let id = config.cache_id()?.to_string();
    let archives = discover_archives(&jar_directory, &parse_types(&config.types));
    debug!(
        "{} candidate(s) under {}",
        archives.len(),
        jar_directory.display()
    );

    let orchestrator = Orchestrator::from_config(&config).await?;
    let ctx = UiContext::detect();
    let text = args.format == OutputFormat::Text;

    if text && archives.is_empty() {
        ui::step_warn_hint(
            &ctx,
            &format!("No archives found under {}", jar_directory.display()),
            "Check jar_directory and types",
        );
    }

    let mut spinner = TaskSpinner::new(&ctx);
    if text {
        spinner.start(&format!(
            "Signing {} archive(s) in cache namespace {}",
            archives.len(),
            id
        ));
    }

    let outcome = orchestrator.execute(archives, &cancel).await;
    let report = outcome.report;

    if text {
        match &outcome.error {
            None => spinner.stop(&format!("{} archive(s) verified", report.verified)),
            Some(_) => spinner.stop_error("Signing failed"),
        }
    }
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&ctx, &report),
    }

    // Counters are printed above even when the run failed
    outcome.into_result().map(|_| ())
}

fn print_report(ctx: &UiContext, report: &RunReport) {
    ui::key_value(ctx, "Archives", &report.total.to_string());
    ui::key_value(ctx, "Signed", &report.signed.to_string());
    ui::key_value(ctx, "Restored from cache", &report.cached.to_string());
    ui::key_value(ctx, "Already signed", &report.already_signed.to_string());
    ui::key_value(ctx, "Verified", &report.verified.to_string());
}
