//! Config command - show configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::Config;
use crate::error::JarsignResult;
use std::path::Path;

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, config_path: &Path) -> JarsignResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", config_path.display()),
    }
    Ok(())
}

fn show_config(config: &Config) -> JarsignResult<()> {
    let toml = toml::to_string_pretty(&config.redacted())?;
    println!("{}", toml);
    Ok(())
}
