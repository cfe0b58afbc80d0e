//! Output functions for consistent CLI formatting

use super::context::UiContext;
use crate::pipeline::Classification;
use console::{style, StyledObject};

/// Display intro banner
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).cyan().bold()).ok();
    } else {
        println!("{}", style(title).cyan().bold());
    }
}

/// Display a warning step with hint
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::warning(format!("{} - {}", message, style(hint).dim())).ok();
    } else {
        println!("  {} {} - {}", style("[WARN]").yellow(), message, hint);
    }
}

/// Display an info step
pub fn step_info(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::info(message).ok();
    } else {
        println!("  {} {}", style("[INFO]").cyan(), message);
    }
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// One line of `cache status`: classification, then archive
pub fn candidate_row(ctx: &UiContext, classification: Classification, archive: &str) {
    let label = format!("{:<7}", classification.to_string());
    if ctx.use_fancy_output() {
        println!("  {} {}", classification_style(classification, label), archive);
    } else {
        println!("  {} {}", label, archive);
    }
}

fn classification_style(classification: Classification, label: String) -> StyledObject<String> {
    match classification {
        Classification::New => style(label).yellow(),
        Classification::Cached => style(label).green(),
        Classification::Signed => style(label).cyan(),
    }
}
