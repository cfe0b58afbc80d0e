//! Terminal output for the CLI commands
//!
//! Styled `cliclack` output on a terminal, plain prefixed lines in CI and
//! when stdout is redirected.

mod context;
mod output;
mod progress;
mod theme;

pub use context::UiContext;
pub use output::{candidate_row, intro, key_value, step_info, step_warn_hint};
pub use progress::TaskSpinner;
pub use theme::{init_theme, JarsignTheme};
