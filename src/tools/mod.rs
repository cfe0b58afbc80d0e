//! External tools used by the pipelines
//!
//! - `jarsigner` signs and verifies archives
//! - `pack200`/`unpack200` pack and unpack archives
//!
//! Both sit behind traits so the pipelines never spawn processes directly.

mod codec;
mod jarsigner;
mod pack200;
mod signer;

pub use codec::ArchiveCodec;
pub use jarsigner::JarSigner;
pub use pack200::{Pack200Codec, PackProfile, PACKED_EXTENSION};
pub use signer::SigningTool;

use crate::error::{JarsignError, JarsignResult};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Max number of output lines to include in tool error messages.
const TOOL_ERROR_TAIL_LINES: usize = 50;

/// Extract the useful tail of tool output for error diagnostics.
///
/// Combines stdout and stderr, then returns the last `TOOL_ERROR_TAIL_LINES`
/// lines so error messages are actionable without being overwhelming.
pub(crate) fn tool_error_output(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let total = lines.len();
    let tail: Vec<&str> = if total > TOOL_ERROR_TAIL_LINES {
        lines[total - TOOL_ERROR_TAIL_LINES..].to_vec()
    } else {
        lines
    };
    tail.join("\n")
}

/// Run a prepared tool command to completion
///
/// Fails with `ToolLaunch` if the process cannot be started and with
/// `ToolFailed` on a non-zero exit. Returns stdout on success.
pub(crate) async fn run_tool(
    tool: &str,
    mut command: Command,
    archive: &Path,
) -> JarsignResult<String> {
    debug!("Executing {} for {}", tool, archive.display());

    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| JarsignError::tool_launch(tool, e))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if output.status.success() {
        return Ok(stdout.into_owned());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    match output.status.code() {
        Some(code) => Err(JarsignError::ToolFailed {
            tool: tool.to_string(),
            archive: archive.to_path_buf(),
            code,
            output: tool_error_output(&stdout, &stderr),
        }),
        None => Err(JarsignError::ToolSignaled {
            tool: tool.to_string(),
            archive: archive.to_path_buf(),
        }),
    }
}
