//! Error types for jarsign-cache
//!
//! All modules use `JarsignResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for jarsign-cache operations
pub type JarsignResult<T> = Result<T, JarsignError>;

/// All errors that can occur while signing a candidate set
#[derive(Error, Debug)]
pub enum JarsignError {
    // Classification errors
    #[error("Failed to calculate {algorithm} checksum for {path}: {source}")]
    Classification {
        path: PathBuf,
        algorithm: String,
        #[source]
        source: std::io::Error,
    },

    // Tool invocation errors
    #[error("Failed to launch {tool}: {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with code {code} for {archive}: {output}")]
    ToolFailed {
        tool: String,
        archive: PathBuf,
        code: i32,
        output: String,
    },

    #[error("{tool} terminated by signal while processing {archive}")]
    ToolSignaled { tool: String, archive: PathBuf },

    // Cache errors
    #[error("Cache write failed at {path}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Archive errors
    #[error("Failed to rewrite archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    // Cancellation
    #[error("Signing run interrupted")]
    Interrupted,

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Missing required option: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid value for {option}: {reason}")]
    OptionInvalid { option: &'static str, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl JarsignError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a cache write error for the given path
    pub fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheIo {
            path: path.into(),
            source,
        }
    }

    /// Create a tool launch error
    pub fn tool_launch(tool: impl Into<String>, source: std::io::Error) -> Self {
        Self::ToolLaunch {
            tool: tool.into(),
            source,
        }
    }

    /// Create an archive rewrite error
    pub fn archive(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Archive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error came from an external tool (launch or exit status)
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            Self::ToolLaunch { .. } | Self::ToolFailed { .. } | Self::ToolSignaled { .. }
        )
    }

    /// Whether the run was stopped deliberately rather than failing
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ToolLaunch { .. } => {
                Some("Check the [tools] section or make sure the JDK tools are on PATH")
            }
            Self::ConfigMissing(_) => Some("Set it in jarsign.toml or pass it on the command line"),
            Self::Interrupted => Some("Run again; finished archives are picked up from the cache"),
            Self::ToolFailed { .. } | Self::CacheIo { .. } => {
                Some("Fix the cause and run again; already cached archives are not re-signed")
            }
            _ => None,
        }
    }
}
