//! Error types for rpath-relocate

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for relocation operations
#[derive(Error, Debug)]
pub enum RelocateError {
    #[error("{} does not exist", .0.display())]
    DoesNotExist(PathBuf),

    #[error("{} is not an absolute path", .0.display())]
    NotAbsolute(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Patch tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Invalid relocation request: {0}")]
    InvalidRequest(String),

    #[error(
        "Cannot replace {old} with {new} in {}: the new prefix is longer than the old one",
        path.display()
    )]
    PrefixTooLong {
        path: PathBuf,
        old: String,
        new: String,
    },
}

/// Errors related to resolving the patch tool
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{tool} was not found on the search path and no installer is available")]
    NotFound { tool: String },

    #[error("Failed to install {tool}: {reason}")]
    InstallFailed { tool: String, reason: String },

    #[error("{tool} was installed but {} does not exist", path.display())]
    MissingAfterInstall { tool: String, path: PathBuf },
}
