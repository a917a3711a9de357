//! Error types for the migration pipeline.

use std::path::{Path, PathBuf};

use crate::config::SettingsError;
use crate::rewrite::RewriteError;

/// Errors raised by pipeline steps.
///
/// Per-file and per-model errors are caught by the orchestrator and recorded
/// in the run summary; only configuration and root-level failures abort a run.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to walk {}: {source}", .root.display())]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },

    #[error("Input root not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Output root {} overlaps source model directory {}", .output.display(), .model.display())]
    OverlappingRoots { output: PathBuf, model: PathBuf },

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),
}

impl MigrateError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl AsRef<Path>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        move |source| MigrateError::Io { path, source }
    }

    /// Wrap a JSON error with the document it came from.
    pub fn json(path: impl AsRef<Path>) -> impl FnOnce(serde_json::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        move |source| MigrateError::Json { path, source }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
