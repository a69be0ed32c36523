use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by configuration, persistence and rendering.
///
/// Capture-path failures never surface here; they are swallowed inside
/// [`crate::capture`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExPageError {
    #[error("missing parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("invalid mode '{0}', expected 'dev' or 'prod'")]
    InvalidMode(String),

    #[error("directory was not found on path '{}'", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("template file was not found on path '{}'", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("failed to lock '{}': {reason}", .path.display())]
    LockFailed { path: PathBuf, reason: String },

    #[error("render failed: {0}")]
    Render(String),

    #[error("finalize already ran")]
    AlreadyFinalized,

    #[error("configuration failed: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ExPageError>;
