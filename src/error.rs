//! Central error types for stepscribe.
//!
//! Everything that crosses the library boundary is an [`Error`]. Per-click
//! failures inside the capture worker use the narrower
//! [`crate::recorder::pipeline::PipelineError`] and are logged, never returned.

use std::path::PathBuf;

use thiserror::Error;

use crate::recorder::state::{RecorderAction, SessionState};

#[derive(Error, Debug)]
pub enum Error {
    /// The global click hook could not be installed (permissions, no display).
    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// A step's screenshot is not on disk.
    #[error("Screenshot missing: {}", .0.display())]
    AssetMissing(PathBuf),

    /// The project bundle or its manifest is unreadable or inconsistent.
    #[error("Project archive is corrupt: {0}")]
    ArchiveCorrupt(String),

    /// The rendered document could not be written.
    #[error("Could not write \"{}\": {reason}", path.display())]
    DocumentWriteFailed { path: PathBuf, reason: String },

    #[error("Cannot {action:?} while {from:?}")]
    InvalidTransition {
        from: SessionState,
        action: RecorderAction,
    },

    /// Steps must be appended with strictly increasing sequence indices.
    #[error("Step index {got} does not follow {last}")]
    SequenceOutOfOrder { last: u32, got: u32 },

    #[error("No step at position {0}")]
    StepNotFound(usize),

    #[error("Step {step} has no annotation at position {index}")]
    AnnotationNotFound { step: usize, index: usize },

    /// The capture worker did not finish within the shutdown timeout.
    #[error("Capture worker did not stop in time")]
    WorkerStalled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn write_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::DocumentWriteFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
