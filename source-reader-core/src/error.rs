//! Error types for the clone → select → extract → render pipeline.
//!
//! Only [`PipelineError`] is fatal for a run. [`ExtractSkip`] is the
//! recoverable per-file outcome: it is logged and the file is dropped.

use std::path::PathBuf;

/// Fatal failures of a pipeline run. Each variant maps to one stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Required configuration is missing or invalid. Raised before any work starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// The repository could not be fetched or did not yield a directory.
    #[error("acquisition failed: {0}")]
    Acquisition(#[from] DownloadError),

    /// The repository root could not be walked at all.
    #[error("file selection failed: {0}")]
    Selection(#[from] SelectError),

    #[error("no files matching the selection policy in {0:?}")]
    NoCandidates(PathBuf),

    #[error("none of the {candidates} selected files produced a chapter")]
    NoChapters { candidates: usize },

    /// The renderer could not even start (output dir, temp files, metadata).
    #[error("rendering failed: {0}")]
    Render(#[from] RenderError),
}

/// Why a single file did not become a chapter.
#[derive(Debug, thiserror::Error)]
pub enum ExtractSkip {
    #[error("{path:?} is {size} bytes, over the {limit} byte limit")]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("failed to read {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path:?} could not be decoded as {encoding}")]
    Undecodable {
        path: PathBuf,
        encoding: &'static str,
    },

    #[error("{0:?} is empty")]
    Empty(PathBuf),

    #[error("{path:?} is not inside repository root {root:?}")]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("cannot read directory {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("cannot derive a repository name from {0:?}")]
    InvalidUrl(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to launch git: {0}")]
    Launch(std::io::Error),

    #[error("git clone exited with {status}: {stderr}")]
    GitFailed { status: String, stderr: String },

    #[error("{0:?} is not a directory")]
    NotADirectory(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid document metadata: {0}")]
    InvalidMetadata(String),
}
