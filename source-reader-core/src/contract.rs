//! # contract: the seams between the pipeline and its collaborators
//!
//! The orchestrator in [`crate::pipeline`] only talks to the outside world
//! through the traits defined here:
//! - [`Downloader`] turns a [`RepoSource`] into a local directory (git in production).
//! - [`Renderer`] turns an ordered list of [`Chapter`]s into a PDF and an EPUB (pandoc in production).
//! - [`ProgressReporter`] is told about stage changes and per-file progress.
//!
//! `Downloader` and `Renderer` are annotated for `mockall`, so tests can drive
//! every pipeline branch without `git` or `pandoc` installed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::config::RepoSource;
use crate::error::{DownloadError, RenderError};

/// One file of the repository, ready to be typeset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// Relative path with separators rendered as `" > "`, e.g. `src > main.rs`.
    pub title: String,
    /// Decoded text with long lines wrapped.
    pub content: String,
    /// Path relative to the repository root; used to pick a highlighting language.
    pub source_path: PathBuf,
}

/// A file that passed selection. Only lives between selection and extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Result of producing one output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactOutcome {
    pub path: PathBuf,
    pub success: bool,
}

/// The renderer's two independent results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    pub pdf: ArtifactOutcome,
    pub epub: ArtifactOutcome,
}

impl RenderOutcome {
    /// A run only counts when both documents were produced.
    pub fn success(&self) -> bool {
        self.pdf.success && self.epub.success
    }
}

/// Fetches a repository into a local directory.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Returns the directory holding the checkout.
    async fn download(&self, source: &RepoSource) -> Result<PathBuf, DownloadError>;
}

/// Typesets chapters into the output documents.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Renderer: Send + Sync {
    /// `base_name` is the repository directory name; implementations add a timestamp.
    ///
    /// `Err` means rendering could not start at all. A failed pandoc run is
    /// reported through the matching [`ArtifactOutcome`] instead.
    async fn render(&self, chapters: &[Chapter], base_name: &str)
        -> Result<RenderOutcome, RenderError>;
}

/// Observer for long-running work. Every method has a no-op default.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ProgressReporter: Send + Sync {
    /// A new stage started; `fraction` is the overall completion in `0.0..=1.0`.
    fn phase(&self, _description: &str, _fraction: f32) {}

    /// Called after every extraction attempt, successful or not.
    fn file_processed(&self, _path: &Path, _current: usize, _total: usize) {}

    fn finished(&self, _success: bool) {}
}

/// Reporter that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {}
