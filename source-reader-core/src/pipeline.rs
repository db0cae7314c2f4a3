//! High-level pipeline: orchestrates clone → select → extract → render for one repository.
//!
//! This module provides the top-level orchestration for a run, as described by
//! the loaded [`ReaderConfig`]:
//!   - Downloads the configured repository through a [`Downloader`]
//!   - Selects candidate files with [`FileSelector`]
//!   - Extracts each candidate into a [`Chapter`] with [`ChapterExtractor`], one at a time
//!   - Hands the ordered chapters to a [`Renderer`] and combines its two results
//!
//! # Error Handling
//! Each stage is gated on the previous one; the first fatal failure stops the
//! run. Per-file extraction problems are logged and dropped. [`Pipeline::run`]
//! folds everything into a single `bool`; [`Pipeline::try_run`] keeps the typed
//! error for callers and tests that want it.

use std::path::Path;

use tracing::{debug, error, info};

use crate::config::{ReaderConfig, RepoSource};
use crate::contract::{Chapter, Downloader, ProgressReporter, RenderOutcome, Renderer};
use crate::error::{DownloadError, ExtractSkip, PipelineError};
use crate::extract::ChapterExtractor;
use crate::select::FileSelector;

pub struct Pipeline<'a, D, R> {
    config: &'a ReaderConfig,
    downloader: &'a D,
    renderer: &'a R,
}

impl<'a, D, R> Pipeline<'a, D, R>
where
    D: Downloader,
    R: Renderer,
{
    pub fn new(config: &'a ReaderConfig, downloader: &'a D, renderer: &'a R) -> Self {
        Self {
            config,
            downloader,
            renderer,
        }
    }

    /// Runs everything and reports overall success. Never panics on a failed stage.
    pub async fn run(&self, reporter: &dyn ProgressReporter) -> bool {
        let success = match self.try_run(reporter).await {
            Ok(outcome) => {
                if !outcome.pdf.success {
                    error!(path = %outcome.pdf.path.display(), "PDF generation failed");
                }
                if !outcome.epub.success {
                    error!(path = %outcome.epub.path.display(), "EPUB generation failed");
                }
                outcome.success()
            }
            Err(e) => {
                error!(error = %e, "Conversion failed");
                false
            }
        };
        reporter.finished(success);
        if success {
            info!("Conversion complete");
        }
        success
    }

    pub async fn try_run(
        &self,
        reporter: &dyn ProgressReporter,
    ) -> Result<RenderOutcome, PipelineError> {
        // --- Step 1: Resolve the repository ---
        let source = self.resolve_source()?;

        // --- Step 2: Download ---
        reporter.phase("Cloning repository", 0.1);
        info!(repo_url = %source.repo_url, "Starting download");
        let repo_dir = self.downloader.download(source).await.map_err(|e| {
            error!(repo_url = %source.repo_url, error = %e, "Download failed");
            e
        })?;
        if !repo_dir.is_dir() {
            error!(path = %repo_dir.display(), "Downloader returned no directory");
            return Err(DownloadError::NotADirectory(repo_dir).into());
        }

        // --- Step 3: Select ---
        reporter.phase("Scanning files", 0.2);
        let candidates = FileSelector::new(&self.config.policy).select(&repo_dir)?;
        info!(count = candidates.len(), "Found files to process");
        if candidates.is_empty() {
            error!(path = %repo_dir.display(), "No supported files found");
            return Err(PipelineError::NoCandidates(repo_dir));
        }

        // --- Step 4: Extract ---
        let chapters = self.extract_all(
            candidates.iter().map(|c| c.path.as_path()),
            candidates.len(),
            &repo_dir,
            reporter,
        );
        info!(count = chapters.len(), "Chapters extracted");
        if chapters.is_empty() {
            error!("No file produced a chapter");
            return Err(PipelineError::NoChapters {
                candidates: candidates.len(),
            });
        }

        // --- Step 5: Render ---
        reporter.phase("Generating documents", 0.8);
        let base_name = repo_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "repository".to_string());
        let outcome = self.renderer.render(&chapters, &base_name).await?;
        reporter.phase("Done", 1.0);
        Ok(outcome)
    }

    fn resolve_source(&self) -> Result<&'a RepoSource, PipelineError> {
        match self.config.source.as_ref() {
            Some(source) if !source.repo_url.trim().is_empty() => Ok(source),
            _ => {
                error!("No repository URL configured");
                Err(PipelineError::Config(
                    "repository URL is not configured".to_string(),
                ))
            }
        }
    }

    fn extract_all<'p>(
        &self,
        paths: impl Iterator<Item = &'p Path>,
        total: usize,
        repo_dir: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Vec<Chapter> {
        let extractor = ChapterExtractor::new(&self.config.policy);
        let mut chapters = Vec::new();
        for (i, path) in paths.enumerate() {
            debug!(path = %path.display(), "Processing file");
            match extractor.extract(path, repo_dir) {
                Ok(chapter) => chapters.push(chapter),
                Err(skip @ (ExtractSkip::Empty(_) | ExtractSkip::TooLarge { .. })) => {
                    debug!(reason = %skip, "Skipping file");
                }
                Err(skip) => {
                    error!(reason = %skip, "Skipping file");
                }
            }
            reporter.file_processed(path, i + 1, total);
        }
        chapters
    }
}
