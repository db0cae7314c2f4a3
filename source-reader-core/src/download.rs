use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::config::RepoSource;
use crate::contract::Downloader;
use crate::error::DownloadError;

/// Shallow-clones git repositories under a single parent directory.
///
/// Each repository lands in `<clone_root>/<repo name>`. An existing checkout
/// at that path is deleted first, so two runs must not share a `clone_root`.
pub struct GitDownloader {
    clone_root: PathBuf,
    git: String,
}

impl GitDownloader {
    pub fn new(clone_root: impl Into<PathBuf>) -> Self {
        Self {
            clone_root: clone_root.into(),
            git: "git".to_string(),
        }
    }

    /// Uses a different git executable (tests point this at a stub).
    pub fn with_git_binary(mut self, git: impl Into<String>) -> Self {
        self.git = git.into();
        self
    }
}

/// `https://github.com/owner/repo.git/` → `repo`; also handles `git@host:owner/repo.git`.
pub fn repo_name_from_url(repo_url: &str) -> Option<String> {
    let trimmed = repo_url.trim().trim_end_matches('/');
    let last = trimmed.rsplit(|c| c == '/' || c == ':').next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

/// The full argument list for `git`, shallow and blob-less.
pub fn clone_args(source: &RepoSource, dest: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "clone",
        "--depth=1",
        "--single-branch",
        "--no-tags",
        "--filter=blob:none",
        "--config",
        "core.compression=0",
        "--config",
        "http.postBuffer=524288000",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    if let Some(reference) = source.reference.as_deref().filter(|r| !r.trim().is_empty()) {
        args.push("--branch".into());
        args.push(reference.trim().into());
    }
    // Keeps a URL starting with `-` from being parsed as an option.
    args.push("--".into());
    args.push(source.repo_url.trim().into());
    args.push(dest.as_os_str().to_owned());
    args
}

#[async_trait::async_trait]
impl Downloader for GitDownloader {
    async fn download(&self, source: &RepoSource) -> Result<PathBuf, DownloadError> {
        let repo_url = source.repo_url.trim();
        let name = repo_name_from_url(repo_url)
            .ok_or_else(|| DownloadError::InvalidUrl(repo_url.to_string()))?;
        let full_source_path = self.clone_root.join(&name);

        // If full_source_path exists, remove it for a clean clone
        if tokio::fs::try_exists(&full_source_path).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&full_source_path)
                .await
                .map_err(|source| {
                    tracing::error!(
                        error = ?source,
                        path = %full_source_path.display(),
                        "Failed to remove existing checkout"
                    );
                    DownloadError::Io {
                        path: full_source_path.clone(),
                        source,
                    }
                })?;
            tracing::debug!(path = %full_source_path.display(), "Removed existing checkout");
        }
        tokio::fs::create_dir_all(&self.clone_root)
            .await
            .map_err(|source| {
                tracing::error!(
                    error = ?source,
                    path = %self.clone_root.display(),
                    "Failed to create clone directory"
                );
                DownloadError::Io {
                    path: self.clone_root.clone(),
                    source,
                }
            })?;

        tracing::info!(repo_url, path = %full_source_path.display(), "Cloning git repository");
        let output = Command::new(&self.git)
            .args(clone_args(source, &full_source_path))
            .output()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, git = %self.git, "Failed to launch git process");
                DownloadError::Launch(e)
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!(
                repo_url,
                path = %full_source_path.display(),
                stderr = %stderr,
                "Git exited with non-zero code: {}", output.status
            );
            return Err(DownloadError::GitFailed {
                status: output.status.to_string(),
                stderr,
            });
        }

        if !full_source_path.is_dir() {
            return Err(DownloadError::NotADirectory(full_source_path));
        }
        tracing::info!(
            repo_url,
            path = %full_source_path.display(),
            "Successfully cloned git repository"
        );
        Ok(full_source_path)
    }
}
