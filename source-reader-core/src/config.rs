//! Immutable run configuration.
//!
//! Built once by the CLI (see `load_config` in the binary crate) and passed by
//! reference into every component constructor. Nothing here is mutated after
//! loading.

use std::collections::BTreeSet;
use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Maximum number of files turned into chapters per run.
pub const DEFAULT_MAX_FILES: usize = 1000;
/// Files above this size are never read.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
pub const DEFAULT_CLONE_DIR: &str = "repo";

pub const DEFAULT_AUTHOR: &str = "SourceCode Reader";
pub const DEFAULT_DATE: &str = r"\today";
pub const DEFAULT_MARGIN: &str = "2.5cm";
pub const DEFAULT_PDF_ENGINE: &str = "xelatex";
pub const DEFAULT_HIGHLIGHT_STYLE: &str = "tango";

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// `None` when the config file names no repository; the pipeline rejects that.
    pub source: Option<RepoSource>,
    /// Parent directory that receives the clone.
    pub clone_dir: PathBuf,
    /// Where the PDF and EPUB end up.
    pub output_dir: PathBuf,
    pub policy: SelectionPolicy,
    pub document: DocumentMetadata,
}

impl ReaderConfig {
    pub fn trace_loaded(&self) {
        info!(
            repo_url = self.source.as_ref().map(|s| s.repo_url.as_str()).unwrap_or("<unset>"),
            output_dir = %self.output_dir.display(),
            extensions = self.policy.accepted_extensions.len(),
            "Loaded ReaderConfig"
        );
        debug!(?self, "ReaderConfig loaded (full debug)");
    }
}

/// Describes a Git repository to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSource {
    pub repo_url: String,
    /// Branch or tag to clone instead of the remote HEAD.
    pub reference: Option<String>,
}

/// Which files of the checkout become chapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub max_file_count: usize,
    pub max_file_size_bytes: u64,
    pub excluded_dir_names: BTreeSet<String>,
    pub excluded_file_names: BTreeSet<String>,
    /// Suffixes matched case-sensitively against file names, in configured order.
    pub accepted_extensions: Vec<String>,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            max_file_count: DEFAULT_MAX_FILES,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            excluded_dir_names: BTreeSet::new(),
            excluded_file_names: BTreeSet::new(),
            accepted_extensions: Vec::new(),
        }
    }
}

impl SelectionPolicy {
    pub fn accepts_extension(&self, file_name: &str) -> bool {
        self.accepted_extensions
            .iter()
            .any(|ext| file_name.ends_with(ext.as_str()))
    }
}

/// Title page and layout values handed to pandoc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Derived from the repository name when unset.
    pub title: Option<String>,
    pub author: String,
    /// Passed to LaTeX verbatim, so `\today` works.
    pub date: String,
    pub margin: String,
    pub template: Option<PathBuf>,
    pub pdf_engine: String,
    pub highlight_style: String,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            title: None,
            author: DEFAULT_AUTHOR.to_string(),
            date: DEFAULT_DATE.to_string(),
            margin: DEFAULT_MARGIN.to_string(),
            template: None,
            pdf_engine: DEFAULT_PDF_ENGINE.to_string(),
            highlight_style: DEFAULT_HIGHLIGHT_STYLE.to_string(),
        }
    }
}

impl DocumentMetadata {
    /// The configured title, or one built from the repository name:
    /// `"tokio-console"` becomes `"Tokio Console Source Code Notes"`.
    pub fn resolved_title(&self, repo_name: &str) -> String {
        if let Some(title) = self.title.as_deref().filter(|t| !t.trim().is_empty()) {
            return title.to_string();
        }
        let words: Vec<String> = repo_name
            .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .map(title_case_word)
            .collect();
        if words.is_empty() {
            "Source Code Notes".to_string()
        } else {
            format!("{} Source Code Notes", words.join(" "))
        }
    }

    /// Rejects values that would break the LaTeX preamble or pandoc's argument parsing.
    pub fn validate(&self) -> Result<(), String> {
        let margin = Regex::new(r"^\d+(\.\d+)?(cm|mm|in|pt|em)$").map_err(|e| e.to_string())?;
        if !margin.is_match(self.margin.trim()) {
            return Err(format!(
                "margin {:?} must be a number followed by cm, mm, in, pt or em",
                self.margin
            ));
        }
        let engine = Regex::new(r"^[A-Za-z0-9_.-]+$").map_err(|e| e.to_string())?;
        if !engine.is_match(&self.pdf_engine) {
            return Err(format!("pdf engine {:?} is not a program name", self.pdf_engine));
        }
        if !engine.is_match(&self.highlight_style) {
            return Err(format!(
                "highlight style {:?} is not a style name",
                self.highlight_style
            ));
        }
        Ok(())
    }
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// Splits a comma-separated config value, trimming entries and dropping empty ones.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
