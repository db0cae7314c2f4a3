//! `load_config` module: Loads a static YAML config file and adapts it into the core [`ReaderConfig`].
//!
//! This module is the only place where user YAML is parsed and mapped to the
//! strongly-typed structs of `source-reader-core`.
//!
//! # Responsibilities
//! - Parse the flat `github` / `output` / `document` sections
//! - Split comma-separated lists and apply defaults for anything left out
//! - Validate document metadata before any work starts
//!
//! # Errors
//! All errors in this module use `anyhow::Error` and are surfaced at the CLI boundary.
//!
//! A missing `github.repo_url` is not an error here: the pipeline reports it as
//! a configuration failure, so `--repo-url` can still supply it.

use anyhow::Result;
use serde::Deserialize;
use source_reader_core::config::{
    parse_list, DocumentMetadata, ReaderConfig, RepoSource, SelectionPolicy, DEFAULT_CLONE_DIR,
    DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_SIZE,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Default, Deserialize)]
pub struct GithubSection {
    pub repo_url: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub clone_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct OutputSection {
    pub output_dir: PathBuf,
    pub supported_extensions: String,
    #[serde(default)]
    pub excluded_dirs: Option<String>,
    #[serde(default)]
    pub excluded_files: Option<String>,
    #[serde(default)]
    pub max_files: Option<usize>,
    #[serde(default)]
    pub max_file_size: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentSection {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub margin: Option<String>,
    pub template: Option<PathBuf>,
    pub pdf_engine: Option<String>,
    pub highlight_style: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    github: GithubSection,
    output: OutputSection,
    #[serde(default)]
    document: DocumentSection,
}

/// Reads and parses the YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ReaderConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config = parse_config(&config_content)?;
    info!(config_path = ?path_ref, "Config loaded successfully");
    Ok(config)
}

/// Parses YAML text; split out of [`load_config`] so it can be tested without files.
pub fn parse_config(yaml: &str) -> Result<ReaderConfig> {
    let raw: RawConfig = match serde_yaml::from_str(yaml) {
        Ok(conf) => conf,
        Err(e) => {
            error!(error = ?e, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let accepted_extensions = parse_list(&raw.output.supported_extensions);
    if accepted_extensions.is_empty() {
        error!("output.supported_extensions is empty");
        anyhow::bail!("output.supported_extensions must list at least one extension");
    }

    let policy = SelectionPolicy {
        max_file_count: raw.output.max_files.unwrap_or(DEFAULT_MAX_FILES),
        max_file_size_bytes: raw.output.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE),
        excluded_dir_names: parse_list(raw.output.excluded_dirs.as_deref().unwrap_or(""))
            .into_iter()
            .collect(),
        excluded_file_names: parse_list(raw.output.excluded_files.as_deref().unwrap_or(""))
            .into_iter()
            .collect(),
        accepted_extensions,
    };

    let defaults = DocumentMetadata::default();
    let doc = raw.document;
    let document = DocumentMetadata {
        title: doc.title,
        author: doc.author.unwrap_or(defaults.author),
        date: doc.date.unwrap_or(defaults.date),
        margin: doc.margin.unwrap_or(defaults.margin),
        template: doc.template,
        pdf_engine: doc.pdf_engine.unwrap_or(defaults.pdf_engine),
        highlight_style: doc.highlight_style.unwrap_or(defaults.highlight_style),
    };
    if let Err(msg) = document.validate() {
        error!(error = %msg, "Invalid document section");
        anyhow::bail!("Invalid document section: {msg}");
    }

    let source = raw
        .github
        .repo_url
        .filter(|url| !url.trim().is_empty())
        .map(|repo_url| RepoSource {
            repo_url,
            reference: raw.github.reference,
        });

    Ok(ReaderConfig {
        source,
        clone_dir: raw
            .github
            .clone_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CLONE_DIR)),
        output_dir: raw.output.output_dir,
        policy,
        document,
    })
}
