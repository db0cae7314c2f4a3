//! CLI glue for source-reader: argument parsing and the `run` entrypoint.
//!
//! All business logic lives in `source-reader-core`; this module only loads
//! the config, wires the real git and pandoc collaborators into the pipeline
//! and reports the result.

use crate::load_config::load_config;
use crate::progress::CliProgress;
use anyhow::Result;
use clap::{Parser, Subcommand};
use source_reader_core::config::RepoSource;
use source_reader_core::download::GitDownloader;
use source_reader_core::pipeline::Pipeline;
use source_reader_core::render::PandocRenderer;
use std::io::IsTerminal;
use std::path::PathBuf;

/// CLI for source-reader: read a repository like a book.
#[derive(Parser)]
#[clap(
    name = "source-reader",
    version,
    about = "Clone a git repository and typeset its source files into a PDF and an EPUB"
)]
pub struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[clap(long, short, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clone the configured repository and build its PDF and EPUB
    Build {
        /// Path to the YAML config file
        #[clap(long, default_value = "config.yaml")]
        config: PathBuf,

        /// Repository to read instead of `github.repo_url`
        #[clap(long)]
        repo_url: Option<String>,

        /// Directory for the generated documents instead of `output.output_dir`
        #[clap(long)]
        output_dir: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main().
///
/// `Err` means the configuration could not be loaded; `Ok(false)` means the
/// pipeline ran and failed.
pub async fn run(cli: Cli) -> Result<bool> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Build {
            config,
            repo_url,
            output_dir,
        } => {
            let mut config = load_config(config)?;
            if let Some(repo_url) = repo_url {
                let reference = config.source.take().and_then(|s| s.reference);
                config.source = Some(RepoSource {
                    repo_url,
                    reference,
                });
            }
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
            }
            config.trace_loaded();

            let downloader = GitDownloader::new(config.clone_dir.clone());
            let renderer = PandocRenderer::new(config.output_dir.clone(), config.document.clone());
            let progress = if std::io::stderr().is_terminal() {
                CliProgress::new()
            } else {
                CliProgress::hidden()
            };

            tracing::info!(command = "build", "Starting conversion");
            let success = Pipeline::new(&config, &downloader, &renderer)
                .run(&progress)
                .await;
            Ok(success)
        }
    }
}
