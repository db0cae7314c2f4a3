//! Rendering chapters to PDF and EPUB through pandoc.
//!
//! Each chapter is written as its own markdown file into a temporary
//! directory, then pandoc runs twice over the whole set: once with the LaTeX
//! engine for the PDF, once for the EPUB. Both invocations are described by a
//! typed [`PandocInvocation`] so that no argument is ever assembled by string
//! concatenation or passed through a shell.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::DocumentMetadata;
use crate::contract::{ArtifactOutcome, Chapter, RenderOutcome, Renderer};
use crate::error::RenderError;

/// Shortest code fence used around chapter content.
const MIN_FENCE: usize = 5;
/// Chapter file names keep at most this many bytes of the title, well under
/// the 255-byte name limit of common filesystems.
const MAX_FILE_STEM: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pdf,
    Epub,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Epub => "epub",
        }
    }
}

/// One pandoc command line option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PandocOption {
    PdfEngine(String),
    HighlightStyle(String),
    Toc,
    TocDepth(u8),
    Template(PathBuf),
    EpubChapterLevel(u8),
    /// `-V key=value`, substituted into the template verbatim.
    Variable { key: String, value: String },
    /// `--metadata key=value`, treated as a plain string.
    Metadata { key: String, value: String },
}

impl PandocOption {
    fn push_args(&self, args: &mut Vec<OsString>) {
        match self {
            PandocOption::PdfEngine(engine) => args.push(format!("--pdf-engine={engine}").into()),
            PandocOption::HighlightStyle(style) => {
                args.push("--highlight-style".into());
                args.push(style.into());
            }
            PandocOption::Toc => args.push("--toc".into()),
            PandocOption::TocDepth(depth) => args.push(format!("--toc-depth={depth}").into()),
            PandocOption::Template(path) => {
                let mut arg = OsString::from("--template=");
                arg.push(path.as_os_str());
                args.push(arg);
            }
            PandocOption::EpubChapterLevel(level) => {
                args.push(format!("--epub-chapter-level={level}").into())
            }
            PandocOption::Variable { key, value } => {
                args.push("-V".into());
                args.push(format!("{key}={value}").into());
            }
            PandocOption::Metadata { key, value } => {
                args.push("--metadata".into());
                args.push(format!("{key}={value}").into());
            }
        }
    }
}

/// A complete pandoc run: markdown inputs to one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PandocInvocation {
    pub to: OutputFormat,
    pub options: Vec<PandocOption>,
    pub output: PathBuf,
    pub inputs: Vec<PathBuf>,
}

impl PandocInvocation {
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--from".into(),
            "markdown".into(),
            "--to".into(),
            self.to.as_str().into(),
        ];
        for option in &self.options {
            option.push_args(&mut args);
        }
        args.push("-o".into());
        args.push(self.output.as_os_str().to_owned());
        args.extend(self.inputs.iter().map(|p| p.as_os_str().to_owned()));
        args
    }
}

pub fn pdf_invocation(
    meta: &DocumentMetadata,
    title: &str,
    output: PathBuf,
    inputs: Vec<PathBuf>,
) -> PandocInvocation {
    let mut options = vec![
        PandocOption::PdfEngine(meta.pdf_engine.clone()),
        PandocOption::HighlightStyle(meta.highlight_style.clone()),
        PandocOption::Toc,
        PandocOption::TocDepth(2),
    ];
    if let Some(template) = &meta.template {
        options.push(PandocOption::Template(template.clone()));
    }
    options.extend([
        PandocOption::Variable {
            key: "title".into(),
            value: escape_latex(title),
        },
        PandocOption::Variable {
            key: "author".into(),
            value: escape_latex(&meta.author),
        },
        PandocOption::Variable {
            key: "date".into(),
            value: meta.date.clone(),
        },
        PandocOption::Variable {
            key: "geometry:margin".into(),
            value: meta.margin.trim().to_string(),
        },
    ]);
    PandocInvocation {
        to: OutputFormat::Pdf,
        options,
        output,
        inputs,
    }
}

pub fn epub_invocation(
    meta: &DocumentMetadata,
    title: &str,
    output: PathBuf,
    inputs: Vec<PathBuf>,
) -> PandocInvocation {
    PandocInvocation {
        to: OutputFormat::Epub,
        options: vec![
            PandocOption::Toc,
            PandocOption::TocDepth(2),
            PandocOption::EpubChapterLevel(1),
            PandocOption::Metadata {
                key: "title".into(),
                value: title.to_string(),
            },
            PandocOption::Metadata {
                key: "author".into(),
                value: meta.author.clone(),
            },
        ],
        output,
        inputs,
    }
}

/// Produces `<output_dir>/<base>_<YYYYmmdd_HHMMSS>.{pdf,epub}` with pandoc.
pub struct PandocRenderer {
    output_dir: PathBuf,
    metadata: DocumentMetadata,
    pandoc: String,
}

impl PandocRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, metadata: DocumentMetadata) -> Self {
        Self {
            output_dir: output_dir.into(),
            metadata,
            pandoc: "pandoc".to_string(),
        }
    }

    pub fn with_pandoc_binary(mut self, pandoc: impl Into<String>) -> Self {
        self.pandoc = pandoc.into();
        self
    }

    async fn run_pandoc(&self, invocation: &PandocInvocation) -> ArtifactOutcome {
        let format = invocation.to.as_str();
        debug!(format, args = ?invocation.args(), "Invoking pandoc");
        let output = Command::new(&self.pandoc)
            .args(invocation.args())
            .output()
            .await;
        let success = match output {
            Ok(out) if out.status.success() => {
                info!(format, path = %invocation.output.display(), "Document generated");
                true
            }
            Ok(out) => {
                error!(
                    format,
                    status = %out.status,
                    stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                    "pandoc failed"
                );
                false
            }
            Err(e) => {
                error!(format, error = ?e, pandoc = %self.pandoc, "Failed to launch pandoc");
                false
            }
        };
        ArtifactOutcome {
            path: invocation.output.clone(),
            success,
        }
    }
}

#[async_trait::async_trait]
impl Renderer for PandocRenderer {
    async fn render(
        &self,
        chapters: &[Chapter],
        base_name: &str,
    ) -> Result<RenderOutcome, RenderError> {
        self.metadata
            .validate()
            .map_err(RenderError::InvalidMetadata)?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| RenderError::Io {
                path: self.output_dir.clone(),
                source,
            })?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let output_base = format!("{}_{timestamp}", sanitize_file_name(base_name));

        let temp_dir = tempfile::tempdir().map_err(|source| RenderError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        let inputs = write_chapter_files(temp_dir.path(), chapters).await?;
        info!(chapters = inputs.len(), dir = %temp_dir.path().display(), "Chapter files written");

        let title = self.metadata.resolved_title(base_name);
        let pdf = pdf_invocation(
            &self.metadata,
            &title,
            self.output_dir.join(format!("{output_base}.pdf")),
            inputs.clone(),
        );
        let epub = epub_invocation(
            &self.metadata,
            &title,
            self.output_dir.join(format!("{output_base}.epub")),
            inputs,
        );

        let pdf = self.run_pandoc(&pdf).await;
        let epub = self.run_pandoc(&epub).await;
        Ok(RenderOutcome { pdf, epub })
    }
}

/// Writes `NNNN_<title>.md` per chapter and returns the paths in chapter order.
pub async fn write_chapter_files(
    dir: &Path,
    chapters: &[Chapter],
) -> Result<Vec<PathBuf>, RenderError> {
    let mut paths = Vec::with_capacity(chapters.len());
    for (i, chapter) in chapters.iter().enumerate() {
        let path = dir.join(format!("{i:04}_{}.md", sanitize_file_name(&chapter.title)));
        tokio::fs::write(&path, chapter_markdown(chapter))
            .await
            .map_err(|source| RenderError::Io {
                path: path.clone(),
                source,
            })?;
        paths.push(path);
    }
    Ok(paths)
}

/// A level-one heading followed by the content in a fenced code block.
pub fn chapter_markdown(chapter: &Chapter) -> String {
    let fence = "`".repeat(fence_length(&chapter.content));
    format!(
        "# {}\n\n{fence}{}\n{}\n{fence}\n\n",
        escape_markdown_heading(&chapter.title),
        language_for_path(&chapter.source_path),
        chapter.content,
    )
}

/// Longer than any backtick run in `content`, and never shorter than five.
fn fence_length(content: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    MIN_FENCE.max(longest + 1)
}

fn escape_markdown_heading(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if matches!(c, '\\' | '`' | '*' | '_' | '[' | ']' | '#' | '<' | '$' | '~' | '^') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escapes the characters LaTeX treats specially.
pub fn escape_latex(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Replaces characters that are not allowed in file names and keeps at most
/// the last [`MAX_FILE_STEM`] bytes, cut at a character boundary.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let mut start = cleaned.len().saturating_sub(MAX_FILE_STEM);
    while !cleaned.is_char_boundary(start) {
        start += 1;
    }
    cleaned[start..].to_string()
}

/// Highlighting language for a file, `text` when unknown.
pub fn language_for_path(path: &Path) -> &'static str {
    let ext = match path.extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => return "text",
    };
    match ext.as_str() {
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "cpp" | "hpp" => "cpp",
        "c" | "h" => "c",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" | "sbt" => "scala",
        "m" | "mm" => "objectivec",
        "pl" => "perl",
        "dart" => "dart",
        "lua" => "lua",
        "r" => "r",
        "ex" | "exs" => "elixir",
        "erl" | "hrl" => "erlang",
        "clj" => "clojure",
        "fs" => "fsharp",
        "hs" => "haskell",
        "ml" => "ocaml",
        "f90" => "fortran",
        "jl" => "julia",
        "pas" => "pascal",
        "vb" => "vbnet",
        "asm" => "nasm",
        "s" => "gas",
        "el" => "lisp",
        "sh" => "bash",
        "ps1" | "psm1" => "powershell",
        "gradle" => "groovy",
        "tf" => "hcl",
        "conf" | "properties" | "ini" => "ini",
        "md" => "markdown",
        "json" => "json",
        "xml" => "xml",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "sql" => "sql",
        "css" => "css",
        "scss" => "scss",
        "less" => "less",
        "html" | "htm" => "html",
        "vue" => "vue",
        "vim" => "vim",
        _ => "text",
    }
}
