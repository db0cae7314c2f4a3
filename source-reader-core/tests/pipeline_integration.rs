use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use source_reader_core::config::{
    DocumentMetadata, ReaderConfig, RepoSource, SelectionPolicy,
};
use source_reader_core::contract::{
    ArtifactOutcome, Chapter, MockDownloader, MockRenderer, NoopReporter, ProgressReporter,
    RenderOutcome,
};
use source_reader_core::error::{DownloadError, PipelineError};
use source_reader_core::pipeline::Pipeline;
use tempfile::{tempdir, TempDir};

#[derive(Default)]
struct RecordingReporter {
    phases: Mutex<Vec<String>>,
    files: Mutex<Vec<(usize, usize)>>,
    finished: Mutex<Option<bool>>,
}

impl ProgressReporter for RecordingReporter {
    fn phase(&self, description: &str, _fraction: f32) {
        self.phases.lock().unwrap().push(description.to_string());
    }

    fn file_processed(&self, _path: &Path, current: usize, total: usize) {
        self.files.lock().unwrap().push((current, total));
    }

    fn finished(&self, success: bool) {
        *self.finished.lock().unwrap() = Some(success);
    }
}

fn config(repo_url: Option<&str>) -> ReaderConfig {
    ReaderConfig {
        source: repo_url.map(|url| RepoSource {
            repo_url: url.to_string(),
            reference: None,
        }),
        clone_dir: PathBuf::from("repo"),
        output_dir: PathBuf::from("output"),
        policy: SelectionPolicy {
            accepted_extensions: vec![".py".into(), ".md".into()],
            excluded_dir_names: [".git".to_string()].into_iter().collect(),
            ..Default::default()
        },
        document: DocumentMetadata::default(),
    }
}

/// A checkout at `<tmp>/sample-repo` with the given files.
fn checkout(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("sample-repo");
    fs::create_dir_all(&root).unwrap();
    for (name, contents) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    (tmp, root)
}

fn downloader_returning(dir: PathBuf) -> MockDownloader {
    let mut downloader = MockDownloader::new();
    downloader
        .expect_download()
        .times(1)
        .returning(move |_| Ok(dir.clone()));
    downloader
}

fn outcome(pdf: bool, epub: bool) -> RenderOutcome {
    RenderOutcome {
        pdf: ArtifactOutcome {
            path: PathBuf::from("output/x.pdf"),
            success: pdf,
        },
        epub: ArtifactOutcome {
            path: PathBuf::from("output/x.epub"),
            success: epub,
        },
    }
}

#[tokio::test]
async fn missing_repository_url_fails_before_any_work() {
    for url in [None, Some("   ")] {
        let config = config(url);
        let mut downloader = MockDownloader::new();
        downloader.expect_download().never();
        let mut renderer = MockRenderer::new();
        renderer.expect_render().never();

        let pipeline = Pipeline::new(&config, &downloader, &renderer);
        let err = pipeline.try_run(&NoopReporter).await.unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)), "got {err:?}");

        let reporter = RecordingReporter::default();
        assert!(!pipeline.run(&reporter).await);
        assert_eq!(*reporter.finished.lock().unwrap(), Some(false));
    }
}

#[tokio::test]
async fn download_failure_skips_rendering() {
    let config = config(Some("https://example.com/owner/sample-repo.git"));
    let mut downloader = MockDownloader::new();
    downloader.expect_download().times(1).returning(|_| {
        Err(DownloadError::GitFailed {
            status: "exit status: 128".into(),
            stderr: "repository not found".into(),
        })
    });
    let mut renderer = MockRenderer::new();
    renderer.expect_render().never();

    let err = Pipeline::new(&config, &downloader, &renderer)
        .try_run(&NoopReporter)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Acquisition(_)), "got {err:?}");
}

#[tokio::test]
async fn downloader_returning_a_file_is_an_acquisition_failure() {
    let tmp = tempdir().unwrap();
    let file = tmp.path().join("not-a-dir");
    fs::write(&file, "x").unwrap();
    let config = config(Some("https://example.com/owner/sample-repo.git"));
    let downloader = downloader_returning(file);
    let mut renderer = MockRenderer::new();
    renderer.expect_render().never();

    let err = Pipeline::new(&config, &downloader, &renderer)
        .try_run(&NoopReporter)
        .await
        .unwrap_err();
    assert!(
        matches!(err, PipelineError::Acquisition(DownloadError::NotADirectory(_))),
        "got {err:?}"
    );
}

#[tokio::test]
async fn repository_without_matching_files_has_no_candidates() {
    let (_tmp, root) = checkout(&[("main.rs", "fn main() {}"), (".git/x.py", "x = 1")]);
    let config = config(Some("https://example.com/owner/sample-repo.git"));
    let downloader = downloader_returning(root);
    let mut renderer = MockRenderer::new();
    renderer.expect_render().never();

    let err = Pipeline::new(&config, &downloader, &renderer)
        .try_run(&NoopReporter)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoCandidates(_)), "got {err:?}");
}

#[tokio::test]
async fn only_empty_files_produce_no_chapters() {
    let (_tmp, root) = checkout(&[("a.py", ""), ("b.py", "   \n\n")]);
    let config = config(Some("https://example.com/owner/sample-repo.git"));
    let downloader = downloader_returning(root);
    let mut renderer = MockRenderer::new();
    renderer.expect_render().never();
    let reporter = RecordingReporter::default();

    let err = Pipeline::new(&config, &downloader, &renderer)
        .try_run(&reporter)
        .await
        .unwrap_err();
    match err {
        PipelineError::NoChapters { candidates } => assert_eq!(candidates, 2),
        other => panic!("expected NoChapters, got {other:?}"),
    }
    assert_eq!(*reporter.files.lock().unwrap(), vec![(1, 2), (2, 2)]);
}

#[tokio::test]
async fn happy_path_renders_chapters_in_selection_order() {
    let (_tmp, root) = checkout(&[
        ("README.md", "# Sample\n"),
        ("pkg/core.py", "def f():\n    return 1\n"),
        ("pkg/empty.py", ""),
        ("pkg/data.bin", "\x00\x01"),
    ]);
    let config = config(Some("https://example.com/owner/sample-repo.git"));
    let downloader = downloader_returning(root);

    let seen: Arc<Mutex<Option<(Vec<Chapter>, String)>>> = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&seen);
    let mut renderer = MockRenderer::new();
    renderer
        .expect_render()
        .times(1)
        .returning(move |chapters, base_name| {
            *captured.lock().unwrap() = Some((chapters.to_vec(), base_name.to_string()));
            Ok(outcome(true, true))
        });
    let reporter = RecordingReporter::default();

    let ok = Pipeline::new(&config, &downloader, &renderer)
        .run(&reporter)
        .await;

    assert!(ok);
    let (chapters, base_name) = seen.lock().unwrap().take().expect("renderer was called");
    assert_eq!(base_name, "sample-repo");
    let titles: Vec<&str> = chapters.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, ["README.md", "pkg > core.py"]);
    assert_eq!(chapters[1].content, "def f():\n    return 1");
    assert_eq!(chapters[1].source_path, PathBuf::from("pkg").join("core.py"));

    assert_eq!(
        *reporter.phases.lock().unwrap(),
        ["Cloning repository", "Scanning files", "Generating documents", "Done"]
    );
    assert_eq!(*reporter.files.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(*reporter.finished.lock().unwrap(), Some(true));
}

#[tokio::test]
async fn one_failed_document_fails_the_run() {
    for (pdf, epub) in [(false, true), (true, false), (false, false)] {
        let (_tmp, root) = checkout(&[("a.py", "print('hi')\n")]);
        let config = config(Some("https://example.com/owner/sample-repo.git"));
        let downloader = downloader_returning(root);
        let mut renderer = MockRenderer::new();
        renderer
            .expect_render()
            .times(1)
            .returning(move |_, _| Ok(outcome(pdf, epub)));

        let ok = Pipeline::new(&config, &downloader, &renderer)
            .run(&NoopReporter)
            .await;
        assert!(!ok, "pdf={pdf} epub={epub}");
    }
}
