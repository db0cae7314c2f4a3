use std::collections::BTreeSet;
use std::fs::{self, create_dir_all, File};
use std::io::Write;
use std::path::Path;

use source_reader_core::config::SelectionPolicy;
use source_reader_core::select::FileSelector;
use tempfile::tempdir;

fn write_file(path: &Path, size: usize) {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).unwrap();
    }
    let mut f = File::create(path).unwrap();
    f.write_all(&vec![b'x'; size]).unwrap();
}

fn policy(extensions: &[&str], excluded_dirs: &[&str]) -> SelectionPolicy {
    SelectionPolicy {
        accepted_extensions: extensions.iter().map(|s| s.to_string()).collect(),
        excluded_dir_names: excluded_dirs.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

fn relative_paths(root: &Path, policy: &SelectionPolicy) -> Vec<String> {
    FileSelector::new(policy)
        .select(root)
        .expect("selection should succeed")
        .into_iter()
        .map(|c| {
            c.path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

#[test]
fn size_limit_pruned_directory_and_extension_together() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    write_file(&root.join("a.py"), 50);
    write_file(&root.join("b.bin"), 2 * 1024 * 1024);
    write_file(&root.join(".git/config"), 20);

    let policy = SelectionPolicy {
        max_file_size_bytes: 1024 * 1024,
        ..policy(&[".py"], &[".git"])
    };

    assert_eq!(relative_paths(root, &policy), vec!["a.py"]);
}

#[test]
fn never_returns_paths_under_excluded_directories() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    write_file(&root.join("src/lib.py"), 10);
    write_file(&root.join("node_modules/pkg/index.py"), 10);
    write_file(&root.join("src/node_modules/deep.py"), 10);
    write_file(&root.join("vendor/.git/hooks/hook.py"), 10);

    let policy = policy(&[".py"], &["node_modules", ".git"]);
    let paths = relative_paths(root, &policy);

    assert!(paths.contains(&"src/lib.py".to_string()));
    assert!(paths.iter().all(|p| !p.contains("node_modules")));
    assert!(paths.iter().all(|p| !p.contains(".git")));
    assert_eq!(paths.len(), 1);
}

#[test]
fn caps_the_number_of_files() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    for i in 0..10 {
        write_file(&root.join(format!("f{i}.rs")), 5);
        write_file(&root.join(format!("nested/g{i}.rs")), 5);
    }

    let policy = SelectionPolicy {
        max_file_count: 3,
        ..policy(&[".rs"], &[])
    };
    assert_eq!(relative_paths(root, &policy).len(), 3);

    let zero = SelectionPolicy {
        max_file_count: 0,
        ..policy.clone()
    };
    assert!(relative_paths(root, &zero).is_empty());
}

#[test]
fn size_limit_is_inclusive() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    write_file(&root.join("exact.txt"), 100);
    write_file(&root.join("over.txt"), 101);

    let policy = SelectionPolicy {
        max_file_size_bytes: 100,
        ..policy(&[".txt"], &[])
    };
    let selected = FileSelector::new(&policy).select(root).unwrap();
    assert_eq!(selected.len(), 1);
    assert!(selected[0].path.ends_with("exact.txt"));
    assert_eq!(selected[0].size_bytes, 100);
    assert!(selected.iter().all(|c| c.size_bytes <= policy.max_file_size_bytes));
}

#[test]
fn excluded_file_names_and_case_sensitive_extensions() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    write_file(&root.join("package-lock.json"), 10);
    write_file(&root.join("package.json"), 10);
    write_file(&root.join("UPPER.JSON"), 10);

    let policy = SelectionPolicy {
        excluded_file_names: BTreeSet::from(["package-lock.json".to_string()]),
        ..policy(&[".json"], &[])
    };
    assert_eq!(relative_paths(root, &policy), vec!["package.json"]);
}

#[test]
fn files_of_a_directory_come_before_its_subdirectories() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    write_file(&root.join("a/inner.py"), 10);
    write_file(&root.join("z.py"), 10);
    write_file(&root.join("a/b/deeper.py"), 10);

    let paths = relative_paths(root, &policy(&[".py"], &[]));
    assert_eq!(paths.len(), 3);
    let pos = |name: &str| paths.iter().position(|p| p == name).unwrap();
    assert!(pos("z.py") < pos("a/inner.py"));
    assert!(pos("a/inner.py") < pos("a/b/deeper.py"));
}

#[test]
fn missing_root_is_an_error() {
    let tmp = tempdir().unwrap();
    let missing = tmp.path().join("does-not-exist");
    let policy = policy(&[".py"], &[]);
    assert!(FileSelector::new(&policy).select(&missing).is_err());
}

#[cfg(unix)]
#[test]
fn symlinked_directories_are_not_followed() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("repo");
    let outside = tmp.path().join("outside");
    write_file(&outside.join("secret.py"), 10);
    write_file(&root.join("main.py"), 10);
    std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

    let paths = relative_paths(&root, &policy(&[".py"], &[]));
    assert_eq!(paths, vec!["main.py"]);
    assert!(fs::metadata(root.join("link/secret.py")).is_ok());
}
