//! Property-based tests for rollback: a failing unit leaves no trace.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use proptest::prelude::*;
use tempfile::TempDir;

use attic::fs::{FileDeleter, FileSaver};
use attic::tx::{DetachedProvider, ResourceKind, RootTransaction, UnitOfWork};
use attic::AtticError;

#[derive(Debug, Clone)]
enum Step {
    Save { file: usize, bytes: Vec<u8> },
    Delete { file: usize },
}

fn arb_step(files: usize) -> impl Strategy<Value = Step> {
    prop_oneof![
        (0..files, prop::collection::vec(any::<u8>(), 0..64))
            .prop_map(|(file, bytes)| Step::Save { file, bytes }),
        (0..files).prop_map(|file| Step::Delete { file }),
    ]
}

fn target(dir: &Path, file: usize) -> PathBuf {
    dir.join(format!("nested-{}", file % 2)).join(format!("f{file}"))
}

/// Every regular file under `dir` with its bytes, sorted by path.
fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    fn walk(dir: &Path, out: &mut Vec<(PathBuf, Vec<u8>)>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                out.push((path.clone(), Vec::new()));
                walk(&path, out);
            } else {
                out.push((path.clone(), std::fs::read(&path).unwrap()));
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, &mut out);
    out.sort();
    out
}

fn unit(dir: &Path, step: &Step) -> UnitOfWork {
    match step {
        Step::Save { file, bytes } => {
            FileSaver::new(target(dir, *file), bytes.clone()).into_unit(ResourceKind::Unbound)
        }
        Step::Delete { file } => FileDeleter::new(target(dir, *file)).into_unit(ResourceKind::Unbound),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn failing_unit_restores_every_file(
        existing in prop::collection::vec(prop::option::of(prop::collection::vec(any::<u8>(), 0..32)), 4),
        steps in prop::collection::vec(arb_step(4), 1..8),
        fail_at in 0usize..8,
    ) {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        for (file, bytes) in existing.iter().enumerate() {
            if let Some(bytes) = bytes {
                let path = target(dir, file);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(&path, bytes).unwrap();
            }
        }
        let before = snapshot(dir);

        let fail_at = fail_at % (steps.len() + 1);
        let mut root = RootTransaction::new("property", Arc::new(DetachedProvider));
        for (i, step) in steps.iter().enumerate() {
            if i == fail_at {
                root.attach(UnitOfWork::from_fn("fail", || {
                    Err(AtticError::InvalidState("injected".to_string()))
                }))
                .unwrap();
            }
            root.attach(unit(dir, step)).unwrap();
        }
        if fail_at == steps.len() {
            root.attach(UnitOfWork::from_fn("fail", || {
                Err(AtticError::InvalidState("injected".to_string()))
            }))
            .unwrap();
        }

        let err = root.start().unwrap_err();
        let is_transaction_failure = matches!(err, AtticError::TransactionFailed { .. });
        prop_assert!(is_transaction_failure);
        prop_assert_eq!(snapshot(dir), before);
    }

    #[test]
    fn committed_saves_leave_last_write(
        steps in prop::collection::vec(arb_step(3), 1..8),
    ) {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();

        for step in &steps {
            let mut root = RootTransaction::new("property", Arc::new(DetachedProvider));
            root.attach(unit(dir, step)).unwrap();
            root.start().unwrap();
        }

        for file in 0..3 {
            let last = steps.iter().rev().find(|s| match s {
                Step::Save { file: f, .. } | Step::Delete { file: f } => *f == file,
            });
            let on_disk = std::fs::read(target(dir, file)).ok();
            match last {
                Some(Step::Save { bytes, .. }) => prop_assert_eq!(on_disk.as_ref(), Some(bytes)),
                _ => prop_assert!(on_disk.is_none()),
            }
        }
        // No temp or backup files survive a commit.
        let leftovers = snapshot(dir)
            .into_iter()
            .filter(|(path, _)| {
                path.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with('.'))
            })
            .count();
        prop_assert_eq!(leftovers, 0);
    }
}
