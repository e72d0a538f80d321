use std::sync::atomic::Ordering;
use std::sync::Arc;

use attic::adapter::{Facet, Operation};
use attic::fs::StoreLayout;
use attic::model::Attachment;
use attic::storage::{ContentStore, FileContentStore};
use attic::test_utils::logging::capture_warnings;
use attic::test_utils::FaultyContentStore;
use attic::tx::ResourceKind;
use attic::AtticError;

use super::fixture::{files, locked_files, reference, sqlite_backed};

#[test]
fn test_sqlite_metadata_with_locked_files_degrades() {
    let fixture = locked_files();
    let adapter = sqlite_backed(&fixture, |builder| builder);

    let plan = adapter.plan(Operation::Save, true);
    assert!(!plan.is_atomic());
    assert_eq!(
        plan.to_string(),
        "sqlite[metadata, container] -> filesystem[content, archive]"
    );

    // Still fully functional, one transaction per backend.
    let mut attachment = fixture.seed(&adapter, "docA/file.txt", b"hello");
    attachment.set_content(b"world".to_vec(), None).unwrap();
    let outcome = adapter.save(&mut attachment, true).unwrap();
    assert!(!outcome.atomic);
    assert_eq!(outcome.transactions, 2);

    let key = adapter
        .delete(&reference("docA/file.txt"), None, true)
        .unwrap()
        .deleted
        .unwrap();
    let record = adapter.find_deleted(&key).unwrap();
    assert_eq!(record.content().unwrap(), b"world");
    assert_eq!(record.versions().unwrap().len(), 2);
}

#[test]
fn test_failure_in_later_group_reports_partial_commit() {
    let fixture = locked_files();
    let layout = Arc::new(StoreLayout::new(&fixture.root));
    let inner: Arc<dyn ContentStore> =
        Arc::new(FileContentStore::new(layout, ResourceKind::Filesystem).unwrap());
    let faulty = FaultyContentStore::new(inner);
    let fail = faulty.switch();
    let adapter = sqlite_backed(&fixture, |builder| builder.content(Arc::new(faulty)));

    fail.store(true, Ordering::SeqCst);
    let mut attachment = Attachment::new(reference("docA/file.txt"), b"hello".to_vec());
    let err = adapter.save(&mut attachment, true).unwrap_err();

    match &err {
        AtticError::PartialCompositeFailure {
            committed,
            failed,
            pending,
            ..
        } => {
            assert_eq!(committed, &[Facet::Metadata, Facet::Container]);
            assert_eq!(failed, &[Facet::Content, Facet::Archive]);
            assert!(pending.is_empty());
        }
        other => panic!("expected a partial failure, got {other:?}"),
    }
    assert!(matches!(err.root_cause(), AtticError::Io(_)));
    assert!(attachment.is_content_dirty());

    // The filesystem group rolled back; the database group stayed committed.
    assert!(!fixture
        .path("docs/docA/attachments/file.txt/content")
        .exists());
    let err = adapter.load(&reference("docA/file.txt")).unwrap_err();
    assert!(matches!(err, AtticError::StorageCorrupted(_)));

    // Saving again once the fault clears repairs the attachment.
    fail.store(false, Ordering::SeqCst);
    adapter.save(&mut attachment, true).unwrap();
    let loaded = adapter.load(&reference("docA/file.txt")).unwrap();
    assert_eq!(loaded.content(), Some(&b"hello"[..]));
}

#[test]
fn test_reads_report_the_underlying_error() {
    let fixture = locked_files();
    let adapter = sqlite_backed(&fixture, |builder| builder);

    let err = adapter.load(&reference("docA/missing.txt")).unwrap_err();
    assert!(matches!(err, AtticError::NotFound(_)));
}

#[test]
fn test_degraded_plan_is_warned_about_once_per_shape() {
    let fixture = locked_files();

    let (_, warnings) = capture_warnings(|| {
        let adapter = sqlite_backed(&fixture, |builder| builder);
        adapter.plan(Operation::Save, true);
        adapter.plan(Operation::Save, true);
        let mut attachment = fixture.seed(&adapter, "docA/file.txt", b"hello");
        attachment.set_content(b"world".to_vec(), None).unwrap();
        adapter.save(&mut attachment, true).unwrap();
        adapter.load(&reference("docA/file.txt")).unwrap();
        adapter.load(&reference("docA/file.txt")).unwrap();
    });

    let count = |plan: &str| {
        warnings
            .iter()
            .filter(|w| w.contains("without a shared transaction") && w.contains(plan))
            .count()
    };
    assert_eq!(
        count("plan=sqlite[metadata, container] -> filesystem[content, archive]"),
        1,
        "{warnings:?}"
    );
    assert_eq!(count("plan=sqlite[metadata] -> filesystem[content]"), 1, "{warnings:?}");
}

#[test]
fn test_atomic_configuration_warns_nothing() {
    let fixture = files();

    let (_, warnings) = capture_warnings(|| {
        let adapter = sqlite_backed(&fixture, |builder| builder);
        fixture.seed(&adapter, "docA/file.txt", b"hello");
        adapter.load(&reference("docA/file.txt")).unwrap();
    });

    assert!(
        !warnings.iter().any(|w| w.contains("without a shared transaction")),
        "{warnings:?}"
    );
}
