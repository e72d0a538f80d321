use std::sync::atomic::Ordering;
use std::sync::Arc;

use attic::adapter::Operation;
use attic::config::Config;
use attic::fs::StoreLayout;
use attic::model::{Attachment, Version};
use attic::storage::{ContentStore, FileContentStore};
use attic::test_utils::FaultyContentStore;
use attic::tx::ResourceKind;
use attic::AtticError;

use super::fixture::{document, files, reference, sqlite_backed};

#[test]
fn test_sqlite_with_unlocked_files_is_one_transaction() {
    let fixture = files();
    let adapter = sqlite_backed(&fixture, |builder| builder);

    for operation in Operation::ALL {
        let plan = adapter.plan(operation, true);
        assert!(plan.is_atomic(), "{operation:?} planned as {plan}");
    }

    let mut attachment = fixture.seed(&adapter, "docA/file.txt", b"hello");
    attachment.set_content(b"world".to_vec(), None).unwrap();
    let outcome = adapter.save(&mut attachment, true).unwrap();
    assert!(outcome.atomic);
    assert_eq!(outcome.transactions, 1);
    assert_eq!(
        adapter.list_attachments(&document("docA")).unwrap(),
        ["file.txt"]
    );
}

#[test]
fn test_failed_save_rolls_back_database_and_files() {
    let fixture = files();
    let layout = Arc::new(StoreLayout::new(&fixture.root));
    let inner: Arc<dyn ContentStore> =
        Arc::new(FileContentStore::new(layout, ResourceKind::Unbound).unwrap());
    let faulty = FaultyContentStore::new(inner);
    let fail = faulty.switch();
    let adapter = sqlite_backed(&fixture, |builder| builder.content(Arc::new(faulty)));

    let mut attachment = fixture.seed(&adapter, "docA/file.txt", b"hello");
    attachment.set_content(b"world".to_vec(), None).unwrap();
    fail.store(true, Ordering::SeqCst);

    let err = adapter.save(&mut attachment, true).unwrap_err();
    assert!(matches!(err, AtticError::TransactionFailed { .. }));
    assert!(matches!(err.root_cause(), AtticError::Io(_)));

    fail.store(false, Ordering::SeqCst);
    let mut loaded = adapter.load(&reference("docA/file.txt")).unwrap();
    assert_eq!(loaded.content(), Some(&b"hello"[..]));
    assert_eq!(loaded.version(), Version::INITIAL);
    adapter.load_archive(&mut loaded).unwrap();
    assert_eq!(loaded.archive().unwrap().len(), 1);
}

#[test]
fn test_failed_first_save_leaves_nothing_behind() {
    let fixture = files();
    let layout = Arc::new(StoreLayout::new(&fixture.root));
    let inner: Arc<dyn ContentStore> =
        Arc::new(FileContentStore::new(layout, ResourceKind::Unbound).unwrap());
    let faulty = FaultyContentStore::new(inner);
    faulty.switch().store(true, Ordering::SeqCst);
    let adapter = sqlite_backed(&fixture, |builder| builder.content(Arc::new(faulty)));

    let mut attachment = Attachment::new(reference("docA/file.txt"), b"hello".to_vec());
    adapter.save(&mut attachment, true).unwrap_err();

    assert!(adapter.load(&reference("docA/file.txt")).unwrap_err().is_not_found());
    assert!(adapter.list_attachments(&document("docA")).unwrap().is_empty());
    assert!(!fixture.path("docs/docA/attachments").exists());
}

#[test]
fn test_recycle_bin_in_sqlite() {
    let fixture = files();
    let adapter = sqlite_backed(&fixture, |builder| builder);
    let file = reference("docA/file.txt");
    fixture.seed(&adapter, "docA/file.txt", b"first");
    let first = adapter.delete(&file, Some("carol"), true).unwrap().deleted.unwrap();
    fixture.seed(&adapter, "docA/file.txt", b"second");
    let second = adapter.delete(&file, None, true).unwrap().deleted.unwrap();

    let records = adapter.list_deleted_in(&document("docA")).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].key(), &second);
    assert_eq!(records[1].key(), &first);
    assert_eq!(records[1].deleter(), Some("carol"));
    assert_eq!(records[1].content().unwrap(), b"first");

    adapter.purge(&first).unwrap();
    assert_eq!(adapter.list_deleted(&file).unwrap().len(), 1);
}

#[test]
fn test_config_selects_sqlite_backends() {
    let fixture = files();
    let config = Config::load_with(None, Some(&fixture.root), |key| match key {
        "ATTIC_METADATA_BACKEND" | "ATTIC_DELETED_BACKEND" => Some("sqlite".to_string()),
        _ => None,
    })
    .unwrap();
    let adapter = config.build_adapter().unwrap();

    assert!(adapter.plan(Operation::Delete, true).is_atomic());
    fixture.seed(&adapter, "docA/file.txt", b"hello");
    assert!(fixture.path("attic.db").exists());
    assert!(!fixture.path("docs/docA/attachments/file.txt/meta.json").exists());
    assert!(fixture.path("docs/docA/attachments/file.txt/content").exists());
}
