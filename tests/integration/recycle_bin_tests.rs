use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use attic::model::{DeletedKey, Version};
use attic::storage::{
    ContentStore, DeletedContentStore, FileContentStore, FileDeletedContentStore,
    JsonVersionListSerializer,
};
use attic::test_utils::{FaultyContentStore, FaultyDeletedContentStore};
use attic::tx::ResourceKind;
use attic::AtticError;

use super::fixture::{document, files, reference};

/// Entries left under a recycle-bin directory, if it exists at all.
fn entries(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[test]
fn test_full_attachment_lifecycle() {
    let fixture = files();
    let adapter = fixture.adapter();
    let file = reference("docA/file.txt");

    let mut attachment = fixture.seed(&adapter, "docA/file.txt", b"hello");
    assert_eq!(adapter.load(&file).unwrap().content(), Some(&b"hello"[..]));

    attachment.set_content(b"world".to_vec(), None).unwrap();
    adapter.save(&mut attachment, true).unwrap();
    assert_eq!(attachment.archive().unwrap().len(), 2);

    let outcome = adapter.delete(&file, Some("alice"), true).unwrap();
    let key = outcome.deleted.expect("recycle bin record");
    assert!(adapter.load(&file).unwrap_err().is_not_found());
    assert!(adapter.list_attachments(&document("docA")).unwrap().is_empty());

    let records = adapter.list_deleted(&file).unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.key(), &key);
    assert_eq!(record.deleter(), Some("alice"));
    assert_eq!(record.versions().unwrap().len(), 2);
    assert_eq!(record.content().unwrap(), b"world");

    let mut restored = adapter.restore(record).unwrap();
    adapter.save(&mut restored, true).unwrap();
    let live = adapter.load(&file).unwrap();
    assert_eq!(live.content(), Some(&b"world"[..]));
    assert_eq!(live.version(), Version::new(1, 2));
    assert_eq!(
        adapter.list_attachments(&document("docA")).unwrap(),
        ["file.txt"]
    );

    adapter.purge(&key).unwrap();
    assert!(adapter.list_deleted(&file).unwrap().is_empty());
    assert!(!fixture
        .path(format!("docs/docA/deleted-attachments/file.txt-{}", key.millis()))
        .exists());
}

#[test]
fn test_restore_brings_back_full_history() {
    let fixture = files();
    let adapter = fixture.adapter();
    let file = reference("docA/file.txt");
    let mut attachment = fixture.seed(&adapter, "docA/file.txt", b"one");
    attachment.set_content(b"two".to_vec(), None).unwrap();
    adapter.save(&mut attachment, true).unwrap();
    attachment.set_content(b"three".to_vec(), None).unwrap();
    adapter.save(&mut attachment, true).unwrap();

    let key = adapter.delete(&file, None, true).unwrap().deleted.unwrap();
    let record = adapter.find_deleted(&key).unwrap();
    let mut restored = adapter.restore(&record).unwrap();
    adapter.save(&mut restored, true).unwrap();

    let mut live = adapter.load(&file).unwrap();
    adapter.load_archive(&mut live).unwrap();
    let contents: Vec<Vec<u8>> = live
        .archive()
        .unwrap()
        .iter()
        .map(|v| v.content.read().unwrap())
        .collect();
    assert_eq!(contents, [b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);

    // The record survives restoring.
    assert!(adapter.find_deleted(&key).is_ok());
}

#[test]
fn test_repeated_deletions_keep_distinct_records_newest_first() {
    let fixture = files();
    let adapter = fixture.adapter();
    let file = reference("docA/file.txt");

    let mut keys = Vec::new();
    for content in [&b"first"[..], b"second", b"third"] {
        fixture.seed(&adapter, "docA/file.txt", content);
        keys.push(adapter.delete(&file, None, true).unwrap().deleted.unwrap());
    }

    let records = adapter.list_deleted(&file).unwrap();
    assert_eq!(records.len(), 3);
    let listed: Vec<&DeletedKey> = records.iter().map(|r| r.key()).collect();
    assert_eq!(listed, [&keys[2], &keys[1], &keys[0]]);
    assert!(keys[0].millis() < keys[1].millis());
    assert!(keys[1].millis() < keys[2].millis());
    assert_eq!(records[0].content().unwrap(), b"third");
    assert_eq!(records[2].content().unwrap(), b"first");
}

#[test]
fn test_list_deleted_in_document_spans_attachments() {
    let fixture = files();
    let adapter = fixture.adapter();
    fixture.seed(&adapter, "docA/a.txt", b"A");
    fixture.seed(&adapter, "docA/b.txt", b"B");
    fixture.seed(&adapter, "docB/c.txt", b"C");
    for name in ["docA/a.txt", "docA/b.txt", "docB/c.txt"] {
        adapter.delete(&reference(name), None, true).unwrap();
    }

    let records = adapter.list_deleted_in(&document("docA")).unwrap();
    let mut names: Vec<&str> = records.iter().map(|r| r.reference().filename()).collect();
    names.sort_unstable();
    assert_eq!(names, ["a.txt", "b.txt"]);
    assert!(records[0].deleted_at() >= records[1].deleted_at());
}

#[test]
fn test_delete_missing_attachment_is_not_found() {
    let fixture = files();
    let adapter = fixture.adapter();
    let err = adapter
        .delete(&reference("docA/missing.txt"), None, true)
        .unwrap_err();
    assert!(matches!(err, AtticError::NotFound(_)));
    assert!(!fixture.path("docs/docA/deleted-attachments").exists());
}

#[test]
fn test_delete_permanently_leaves_no_record() {
    let fixture = files();
    let adapter = fixture.adapter();
    let file = reference("docA/file.txt");
    fixture.seed(&adapter, "docA/file.txt", b"hello");

    let outcome = adapter.delete_permanently(&file, true).unwrap();
    assert!(outcome.deleted.is_none());
    assert!(adapter.load(&file).unwrap_err().is_not_found());
    assert!(adapter.list_deleted(&file).unwrap().is_empty());
}

#[test]
fn test_disabled_recycle_bin_deletes_permanently() {
    let fixture = files();
    let adapter = fixture.adapter_with(|builder| builder.recycle_bin(false));
    let file = reference("docA/file.txt");
    fixture.seed(&adapter, "docA/file.txt", b"hello");

    let outcome = adapter.delete(&file, Some("alice"), true).unwrap();
    assert!(outcome.deleted.is_none());
    assert!(adapter.list_deleted(&file).unwrap().is_empty());
}

#[test]
fn test_purge_unknown_key_is_not_found() {
    let fixture = files();
    let adapter = fixture.adapter();
    let key: DeletedKey = "docA/file.txt@1700000000000".parse().unwrap();
    assert!(adapter.purge(&key).unwrap_err().is_not_found());
    assert!(adapter.find_deleted(&key).unwrap_err().is_not_found());
}

#[test]
fn test_dot_named_attachment_is_listed_in_recycle_bin() {
    let fixture = files();
    let adapter = fixture.adapter();
    let file = reference("docA/.env");
    fixture.seed(&adapter, "docA/.env", b"SECRET=1");

    let first = adapter.delete(&file, None, true).unwrap().deleted.unwrap();
    fixture.seed(&adapter, "docA/.env", b"SECRET=2");
    let second = adapter.delete(&file, None, true).unwrap().deleted.unwrap();
    assert!(first.millis() < second.millis());

    let records = adapter.list_deleted(&file).unwrap();
    let keys: Vec<&DeletedKey> = records.iter().map(|r| r.key()).collect();
    assert_eq!(keys, [&second, &first]);
    assert_eq!(records[1].content().unwrap(), b"SECRET=1");
    assert_eq!(adapter.list_deleted_in(&document("docA")).unwrap().len(), 2);

    adapter.purge(&first).unwrap();
    assert_eq!(adapter.list_deleted(&file).unwrap().len(), 1);
}

#[test]
fn test_failed_delete_restores_live_attachment() {
    let fixture = files();
    let inner: Arc<dyn ContentStore> =
        Arc::new(FileContentStore::new(fixture.layout(), ResourceKind::Unbound).unwrap());
    let faulty = FaultyContentStore::new(inner);
    let fail = faulty.delete_switch();
    let adapter = fixture.adapter_with(|builder| builder.content(Arc::new(faulty)));
    let file = reference("docA/file.txt");

    let mut attachment = fixture.seed(&adapter, "docA/file.txt", b"hello");
    attachment.set_content(b"world".to_vec(), None).unwrap();
    adapter.save(&mut attachment, true).unwrap();

    fail.store(true, Ordering::SeqCst);
    let err = adapter.delete(&file, Some("alice"), true).unwrap_err();
    assert!(matches!(err, AtticError::TransactionFailed { .. }));
    assert!(matches!(err.root_cause(), AtticError::Io(_)));

    // Every live facet is back and the recycle bin holds nothing.
    let mut live = adapter.load(&file).unwrap();
    assert_eq!(live.content(), Some(&b"world"[..]));
    assert_eq!(live.version(), Version::new(1, 2));
    adapter.load_archive(&mut live).unwrap();
    assert_eq!(live.archive().unwrap().len(), 2);
    assert_eq!(
        adapter.list_attachments(&document("docA")).unwrap(),
        ["file.txt"]
    );
    assert!(adapter.list_deleted(&file).unwrap().is_empty());
    assert!(entries(&fixture.path("docs/docA/deleted-attachments")).is_empty());

    fail.store(false, Ordering::SeqCst);
    adapter.delete(&file, None, true).unwrap();
    assert_eq!(adapter.list_deleted(&file).unwrap().len(), 1);
}

#[test]
fn test_failed_purge_keeps_the_record() {
    let fixture = files();
    let inner: Arc<dyn DeletedContentStore> = Arc::new(
        FileDeletedContentStore::new(
            fixture.layout(),
            ResourceKind::Unbound,
            Arc::new(JsonVersionListSerializer),
        )
        .unwrap(),
    );
    let faulty = FaultyDeletedContentStore::new(inner);
    let fail = faulty.switch();
    let adapter = fixture.adapter_with(|builder| builder.deleted_content(Arc::new(faulty)));
    let file = reference("docA/file.txt");
    fixture.seed(&adapter, "docA/file.txt", b"hello");
    let key = adapter.delete(&file, Some("alice"), true).unwrap().deleted.unwrap();

    fail.store(true, Ordering::SeqCst);
    let err = adapter.purge(&key).unwrap_err();
    assert!(matches!(err, AtticError::TransactionFailed { .. }));

    let record = adapter.find_deleted(&key).unwrap();
    assert_eq!(record.deleter(), Some("alice"));
    assert_eq!(record.content().unwrap(), b"hello");
    assert_eq!(
        entries(&fixture.path("docs/docA/deleted-attachments")),
        [format!("file.txt-{}", key.millis())]
    );

    fail.store(false, Ordering::SeqCst);
    adapter.purge(&key).unwrap();
    assert!(adapter.list_deleted(&file).unwrap().is_empty());
}

#[test]
fn test_restore_over_live_attachment_replaces_its_history() {
    let fixture = files();
    let adapter = fixture.adapter();
    let file = reference("docA/file.txt");
    let mut attachment = fixture.seed(&adapter, "docA/file.txt", b"one");
    attachment.set_content(b"two".to_vec(), None).unwrap();
    adapter.save(&mut attachment, true).unwrap();
    let key = adapter.delete(&file, None, true).unwrap().deleted.unwrap();

    let mut live = fixture.seed(&adapter, "docA/file.txt", b"a");
    for content in [&b"b"[..], b"c"] {
        live.set_content(content.to_vec(), None).unwrap();
        adapter.save(&mut live, true).unwrap();
    }
    let stale = fixture.path("docs/docA/attachments/file.txt/v1.3");
    assert!(stale.exists());

    let record = adapter.find_deleted(&key).unwrap();
    let mut restored = adapter.restore(&record).unwrap();
    adapter.save(&mut restored, true).unwrap();

    let mut loaded = adapter.load(&file).unwrap();
    assert_eq!(loaded.content(), Some(&b"two"[..]));
    assert_eq!(loaded.version(), Version::new(1, 2));
    adapter.load_archive(&mut loaded).unwrap();
    let contents: Vec<Vec<u8>> = loaded
        .archive()
        .unwrap()
        .iter()
        .map(|v| v.content.read().unwrap())
        .collect();
    assert_eq!(contents, [b"one".to_vec(), b"two".to_vec()]);
    assert!(!stale.exists());
}
