use std::time::Duration;

use attic::adapter::Operation;
use attic::fs::StoreLock;
use attic::model::{Attachment, Version};
use attic::AtticError;

use super::fixture::{document, files, locked_files, reference};

#[test]
fn test_save_then_load_returns_content() {
    let fixture = files();
    let adapter = fixture.adapter();
    fixture.seed(&adapter, "docA/file.txt", b"hello");

    let loaded = adapter.load(&reference("docA/file.txt")).unwrap();
    assert_eq!(loaded.content(), Some(&b"hello"[..]));
    assert_eq!(loaded.version(), Version::INITIAL);
    assert!(!loaded.is_content_dirty());
    assert_eq!(
        adapter.list_attachments(&document("docA")).unwrap(),
        vec!["file.txt".to_string()]
    );
}

#[test]
fn test_second_save_appends_to_archive() {
    let fixture = files();
    let adapter = fixture.adapter();
    fixture.seed(&adapter, "docA/file.txt", b"hello");

    let mut attachment = adapter.load(&reference("docA/file.txt")).unwrap();
    attachment.set_content(b"world".to_vec(), Some("bob")).unwrap();
    adapter.save(&mut attachment, true).unwrap();

    let mut reloaded = adapter.load(&reference("docA/file.txt")).unwrap();
    assert_eq!(reloaded.content(), Some(&b"world"[..]));
    assert_eq!(reloaded.version(), Version::new(1, 2));
    assert_eq!(reloaded.metadata().author.as_deref(), Some("bob"));

    adapter.load_archive(&mut reloaded).unwrap();
    let archive = reloaded.archive().unwrap();
    assert_eq!(archive.len(), 2);
    assert_eq!(archive[0].version(), Version::new(1, 1));
    assert_eq!(archive[0].content.read().unwrap(), b"hello");
    assert_eq!(archive[1].version(), Version::new(1, 2));
    assert_eq!(archive[1].content.read().unwrap(), b"world");
}

#[test]
fn test_unchanged_content_is_not_rewritten() {
    let fixture = files();
    let adapter = fixture.adapter();
    fixture.seed(&adapter, "docA/file.txt", b"hello");

    let content_path = fixture.path("docs/docA/attachments/file.txt/content");
    let before = std::fs::metadata(&content_path).unwrap().modified().unwrap();
    std::thread::sleep(Duration::from_millis(20));

    let mut attachment = adapter.load(&reference("docA/file.txt")).unwrap();
    adapter.save(&mut attachment, true).unwrap();

    let after = std::fs::metadata(&content_path).unwrap().modified().unwrap();
    assert_eq!(before, after);
    assert_eq!(attachment.version(), Version::INITIAL);
}

#[test]
fn test_save_all_skips_attachments_without_content() {
    let fixture = files();
    let adapter = fixture.adapter();
    let seeded = fixture.seed(&adapter, "docA/a.txt", b"A");

    let mut batch = vec![
        Attachment::from_metadata(seeded.metadata().clone()),
        Attachment::new(reference("docA/b.txt"), b"B".to_vec()),
    ];
    adapter.save_all(&document("docA"), &mut batch, true).unwrap();

    let mut names = adapter.list_attachments(&document("docA")).unwrap();
    names.sort();
    assert_eq!(names, ["a.txt", "b.txt"]);
    assert_eq!(
        adapter.load(&reference("docA/a.txt")).unwrap().content(),
        Some(&b"A"[..])
    );
}

#[test]
fn test_save_all_rejects_foreign_attachments() {
    let fixture = files();
    let adapter = fixture.adapter();
    let mut batch = vec![Attachment::new(reference("docB/x.txt"), b"x".to_vec())];

    let err = adapter
        .save_all(&document("docA"), &mut batch, true)
        .unwrap_err();
    assert!(matches!(err, AtticError::InvalidReference(_)));
    assert!(!fixture.path("docs/docB").exists());
}

#[test]
fn test_load_missing_attachment_is_not_found() {
    let fixture = files();
    let adapter = fixture.adapter();
    let err = adapter.load(&reference("docA/missing.txt")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_load_with_metadata_but_no_content_is_corrupted() {
    let fixture = files();
    let adapter = fixture.adapter();
    fixture.seed(&adapter, "docA/file.txt", b"hello");
    std::fs::remove_file(fixture.path("docs/docA/attachments/file.txt/content")).unwrap();

    let err = adapter.load(&reference("docA/file.txt")).unwrap_err();
    assert!(matches!(err, AtticError::StorageCorrupted(_)));
}

#[test]
fn test_delete_archive_keeps_live_attachment() {
    let fixture = files();
    let adapter = fixture.adapter();
    let mut attachment = fixture.seed(&adapter, "docA/file.txt", b"hello");
    attachment.set_content(b"world".to_vec(), None).unwrap();
    adapter.save(&mut attachment, true).unwrap();

    adapter.delete_archive(&attachment).unwrap();

    let mut loaded = adapter.load(&reference("docA/file.txt")).unwrap();
    assert_eq!(loaded.content(), Some(&b"world"[..]));
    adapter.load_archive(&mut loaded).unwrap();
    let archive = loaded.archive().unwrap();
    assert_eq!(archive.len(), 1);
    assert_eq!(archive[0].version(), Version::new(1, 2));
}

#[test]
fn test_locked_file_stores_run_atomically() {
    let fixture = locked_files();
    let adapter = fixture.adapter();
    assert!(adapter.plan(Operation::Save, true).is_atomic());

    fixture.seed(&adapter, "docA/file.txt", b"hello");
    let loaded = adapter.load(&reference("docA/file.txt")).unwrap();
    assert_eq!(loaded.content(), Some(&b"hello"[..]));
    assert!(StoreLock::try_acquire(&fixture.root).unwrap().is_some());
}

#[test]
fn test_concurrent_saves_leave_consistent_history() {
    let fixture = files();
    let adapter = fixture.adapter();
    fixture.seed(&adapter, "docA/file.txt", b"v0");

    std::thread::scope(|scope| {
        for i in 0..4 {
            let adapter = &adapter;
            scope.spawn(move || {
                let mut attachment = adapter.load(&reference("docA/file.txt")).unwrap();
                attachment.set_content(format!("v{}", i + 1).into_bytes(), None).unwrap();
                adapter.save(&mut attachment, true).unwrap();
            });
        }
    });

    let mut loaded = adapter.load(&reference("docA/file.txt")).unwrap();
    adapter.load_archive(&mut loaded).unwrap();
    let archive = loaded.archive().unwrap();
    assert!(archive.len() >= 2);
    assert_eq!(archive.last().unwrap().version(), loaded.version());
}

#[test]
fn test_save_archive_writes_history_only() {
    let fixture = files();
    let adapter = fixture.adapter();
    let file = reference("docA/file.txt");
    let mut attachment = fixture.seed(&adapter, "docA/file.txt", b"hello");

    adapter.load_archive(&mut attachment).unwrap();
    attachment.set_content(b"draft".to_vec(), None).unwrap();
    let outcome = adapter.save_archive(&attachment).unwrap();
    assert!(outcome.atomic);

    // Metadata and content still hold the last saved version.
    let mut live = adapter.load(&file).unwrap();
    assert_eq!(live.content(), Some(&b"hello"[..]));
    assert_eq!(live.version(), Version::INITIAL);

    adapter.load_archive(&mut live).unwrap();
    let archive = live.archive().unwrap();
    assert_eq!(archive.len(), 2);
    assert_eq!(archive[1].version(), Version::new(1, 2));
    assert_eq!(archive[1].content.read().unwrap(), b"draft");
}

#[test]
fn test_save_archive_rebuilds_deleted_history() {
    let fixture = files();
    let adapter = fixture.adapter();
    let file = reference("docA/file.txt");
    let mut attachment = fixture.seed(&adapter, "docA/file.txt", b"hello");
    attachment.set_content(b"world".to_vec(), None).unwrap();
    adapter.save(&mut attachment, true).unwrap();

    let mut loaded = adapter.load(&file).unwrap();
    adapter.load_archive(&mut loaded).unwrap();
    adapter.delete_archive(&loaded).unwrap();
    assert!(!fixture.path("docs/docA/attachments/file.txt/versions.json").exists());

    // The in-memory history was loaded before deletion and is still complete.
    adapter.save_archive(&attachment).unwrap();
    let mut reloaded = adapter.load(&file).unwrap();
    adapter.load_archive(&mut reloaded).unwrap();
    let contents: Vec<Vec<u8>> = reloaded
        .archive()
        .unwrap()
        .iter()
        .map(|v| v.content.read().unwrap())
        .collect();
    assert_eq!(contents, [b"hello".to_vec(), b"world".to_vec()]);
}
