mod common;

use common::{file_names, recorder, wait_final, FailingFile, UnavailableHistory};
use media_import_core::history::record_entries;
use media_import_core::{
    ContentIdentity, Disposition, Error, FileHandle, ImportHistory, ImportMetadata,
    InMemoryFile, InMemoryImportHistory, MediaScanner, ScanEvent, ScanMode, ScanObserver,
    ScanResult, ScannerConfig,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn scanner_with(history: Arc<dyn ImportHistory>) -> MediaScanner {
    MediaScanner::new(&ScannerConfig::default(), history).unwrap()
}

fn in_memory(name: &str, content: &str) -> Arc<dyn FileHandle> {
    Arc::new(InMemoryFile::new(name, content))
}

/// A = "H1", B = "H1", C = "H2"
fn abc() -> Vec<Arc<dyn FileHandle>> {
    vec![
        in_memory("A.jpg", "H1"),
        in_memory("B.jpg", "H1"),
        in_memory("C.jpg", "H2"),
    ]
}

#[tokio::test]
async fn test_scan_duplicate_within_one_scan() {
    let scanner = scanner_with(Arc::new(InMemoryImportHistory::new()));
    let result = scanner.scan_files(abc(), ScanMode::ContentHash).unwrap();
    let result = wait_final(&result).await;

    assert!(result.is_final());
    assert!(!result.is_canceled());
    assert_eq!(file_names(&result.file_entries()), vec!["A.jpg", "C.jpg"]);
    let dups = result.duplicate_entries();
    assert_eq!(file_names(&dups), vec!["B.jpg"]);
    assert_eq!(dups[0].disposition(), Disposition::ScanDuplicate);
    assert_eq!(dups[0].identity(), &ContentIdentity::of_bytes(b"H1"));

    let stats = result.statistics();
    assert_eq!(stats.new_file_count, 2);
    assert_eq!(stats.total_size_bytes, 4);
    assert_eq!(stats.duplicates.get(&Disposition::ScanDuplicate), Some(&1));
    assert_eq!(stats.candidates.total, Some(3));
    assert_eq!(stats.candidates.processed, 3);
    assert_eq!(stats.progress, 1.0);
}

#[tokio::test]
async fn test_history_duplicate_takes_precedence() {
    let history = Arc::new(InMemoryImportHistory::new());
    let previous = InMemoryFile::new("/card/old/B.jpg", "H2");
    history
        .record(
            &ContentIdentity::of_bytes(b"H2"),
            &ImportMetadata::from_handle(&previous),
        )
        .unwrap();

    let scanner = scanner_with(history);
    let result = scanner.scan_files(abc(), ScanMode::ContentHash).unwrap();
    let result = wait_final(&result).await;

    assert_eq!(file_names(&result.file_entries()), vec!["A.jpg"]);
    let dups = result.duplicate_entries();
    assert_eq!(file_names(&dups), vec!["B.jpg", "C.jpg"]);
    assert_eq!(dups[0].disposition(), Disposition::ScanDuplicate);
    assert_eq!(dups[1].disposition(), Disposition::HistoryDuplicate);

    let stats = result.statistics();
    assert_eq!(stats.duplicates.get(&Disposition::HistoryDuplicate), Some(&1));
    assert_eq!(stats.duplicates.get(&Disposition::ScanDuplicate), Some(&1));
}

#[tokio::test]
async fn test_copies_of_history_content_yield_one_canonical_entry() {
    let history = Arc::new(InMemoryImportHistory::new());
    let identity = ContentIdentity::of_bytes(b"H2");
    history
        .record(&identity, &ImportMetadata::from_handle(&InMemoryFile::new("/old.jpg", "H2")))
        .unwrap();

    let scanner = scanner_with(history);
    let files = vec![in_memory("x.jpg", "H2"), in_memory("y.jpg", "H2"), in_memory("z.jpg", "H2")];
    let result = wait_final(&scanner.scan_files(files, ScanMode::ContentHash).unwrap()).await;

    let dispositions: Vec<_> = result
        .duplicate_entries()
        .iter()
        .map(|entry| entry.disposition())
        .collect();
    assert_eq!(
        dispositions,
        vec![
            Disposition::HistoryDuplicate,
            Disposition::ScanDuplicate,
            Disposition::ScanDuplicate,
        ]
    );
    assert!(result.file_entries().is_empty());
}

#[test]
fn test_scan_files_rejects_empty_and_unsupported() {
    let scanner = scanner_with(Arc::new(InMemoryImportHistory::new()));

    let empty = scanner.scan_files(Vec::new(), ScanMode::ContentHash);
    assert!(matches!(empty, Err(Error::InvalidArgument(_))));

    let mixed = vec![in_memory("a.jpg", "a"), in_memory("notes.txt", "n")];
    let unsupported = scanner.scan_files(mixed, ScanMode::ContentHash);
    assert!(matches!(unsupported, Err(Error::InvalidArgument(_))));
}

#[test]
fn test_scan_directory_rejects_missing_directory() {
    let tmp = tempdir().unwrap();
    let scanner = scanner_with(Arc::new(InMemoryImportHistory::new()));

    let missing = scanner.scan_directory(&tmp.path().join("nope"), ScanMode::ContentHash);
    assert!(matches!(missing, Err(Error::InvalidArgument(_))));

    let file = tmp.path().join("a.jpg");
    fs::write(&file, "a").unwrap();
    let not_dir = scanner.scan_directory(&file, ScanMode::ContentHash);
    assert!(matches!(not_dir, Err(Error::InvalidArgument(_))));
}

#[tokio::test]
async fn test_unreadable_candidate_is_a_warning() {
    let scanner = scanner_with(Arc::new(InMemoryImportHistory::new()));
    let events = recorder();
    scanner.add_observer(events.clone());

    let files: Vec<Arc<dyn FileHandle>> = vec![
        in_memory("a.jpg", "first"),
        Arc::new(FailingFile::new("broken.jpg")),
        in_memory("b.jpg", "second"),
    ];
    let result = wait_final(&scanner.scan_files(files, ScanMode::ContentHash).unwrap()).await;

    assert_eq!(file_names(&result.file_entries()), vec!["a.jpg", "b.jpg"]);
    assert!(result.duplicate_entries().is_empty());
    assert_eq!(result.processed_count(), 2);
    assert_eq!(result.failed_count(), 1);
    assert_eq!(result.statistics().progress, 1.0);
    assert_eq!(events.count("warning"), 1);
    assert_eq!(events.count("processed"), 2);
}

#[tokio::test]
async fn test_zero_byte_files_are_classified() {
    let scanner = scanner_with(Arc::new(InMemoryImportHistory::new()));
    let files = vec![in_memory("empty1.jpg", ""), in_memory("empty2.jpg", "")];
    let result = wait_final(&scanner.scan_files(files, ScanMode::ContentHash).unwrap()).await;

    assert_eq!(file_names(&result.file_entries()), vec!["empty1.jpg"]);
    assert_eq!(file_names(&result.duplicate_entries()), vec!["empty2.jpg"]);
    assert_eq!(result.statistics().total_size_bytes, 0);
}

#[tokio::test]
async fn test_event_order_for_simple_scan() {
    let scanner = scanner_with(Arc::new(InMemoryImportHistory::new()));
    let events = recorder();
    scanner.add_observer(events.clone());

    wait_final(&scanner.scan_files(abc(), ScanMode::ContentHash).unwrap()).await;

    assert_eq!(
        events.events(),
        vec![
            "candidates-counted",
            "processed",
            "duplicate-found",
            "processed",
            "processed",
            "finalized",
        ]
    );
}

#[tokio::test]
async fn test_removed_observer_receives_nothing() {
    let scanner = scanner_with(Arc::new(InMemoryImportHistory::new()));
    let kept = recorder();
    let removed = recorder();
    scanner.add_observer(kept.clone());
    let id = scanner.add_observer(removed.clone());
    assert!(scanner.remove_observer(id));
    assert!(!scanner.remove_observer(id));

    wait_final(&scanner.scan_files(abc(), ScanMode::ContentHash).unwrap()).await;

    assert!(removed.events().is_empty());
    assert_eq!(kept.count("finalized"), 1);
}

#[tokio::test]
async fn test_panicking_observer_does_not_break_scan() {
    let scanner = scanner_with(Arc::new(InMemoryImportHistory::new()));
    let panicking: Arc<dyn ScanObserver> =
        Arc::new(|_: &ScanEvent, _: &ScanResult| panic!("observer bug"));
    scanner.add_observer(panicking);
    let events = recorder();
    scanner.add_observer(events.clone());

    let result = wait_final(&scanner.scan_files(abc(), ScanMode::ContentHash).unwrap()).await;

    assert_eq!(result.processed_count(), 3);
    assert_eq!(events.count("processed"), 3);
    assert_eq!(events.count("finalized"), 1);
}

#[tokio::test]
async fn test_cancel_from_observer_stops_and_finalizes() {
    let scanner = scanner_with(Arc::new(InMemoryImportHistory::new()));
    let canceller: Arc<dyn ScanObserver> = Arc::new(|event: &ScanEvent, result: &ScanResult| {
        if let ScanEvent::Processed { .. } = event {
            result.cancel();
        }
    });
    scanner.add_observer(canceller);
    let events = recorder();
    scanner.add_observer(events.clone());

    let files: Vec<_> = (0..20)
        .map(|i| in_memory(&format!("img_{:02}.jpg", i), &format!("content {}", i)))
        .collect();
    let result = wait_final(&scanner.scan_files(files, ScanMode::ContentHash).unwrap()).await;

    assert!(result.is_canceled());
    assert!(result.is_final());
    assert_eq!(result.processed_count(), 1);
    assert_eq!(events.count("canceled"), 1);
    assert_eq!(events.count("finalized"), 1);

    // Frozen once final.
    assert!(!result.cancel());
    assert_eq!(result.processed_count(), 1);
    assert_eq!(result.statistics().progress, 1.0);
}

#[tokio::test]
async fn test_cancel_racing_finalize_never_follows_finalized() {
    let scanner = scanner_with(Arc::new(InMemoryImportHistory::new()));

    for round in 0..300 {
        let events = recorder();
        let id = scanner.add_observer(events.clone());
        let result = scanner
            .scan_files(vec![in_memory("only.jpg", "single frame")], ScanMode::ContentHash)
            .unwrap();

        let canceller = {
            let result = result.clone();
            std::thread::spawn(move || {
                while !result.is_final() {
                    result.cancel();
                }
            })
        };
        let result = wait_final(&result).await;
        canceller.join().unwrap();
        scanner.remove_observer(id);

        let seen = events.events();
        assert_eq!(seen.last(), Some(&"finalized"), "round {}: {:?}", round, seen);
        assert_eq!(events.count("finalized"), 1, "round {}: {:?}", round, seen);
        assert_eq!(
            events.count("canceled"),
            usize::from(result.is_canceled()),
            "round {}: {:?}",
            round,
            seen
        );
    }
}

#[tokio::test]
async fn test_unavailable_history_keeps_every_file_as_new() {
    let scanner = scanner_with(Arc::new(UnavailableHistory));
    let events = recorder();
    scanner.add_observer(events.clone());

    let files = vec![
        in_memory("a.jpg", "alpha"),
        in_memory("b.jpg", "bravo"),
        in_memory("c.jpg", "charlie"),
    ];
    let result = wait_final(&scanner.scan_files(files, ScanMode::ContentHash).unwrap()).await;

    assert!(result.is_final());
    assert_eq!(file_names(&result.file_entries()), vec!["a.jpg", "b.jpg", "c.jpg"]);
    assert!(result.duplicate_entries().is_empty());
    assert_eq!(result.failed_count(), 0);
    assert_eq!(events.count("warning"), 3);
    assert_eq!(events.count("processed"), 3);
    assert_eq!(events.count("finalized"), 1);
}

#[tokio::test]
async fn test_parallel_hashing_keeps_enumeration_order() {
    let config = ScannerConfig {
        hash_workers: 4,
        batch_size: 7,
        ..ScannerConfig::default()
    };
    let scanner = MediaScanner::new(&config, Arc::new(InMemoryImportHistory::new())).unwrap();

    let files: Vec<_> = (0..200)
        .map(|i| in_memory(&format!("img_{:03}.jpg", i), &format!("group {}", i % 10)))
        .collect();
    let result = wait_final(&scanner.scan_files(files, ScanMode::ContentHash).unwrap()).await;

    let expected_originals: Vec<_> = (0..10).map(|i| format!("img_{:03}.jpg", i)).collect();
    let expected_dups: Vec<_> = (10..200).map(|i| format!("img_{:03}.jpg", i)).collect();
    assert_eq!(file_names(&result.file_entries()), expected_originals);
    assert_eq!(file_names(&result.duplicate_entries()), expected_dups);

    let stats = result.statistics();
    assert_eq!(
        stats.new_file_count + stats.duplicates.values().sum::<usize>(),
        stats.candidates.processed
    );
    assert!(stats.candidates.processed <= stats.candidates.total.unwrap());
}

fn write_card(root: &Path) {
    fs::create_dir_all(root.join("DCIM/100")).unwrap();
    fs::write(root.join("DCIM/100/IMG_0001.JPG"), "sunset").unwrap();
    fs::write(root.join("DCIM/100/IMG_0002.JPG"), "beach").unwrap();
    fs::write(root.join("DCIM/100/IMG_0003.MOV"), "sunset").unwrap();
    fs::write(root.join("DCIM/100/readme.txt"), "not media").unwrap();
}

#[tokio::test]
async fn test_directory_scan_then_history_rescan() {
    let tmp = tempdir().unwrap();
    write_card(tmp.path());
    let history: Arc<dyn ImportHistory> = Arc::new(InMemoryImportHistory::new());
    let scanner = scanner_with(Arc::clone(&history));

    let first = scanner.scan_directory(tmp.path(), ScanMode::ContentHash).unwrap();
    let first = wait_final(&first).await;
    assert_eq!(
        file_names(&first.file_entries()),
        vec!["DCIM/100/IMG_0001.JPG", "DCIM/100/IMG_0002.JPG"]
    );
    assert_eq!(file_names(&first.duplicate_entries()), vec!["DCIM/100/IMG_0003.MOV"]);

    let recorded = record_entries(history.as_ref(), &first.file_entries()).unwrap();
    assert_eq!(recorded, 2);

    for mode in [ScanMode::ContentHash, ScanMode::History] {
        let again = wait_final(&scanner.scan_directory(tmp.path(), mode).unwrap()).await;
        assert!(again.file_entries().is_empty());
        assert_eq!(again.duplicate_entries().len(), 3);
        assert_eq!(
            again.statistics().duplicates.get(&Disposition::HistoryDuplicate),
            Some(&2)
        );
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_dangling_link_reported_when_following_links() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("a.jpg"), "a").unwrap();
    std::os::unix::fs::symlink(tmp.path().join("missing.jpg"), tmp.path().join("b.jpg")).unwrap();
    fs::write(tmp.path().join("c.jpg"), "c").unwrap();

    let config = ScannerConfig {
        follow_links: true,
        ..ScannerConfig::default()
    };
    let scanner = MediaScanner::new(&config, Arc::new(InMemoryImportHistory::new())).unwrap();
    let events = recorder();
    scanner.add_observer(events.clone());

    let result = wait_final(&scanner.scan_directory(tmp.path(), ScanMode::ContentHash).unwrap()).await;

    assert_eq!(file_names(&result.file_entries()), vec!["a.jpg", "c.jpg"]);
    assert_eq!(events.count("warning"), 1);
    assert_eq!(result.candidate_count(), Some(2));
}
