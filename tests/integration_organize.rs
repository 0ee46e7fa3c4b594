//! Integration tests for the organize pipeline.
//!
//! These tests verify end-to-end behavior:
//! - Organizing into the dated tree with kind routing
//! - Duplicate skipping across differently named files
//! - Backup sync idempotence and verification
//! - Metadata cache persistence across runs

use shutter_sort::core::backup::{BackupSync, Manifest};
use shutter_sort::core::cache::{MetadataStore, SqliteStore};
use shutter_sort::core::dedupe::{DedupeConfig, DedupeMethod, DuplicateAction};
use shutter_sort::core::metadata::{GpsPosition, MetadataRecord};
use shutter_sort::core::pipeline::{DedupeSettings, OperationMode, Organizer};
use shutter_sort::core::resolve::RoutingRules;
use std::fs;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

fn write_file(dir: &Path, name: &str, content: &[u8]) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
}

#[test]
fn organize_empty_source_produces_empty_report() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();

    let organizer = Organizer::builder(source.path(), dest.path()).build();
    let report = organizer.run().unwrap();

    assert_eq!(report.scanned, 0);
    assert_eq!(report.organized, 0);
    assert!(report.errors.is_empty());
}

#[test]
fn organize_routes_kinds_into_separate_trees() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(source.path(), "photo.jpg", b"jpeg bytes");
    write_file(source.path(), "frame.cr2", b"raw bytes");
    write_file(source.path(), "clip.mp4", b"video bytes");
    write_file(source.path(), "notes.txt", b"not media");

    let organizer = Organizer::builder(source.path(), dest.path())
        .naming_pattern("{original_name}")
        .folder_pattern("")
        .build();
    let report = organizer.run().unwrap();

    assert_eq!(report.scanned, 3);
    assert_eq!(report.organized, 3);
    assert!(dest.path().join("JPG/photo.jpg").is_file());
    assert!(dest.path().join("RAW/frame.cr2").is_file());
    assert!(dest.path().join("VIDEOS/clip.mp4").is_file());
}

#[test]
fn organizing_in_place_keeps_names_stable() {
    // Source and destination are the same tree: files already at their
    // resolved names must keep them instead of gaining sequence suffixes
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "photo.jpg", b"jpeg bytes");

    let organizer = Organizer::builder(dir.path(), dir.path())
        .routing(RoutingRules::flat())
        .naming_pattern("{original_name}")
        .folder_pattern("")
        .build();
    let report = organizer.run().unwrap();

    assert_eq!(report.organized, 1);
    assert!(dir.path().join("photo.jpg").is_file());
    assert!(!dir.path().join("photo_01.jpg").exists());
    assert_eq!(fs::read(dir.path().join("photo.jpg")).unwrap(), b"jpeg bytes");
}

#[test]
fn colliding_names_from_different_files_get_sequences() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(source.path(), "a/shot.jpg", b"first");
    write_file(source.path(), "b/shot.jpg", b"second");
    write_file(source.path(), "c/shot.jpg", b"third");

    let organizer = Organizer::builder(source.path(), dest.path())
        .routing(RoutingRules::flat())
        .naming_pattern("{original_name}")
        .folder_pattern("")
        .build();
    let report = organizer.run().unwrap();

    assert_eq!(report.organized, 3);
    assert!(dest.path().join("shot.jpg").is_file());
    assert!(dest.path().join("shot_01.jpg").is_file());
    assert!(dest.path().join("shot_02.jpg").is_file());
}

#[test]
fn exact_duplicates_are_skipped_across_folders() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(source.path(), "keep.jpg", b"identical content");
    write_file(source.path(), "copies/extra.jpg", b"identical content");

    let organizer = Organizer::builder(source.path(), dest.path())
        .routing(RoutingRules::flat())
        .naming_pattern("{original_name}")
        .folder_pattern("")
        .dedupe(DedupeSettings {
            config: DedupeConfig {
                method: DedupeMethod::Hash,
                ..Default::default()
            },
            action: DuplicateAction::Skip,
            ..Default::default()
        })
        .build();
    let report = organizer.run().unwrap();

    assert_eq!(report.duplicates_exact, 1);
    assert_eq!(report.organized, 1);
    assert_eq!(report.skipped, 1);
}

#[test]
fn move_mode_empties_the_source() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(source.path(), "photo.jpg", b"jpeg bytes");

    let organizer = Organizer::builder(source.path(), dest.path())
        .routing(RoutingRules::flat())
        .naming_pattern("{original_name}")
        .folder_pattern("")
        .operation(OperationMode::Move)
        .build();
    organizer.run().unwrap();

    assert!(!source.path().join("photo.jpg").exists());
    assert!(dest.path().join("photo.jpg").is_file());
}

#[test]
fn backup_second_run_is_idempotent() {
    let tree = TempDir::new().unwrap();
    let mirror = TempDir::new().unwrap();
    write_file(tree.path(), "2024/03/a.jpg", b"photo a");
    write_file(tree.path(), "2024/03/b.jpg", b"photo b");

    let sync = BackupSync::new(true);
    let first = sync.sync(tree.path(), mirror.path()).unwrap();
    let second = sync.sync(tree.path(), mirror.path()).unwrap();

    assert_eq!(first.copied, 2);
    assert_eq!(second.copied, 0);
    assert_eq!(second.skipped, 2);
    assert!(second.failed.is_empty());
}

#[test]
fn backup_manifest_survives_and_describes_the_mirror() {
    let tree = TempDir::new().unwrap();
    let mirror = TempDir::new().unwrap();
    write_file(tree.path(), "a.jpg", b"photo a");

    BackupSync::new(true).sync(tree.path(), mirror.path()).unwrap();

    let manifest = Manifest::load(mirror.path());
    assert_eq!(manifest.len(), 1);
    let entry = manifest.get("a.jpg").unwrap();
    assert_eq!(entry.size, 7);
    assert_eq!(entry.checksum.len(), 64);
}

#[test]
fn verify_flags_bitrot_without_touching_the_source() {
    let tree = TempDir::new().unwrap();
    let mirror = TempDir::new().unwrap();
    write_file(tree.path(), "a.jpg", b"photo a");

    let sync = BackupSync::new(true);
    sync.sync(tree.path(), mirror.path()).unwrap();

    fs::write(mirror.path().join("a.jpg"), b"corrupt").unwrap();

    let report = sync.verify(mirror.path()).unwrap();
    assert_eq!(report.mismatched, vec!["a.jpg".to_string()]);

    // Source untouched
    assert_eq!(fs::read(tree.path().join("a.jpg")).unwrap(), b"photo a");
}

#[test]
fn metadata_cache_round_trips_across_process_boundaries() {
    let cache_dir = TempDir::new().unwrap();
    let db_path = cache_dir.path().join("metadata.db");

    let record = MetadataRecord {
        camera_make: Some("Canon".to_string()),
        camera_model: Some("EOS R5".to_string()),
        iso: Some(400),
        aperture: Some(2.8),
        gps: Some(GpsPosition {
            latitude: 48.8584,
            longitude: 2.2945,
            altitude: None,
        }),
        ..Default::default()
    };
    let mtime = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

    {
        let store = SqliteStore::open(&db_path).unwrap();
        store
            .set(Path::new("/photos/a.jpg"), 1000, mtime, &record)
            .unwrap();
    }

    // Fresh handle, as a new process would open
    let store = SqliteStore::open(&db_path).unwrap();
    let restored = store
        .get(Path::new("/photos/a.jpg"), 1000, mtime)
        .unwrap()
        .unwrap();

    assert_eq!(restored, record);
    assert!(restored.lens_model.is_none());
    assert!(restored.gps.unwrap().altitude.is_none());
}

#[test]
fn organize_with_sqlite_cache_hits_on_second_run() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    write_file(source.path(), "photo.jpg", b"jpeg bytes");

    let build = || {
        let store = SqliteStore::open(&cache_dir.path().join("metadata.db")).unwrap();
        Organizer::builder(source.path(), dest.path())
            .routing(RoutingRules::flat())
            .naming_pattern("{original_name}")
            .folder_pattern("")
            .store(std::sync::Arc::new(store))
            .build()
    };

    let first = build().run().unwrap();
    let second = build().run().unwrap();

    assert_eq!(first.cache_hits, 0);
    assert_eq!(second.cache_hits, 1);
}
