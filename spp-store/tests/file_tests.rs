mod common;

use common::{init_tracing, test_key, timer_records};
use pretty_assertions::assert_eq;
use spp_crypto::{IntegrityPolicy, KeySet};
use spp_store::{
    BlockKind, PhysicalStore, Record, StoreError, StoreOptions, TrustedStore, ValueQuery,
    mirror_path,
};
use spp_types::PsVersion;
use std::fs;
use std::path::Path;

const KEY: &str = "55c92734-d682-4d71-983e-d6ec3f16059f";

fn seed_store(path: &Path, version: PsVersion) {
    let mut store = TrustedStore::create(path, test_key(), StoreOptions::new(version)).unwrap();
    store.add_all(timer_records(KEY));
    store.close().unwrap();
}

// ── Lifecycle ───────────────────────────────────────────────────

#[test]
fn create_close_open_roundtrip() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.dat");
    seed_store(&path, PsVersion::WinModern);

    let store = TrustedStore::open(&path, test_key(), StoreOptions::new(PsVersion::WinModern)).unwrap();
    assert_eq!(store.records().len(), 3);
    assert_eq!(store.find(ValueQuery::Str("timer")).len(), 2);
    assert!(store.mirror().is_none());
    store.close().unwrap();
}

#[test]
fn mutations_persist_after_close() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.dat");
    seed_store(&path, PsVersion::Win8);
    let options = StoreOptions::new(PsVersion::Win8);

    let mut store = TrustedStore::open(&path, test_key(), options).unwrap();
    assert!(store.delete(KEY, ValueQuery::Str("msft:sl/timer/a")));
    assert!(store.set(KEY, ValueQuery::Str("other"), vec![7u8; 4]));
    store.close().unwrap();

    let store = TrustedStore::open(&path, test_key(), options).unwrap();
    let records = store.records();
    assert_eq!(records.len(), 2);
    assert_eq!(store.get(KEY, ValueQuery::Str("other")).unwrap().data, vec![7u8; 4]);
}

#[test]
fn drop_flushes_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.dat");
    seed_store(&path, PsVersion::WinBlue);
    let options = StoreOptions::new(PsVersion::WinBlue);

    {
        let mut store = TrustedStore::open(&path, test_key(), options).unwrap();
        store.add(Record::new(BlockKind::Named, KEY, "added", vec![1, 2, 3, 4]));
    }

    let store = TrustedStore::open(&path, test_key(), options).unwrap();
    assert!(store.get(KEY, ValueQuery::Str("added")).is_some());
}

#[test]
fn rewrite_shrinks_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.dat");
    seed_store(&path, PsVersion::WinModern);
    let before = fs::metadata(&path).unwrap().len();

    let mut store = TrustedStore::open(&path, test_key(), StoreOptions::new(PsVersion::WinModern)).unwrap();
    for record in store.find(ValueQuery::Str("msft:sl/timer")) {
        store.delete(KEY, ValueQuery::Str(&record.value_str()));
    }
    store.close().unwrap();

    assert!(fs::metadata(&path).unwrap().len() < before);
}

// ── Mirrors ─────────────────────────────────────────────────────

#[test]
fn mirrored_versions_write_both_files() {
    for version in [PsVersion::Vista, PsVersion::Win7] {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens-0.dat");
        seed_store(&path, version);

        let mirror = dir.path().join("tokens-1.dat");
        assert_eq!(fs::read(&path).unwrap(), fs::read(&mirror).unwrap(), "{version}");

        let store = TrustedStore::open(&path, test_key(), StoreOptions::new(version)).unwrap();
        assert_eq!(store.mirror(), Some(mirror.as_path()));
        assert_eq!(store.records().len(), 3);
    }
}

#[test]
fn mirror_path_rewrites_segment() {
    let p = mirror_path(Path::new("/store/data-0.dat")).unwrap();
    assert_eq!(p, Path::new("/store/data-1.dat"));
}

#[test]
fn mirrored_version_without_segment_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.dat");
    let err = TrustedStore::create(&path, test_key(), StoreOptions::new(PsVersion::Win7)).unwrap_err();
    assert!(matches!(err, StoreError::MirrorPath { .. }));
    assert!(!path.exists());
}

// ── Raw access ──────────────────────────────────────────────────

#[test]
fn read_raw_ignores_pending_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.dat");
    seed_store(&path, PsVersion::WinModern);

    let mut store = TrustedStore::open(&path, test_key(), StoreOptions::new(PsVersion::WinModern)).unwrap();
    let on_disk = store.read_raw().unwrap();
    store.add(Record::new(BlockKind::Named, KEY, "pending", vec![0u8; 4]));
    assert_eq!(store.read_raw().unwrap(), on_disk);
    assert_ne!(store.serialize(), on_disk);
    store.close().unwrap();
}

#[test]
fn write_raw_replaces_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.dat");
    seed_store(&path, PsVersion::WinModern);
    let options = StoreOptions::new(PsVersion::WinModern);

    let empty = spp_store::ModernStore::default();
    let store = TrustedStore::open(&path, test_key(), options).unwrap();
    store.write_raw(&empty.serialize()).unwrap();

    let store = TrustedStore::open(&path, test_key(), options).unwrap();
    assert!(store.records().is_empty());
}

// ── Locking ─────────────────────────────────────────────────────

#[test]
fn second_open_is_locked_out() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.dat");
    seed_store(&path, PsVersion::WinModern);
    let options = StoreOptions::new(PsVersion::WinModern);

    let first = TrustedStore::open(&path, test_key(), options).unwrap();
    let err = TrustedStore::open(&path, test_key(), options).unwrap_err();
    assert!(matches!(err, StoreError::Locked { .. }));
    first.close().unwrap();

    assert!(TrustedStore::open(&path, test_key(), options).is_ok());
}

// ── Envelope failures ───────────────────────────────────────────

#[test]
fn wrong_version_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.dat");
    seed_store(&path, PsVersion::WinModern);
    let original = fs::read(&path).unwrap();

    let options = StoreOptions::new(PsVersion::Vista);
    let err = TrustedStore::open(&path, test_key(), options);
    assert!(matches!(err, Err(StoreError::MirrorPath { .. })));

    // Vista checks a salted SHA-1 tag, so the HMAC-tagged payload is rejected.
    let renamed = dir.path().join("data-0.dat");
    fs::rename(&path, &renamed).unwrap();
    let err = TrustedStore::open(&renamed, test_key(), options).unwrap_err();
    assert!(matches!(err, StoreError::Crypto(_)));
    assert_eq!(fs::read(&renamed).unwrap(), original);
}

#[test]
fn garbage_file_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.dat");
    fs::write(&path, b"not a store").unwrap();
    let err = TrustedStore::open(&path, test_key(), StoreOptions::new(PsVersion::Win8)).unwrap_err();
    assert!(matches!(err, StoreError::Crypto(_)));
}

// ── Options ─────────────────────────────────────────────────────

#[test]
fn options_from_json_defaults() {
    let options = StoreOptions::from_json(r#"{"version":"winblue"}"#).unwrap();
    assert_eq!(options, StoreOptions::new(PsVersion::WinBlue));
    assert_eq!(options.key_set, KeySet::Production);
    assert_eq!(options.integrity, IntegrityPolicy::Strict);
}

#[test]
fn options_from_json_full() {
    let options =
        StoreOptions::from_json(r#"{"version":"vista","key_set":"test","integrity":"warn"}"#)
            .unwrap();
    assert_eq!(
        options,
        StoreOptions::new(PsVersion::Vista)
            .with_key_set(KeySet::Test)
            .with_integrity(IntegrityPolicy::Warn)
    );
}

#[test]
fn options_reject_unknown_version() {
    assert!(matches!(
        StoreOptions::from_json(r#"{"version":"xp"}"#),
        Err(StoreError::Config(_))
    ));
}
