mod common;

use common::numbered_entries;
use pretty_assertions::assert_eq;
use spp_tokens::{
    META_EXTENSION, TokenEntry, TokenError, TokenMeta, TokenStorage, TokenStore, Tokens, verify,
};
use std::fs;

// ── Entry operations ────────────────────────────────────────────

#[test]
fn get_entry_skips_tombstones() {
    let mut tokens = Tokens::new();
    tokens.add_entry(TokenEntry::tombstone("n", "dat"));
    tokens.add_entry(TokenEntry::new("n", "dat", vec![1]));
    assert_eq!(tokens.get_entry("n", "dat").unwrap().data, vec![1]);
    assert!(tokens.get_entry("n", "other").is_none());
}

#[test]
fn set_entry_updates_or_appends() {
    let mut tokens = Tokens::new();
    tokens.add_entry(TokenEntry::tombstone("n", "dat"));
    tokens.set_entry("n", "dat", vec![1]);
    assert_eq!(tokens.len(), 2);
    tokens.set_entry("n", "dat", vec![2]);
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens.get_entry("n", "dat").unwrap().data, vec![2]);
}

#[test]
fn delete_entry_removes_first_match_only() {
    let mut tokens = Tokens::new();
    tokens.add_entries(vec![
        TokenEntry::tombstone("n", "dat"),
        TokenEntry::new("n", "dat", vec![1]),
    ]);
    assert!(tokens.delete_entry("n", "dat"));
    assert_eq!(tokens.entries(), &[TokenEntry::new("n", "dat", vec![1])]);
    assert!(tokens.delete_entry("n", "dat"));
    assert!(!tokens.delete_entry("n", "dat"));
}

#[test]
fn delete_unpopulated_removes_all_tombstones() {
    let mut tokens = Tokens::new();
    tokens.add_entries(vec![
        TokenEntry::tombstone("n", "xml"),
        TokenEntry::new("n", "xml", vec![1]),
        TokenEntry::tombstone("n", "xml"),
        TokenEntry::tombstone("m", "xml"),
    ]);
    assert_eq!(tokens.delete_unpopulated("n", "xml"), 2);
    assert_eq!(tokens.len(), 2);
}

// ── Metadata ────────────────────────────────────────────────────

#[test]
fn meta_roundtrip_through_store() {
    let mut meta = TokenMeta::new("__##USERSEP##\\$\\$$$");
    meta.insert("Key1", "Value1");
    meta.insert("Key2", "");

    let mut tokens = Tokens::new();
    tokens.add_entry(TokenEntry::tombstone(meta.name.clone(), META_EXTENSION));
    tokens.set_meta(&meta);

    let mut back = Tokens::decode(&tokens.serialize()).unwrap();
    let read = back.get_meta(&meta.name).unwrap();
    assert_eq!(read, meta);
    // the tombstone was purged by the read
    assert_eq!(back.len(), 1);
}

#[test]
fn missing_meta_is_empty() {
    let mut tokens = Tokens::new();
    let meta = tokens.get_meta("nothing").unwrap();
    assert_eq!(meta.name, "nothing");
    assert!(meta.is_empty());
}

#[test]
fn meta_wire_format() {
    let mut meta = TokenMeta::new("a");
    meta.insert("k", "v");
    let bytes = meta.serialize();
    assert_eq!(&bytes[..4], &1i32.to_le_bytes());
    assert_eq!(&bytes[4..8], &4u32.to_le_bytes());
    assert_eq!(bytes.len(), 4 + 4 + 4 + 8 + 4 + 4);
    assert_eq!(TokenMeta::decode(&bytes).unwrap().get("k"), Some("v"));
}

#[test]
fn meta_remove() {
    let mut meta = TokenMeta::new("a");
    meta.insert("k", "v");
    assert_eq!(meta.remove("k").as_deref(), Some("v"));
    assert!(meta.remove("k").is_none());
}

// ── File scope ──────────────────────────────────────────────────

#[test]
fn open_missing_file_creates_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.dat");
    let store = TokenStore::open(&path).unwrap();
    assert!(store.tokens().is_empty());
    store.close().unwrap();
    verify(&fs::read(&path).unwrap()).unwrap();
}

#[test]
fn file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.dat");

    let mut store = TokenStore::open(&path).unwrap();
    store.add_entries(numbered_entries(150));
    store.close().unwrap();

    let bytes = fs::read(&path).unwrap();
    verify(&bytes).unwrap();

    let store = TokenStore::open(&path).unwrap();
    assert_eq!(store.tokens().len(), 150);
    assert_eq!(
        store.get_entry("entry-120", "dat").unwrap().data,
        b"content 120"
    );
}

#[test]
fn drop_flushes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.dat");
    {
        let mut store = TokenStore::open(&path).unwrap();
        store.set_entry("x", "dat", vec![5]);
    }
    let store = TokenStore::open(&path).unwrap();
    assert_eq!(store.get_entry("x", "dat").unwrap().data, vec![5]);
}

#[test]
fn shrinking_rewrite_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.dat");
    let mut store = TokenStore::open(&path).unwrap();
    store.add_entries(numbered_entries(200));
    store.close().unwrap();
    let big = fs::metadata(&path).unwrap().len();

    let mut store = TokenStore::open(&path).unwrap();
    for i in 0..200 {
        store.delete_entry(&format!("entry-{i}"), "dat");
    }
    store.close().unwrap();
    assert!(fs::metadata(&path).unwrap().len() < big);
    verify(&fs::read(&path).unwrap()).unwrap();
}

#[test]
fn second_open_is_locked_out() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.dat");
    let first = TokenStore::open(&path).unwrap();
    assert!(matches!(
        TokenStore::open(&path),
        Err(TokenError::Locked { .. })
    ));
    first.close().unwrap();
}

// ── Errors ──────────────────────────────────────────────────────

#[test]
fn error_display() {
    let err = TokenError::LengthMismatch {
        offset: 0x4044,
        declared: 5,
        content: 6,
    };
    let msg = format!("{err}");
    assert!(msg.contains("0x4044"));
    assert!(msg.contains('5'));

    assert!(format!("{}", TokenError::BlockHashMismatch { offset: 0x24 }).contains("0x24"));
    assert!(format!("{:?}", TokenError::DigestMismatch).contains("DigestMismatch"));
}
