//! Shared test helpers for store tests.

#![allow(dead_code)]

use rand::SeedableRng;
use rand::rngs::StdRng;
use rsa::RsaPrivateKey;
use spp_crypto::StoreKey;
use spp_store::{BlockKind, Record};
use std::sync::OnceLock;

/// Returns a deterministic RSA-1024 store key, generated once per test binary.
pub fn test_key() -> &'static StoreKey {
    static KEY: OnceLock<StoreKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(0x5707);
        StoreKey::new(RsaPrivateKey::new(&mut rng, 1024).unwrap()).unwrap()
    })
}

/// Three records under one key: two timers and an unrelated named record.
pub fn timer_records(key: &str) -> Vec<Record> {
    vec![
        Record::new(BlockKind::Timer, key, "msft:sl/timer/a", vec![1u8; 32]),
        Record::new(BlockKind::Named, key, "other", vec![2u8; 8]),
        Record::new(BlockKind::Timer, key, "msft:sl/timer/b", vec![3u8; 32]),
    ]
}

/// Installs a test tracing subscriber once; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("spp_store=debug")
        .with_test_writer()
        .try_init();
}
