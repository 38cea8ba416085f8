//! Shared test helpers for envelope tests.

#![allow(dead_code)]

use rand::SeedableRng;
use rand::rngs::StdRng;
use rsa::RsaPrivateKey;
use spp_crypto::{KeyRing, KeySet, StoreKey};
use std::sync::OnceLock;

fn generate(seed: u64) -> StoreKey {
    let mut rng = StdRng::seed_from_u64(seed);
    let private = RsaPrivateKey::new(&mut rng, 1024).unwrap();
    StoreKey::new(private).unwrap()
}

/// Returns a deterministic key ring; both pairs are generated once per test binary.
pub fn test_keyring() -> &'static KeyRing {
    static RING: OnceLock<KeyRing> = OnceLock::new();
    RING.get_or_init(|| KeyRing::new(generate(0x5050), generate(0x7e57)))
}

/// Returns one key pair from the deterministic ring.
pub fn test_key(set: KeySet) -> &'static StoreKey {
    test_keyring().select(set)
}
