//! How a trusted store is opened.

use crate::error::StoreResult;
use serde::{Deserialize, Serialize};
use spp_crypto::{IntegrityPolicy, KeySet};
use spp_types::PsVersion;

/// Options for opening a [`TrustedStore`](crate::TrustedStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Product version that wrote the store; selects every layout.
    pub version: PsVersion,
    /// Which key pair protects the store.
    #[serde(default)]
    pub key_set: KeySet,
    /// Whether a payload integrity mismatch fails the open.
    #[serde(default)]
    pub integrity: IntegrityPolicy,
}

impl StoreOptions {
    /// Production keys, strict integrity.
    #[must_use]
    pub fn new(version: PsVersion) -> Self {
        Self {
            version,
            key_set: KeySet::default(),
            integrity: IntegrityPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_key_set(mut self, key_set: KeySet) -> Self {
        self.key_set = key_set;
        self
    }

    #[must_use]
    pub fn with_integrity(mut self, integrity: IntegrityPolicy) -> Self {
        self.integrity = integrity;
        self
    }

    /// Parses options from a JSON document.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
