//! Shared test helpers for token store tests.

#![allow(dead_code)]

use spp_tokens::TokenEntry;

/// `n` populated entries named `entry-{i}` with distinct content.
pub fn numbered_entries(n: usize) -> Vec<TokenEntry> {
    (0..n)
        .map(|i| TokenEntry::new(format!("entry-{i}"), "dat", format!("content {i}").into_bytes()))
        .collect()
}
