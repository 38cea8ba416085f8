#![allow(dead_code)]

use chrono::NaiveDate;
use spp_pkey::{KeyRange, PKeyAlgorithm, PidContext, ProductConfig};
use spp_types::Guid;

pub const ACTIVATION_ID: &str = "6f327760-8c5c-417c-9b61-836a98287e0c";

pub fn range(start: u32, end: u32, eula_type: &str) -> KeyRange {
    KeyRange {
        start,
        end,
        eula_type: eula_type.to_string(),
        part_number: "X15-12345:X15-67890".to_string(),
        valid: true,
    }
}

pub fn product(algorithm: PKeyAlgorithm, ranges: Vec<KeyRange>) -> ProductConfig {
    ProductConfig {
        group_id: 4096,
        edition: "Professional".to_string(),
        description: "Test product".to_string(),
        channel: "Retail".to_string(),
        randomized: false,
        algorithm,
        ranges,
        activation_id: Guid::parse(ACTIVATION_ID).unwrap(),
    }
}

/// Windows 8.1, en-US, 10 February 2024 (day 41).
pub fn context() -> PidContext {
    PidContext::new(9600, 1033, NaiveDate::from_ymd_opt(2024, 2, 10).unwrap())
}
