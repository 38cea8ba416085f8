//! Product key configuration: which serial ranges belong to which product.

use crate::error::{PKeyError, PKeyResult};
use crate::key::{KeyDetails, PKeyAlgorithm, ProductKey, ProductKeyParams};
use crate::license::parse_license;
use rand::Rng;
use serde::{Deserialize, Serialize};
use spp_types::Guid;
use std::fs;
use std::path::Path;
use tracing::debug;

/// A block of serial numbers issued under one EULA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRange {
    pub start: u32,
    pub end: u32,
    pub eula_type: String,
    pub part_number: String,
    #[serde(default)]
    pub valid: bool,
}

impl KeyRange {
    /// Returns true if `serial` lies within the range, bounds included.
    #[must_use]
    pub fn contains(&self, serial: u32) -> bool {
        self.start <= serial && serial <= self.end
    }

    /// The first component of the part number.
    #[must_use]
    pub fn primary_part_number(&self) -> &str {
        self.part_number
            .split([':', ';'])
            .next()
            .unwrap_or_default()
    }

    fn is_anytime_upgrade(&self) -> bool {
        self.eula_type.contains("WAU")
    }
}

/// One activation configuration and its key ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConfig {
    pub group_id: u32,
    pub edition: String,
    #[serde(default)]
    pub description: String,
    pub channel: String,
    #[serde(default)]
    pub randomized: bool,
    pub algorithm: PKeyAlgorithm,
    pub ranges: Vec<KeyRange>,
    pub activation_id: Guid,
}

impl ProductConfig {
    /// Ranges keys may be drawn from.
    ///
    /// PKEY2009 products skip Anytime Upgrade ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if the product has no ranges or only upgrade ranges.
    pub fn usable_ranges(&self) -> PKeyResult<Vec<&KeyRange>> {
        if self.ranges.is_empty() {
            return Err(PKeyError::NoRanges(self.activation_id));
        }
        if self.algorithm == PKeyAlgorithm::Pkey2005 {
            return Ok(self.ranges.iter().collect());
        }

        let usable: Vec<&KeyRange> = self
            .ranges
            .iter()
            .filter(|r| !r.is_anytime_upgrade())
            .collect();
        if usable.is_empty() {
            return Err(PKeyError::UpgradeOnly(self.activation_id));
        }
        Ok(usable)
    }

    /// Generates a key with a random serial from a random usable range.
    ///
    /// # Errors
    ///
    /// See [`usable_ranges`](Self::usable_ranges).
    pub fn random_key(&self) -> PKeyResult<ProductKey> {
        self.random_key_with(&mut rand::thread_rng())
    }

    /// [`random_key`](Self::random_key) with a caller-supplied generator.
    ///
    /// # Errors
    ///
    /// See [`usable_ranges`](Self::usable_ranges).
    pub fn random_key_with<R: Rng + ?Sized>(&self, rng: &mut R) -> PKeyResult<ProductKey> {
        let ranges = self.usable_ranges()?;
        let range = ranges[rng.gen_range(0..ranges.len())];
        let serial = if range.end > range.start {
            rng.gen_range(range.start..range.end)
        } else {
            range.start
        };
        debug!(group = self.group_id, serial, eula = %range.eula_type, "generated product key");
        Ok(self.key(serial, 0, false, range))
    }

    /// Builds a key for this product from explicit parameters.
    #[must_use]
    pub fn key(&self, serial: u32, security: u64, upgrade: bool, range: &KeyRange) -> ProductKey {
        let params = ProductKeyParams {
            group: self.group_id,
            serial,
            security,
            upgrade,
            algorithm: self.algorithm,
        };
        let details = KeyDetails {
            eula_type: range.eula_type.clone(),
            part_number: range.primary_part_number().to_string(),
            edition: self.edition.clone(),
            channel: self.channel.clone(),
            activation_id: self.activation_id,
        };
        ProductKey::with_details(params, details)
    }
}

/// A set of product configurations keyed by activation id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PKeyConfig {
    products: Vec<ProductConfig>,
}

impl PKeyConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the product key configuration embedded in an XrML license.
    ///
    /// # Errors
    ///
    /// Returns an error if the license is not XML, lacks a
    /// `pkeyConfigData` blob, or the blob is not a valid configuration.
    pub fn from_license(contents: &str) -> PKeyResult<Self> {
        let mut config = Self::new();
        config.load_license(contents)?;
        Ok(config)
    }

    /// Adds the products of an XrML license to this set. Returns how many
    /// were new.
    ///
    /// # Errors
    ///
    /// See [`from_license`](Self::from_license). Nothing is added on error.
    pub fn load_license(&mut self, contents: &str) -> PKeyResult<usize> {
        let mut added = 0;
        for product in parse_license(contents)? {
            if self.insert(product) {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Parses a JSON array of product configurations.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe product configurations.
    pub fn from_json(json: &str) -> PKeyResult<Self> {
        let products: Vec<ProductConfig> = serde_json::from_str(json)?;
        let mut config = Self::new();
        config.extend(products);
        Ok(config)
    }

    /// Loads a configuration file, either an XrML license or JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> PKeyResult<Self> {
        let contents = fs::read_to_string(path)?;
        if contents.trim_start_matches('\u{feff}').trim_start().starts_with('<') {
            Self::from_license(&contents)
        } else {
            Self::from_json(&contents)
        }
    }

    /// Adds a product. Products without ranges, and activation ids already
    /// present, are ignored. Returns true if the product was added.
    pub fn insert(&mut self, product: ProductConfig) -> bool {
        if product.ranges.is_empty() || self.get(&product.activation_id).is_some() {
            return false;
        }
        self.products.push(product);
        true
    }

    #[must_use]
    pub fn get(&self, activation_id: &Guid) -> Option<&ProductConfig> {
        self.products
            .iter()
            .find(|p| p.activation_id == *activation_id)
    }

    pub fn products(&self) -> impl Iterator<Item = &ProductConfig> {
        self.products.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Finds the product whose group owns `serial`.
    ///
    /// # Errors
    ///
    /// Returns [`PKeyError::ProductNotFound`] if no product matches.
    pub fn match_params(&self, group: u32, serial: u32) -> PKeyResult<&ProductConfig> {
        self.products
            .iter()
            .filter(|p| p.group_id == group)
            .find(|p| p.ranges.iter().any(|r| r.contains(serial)))
            .ok_or(PKeyError::ProductNotFound { group, serial })
    }
}

impl Extend<ProductConfig> for PKeyConfig {
    fn extend<I: IntoIterator<Item = ProductConfig>>(&mut self, iter: I) {
        for product in iter {
            self.insert(product);
        }
    }
}
