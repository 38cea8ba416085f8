//! Product key packing and the 25-character key string.
//!
//! Key parameters are packed into two 64-bit words:
//!
//! ```text
//! low  = security[0..14] << 50 | serial[0..30] << 20 | group[0..20]
//! high = upgrade << 49 | crc[0..10] << 39 | security[14..53]
//! ```
//!
//! The CRC is taken over the 16 little-endian bytes of `low, high` with the
//! checksum field still zero. PKEY2009 keys spell the packed value in base
//! 24 with a literal `N` marking the most significant digit. PKEY2005 keys
//! are never parsed back, so they only carry a placeholder string.

use crate::error::{PKeyError, PKeyResult};
use crate::system::HostInfo;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use spp_crypto::digest::sha256;
use spp_store::{BagEntry, VariableBag};
use spp_types::{BagLayout, ByteWriter, Guid, PsVersion, crc32};
use std::fmt;
use std::str::FromStr;
use uuid::uuid;

/// Symbols of the base-24 key alphabet.
pub const ALPHABET: &[u8; 24] = b"BCDFGHJKMPQRTVWXY2346789";

/// Characters in a key without dashes.
pub const KEY_DIGITS: usize = 25;

const LEGACY_PREFIX: &str = "H4X3DH4X3DH4X3DH4X3D";
const CHECKSUM_SHIFT: u32 = 39;
const CHECKSUM_MASK: u64 = 0x3ff;
const SECURITY_HIGH_MASK: u64 = 0x7f_ffff_ffff;

const PKEY2005_ID: Guid = Guid::from_uuid(uuid!("B8731595-A2F6-430B-A799-FBFFB81A8D73"));
const PKEY2009_ID: Guid = Guid::from_uuid(uuid!("660672EF-7809-4CFD-8D54-41B7FB738988"));

/// Product key generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PKeyAlgorithm {
    /// Legacy keys with an opaque string form.
    #[serde(rename = "msft:rm/algorithm/pkey/2005")]
    Pkey2005,
    /// Base-24 keys with an embedded checksum.
    #[serde(rename = "msft:rm/algorithm/pkey/2009")]
    Pkey2009,
}

impl PKeyAlgorithm {
    /// The rights-management URI naming this algorithm.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::Pkey2005 => "msft:rm/algorithm/pkey/2005",
            Self::Pkey2009 => "msft:rm/algorithm/pkey/2009",
        }
    }

    /// The GUID identifying this algorithm in phone activation data.
    #[must_use]
    pub const fn id(self) -> Guid {
        match self {
            Self::Pkey2005 => PKEY2005_ID,
            Self::Pkey2009 => PKEY2009_ID,
        }
    }
}

impl fmt::Display for PKeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

impl FromStr for PKeyAlgorithm {
    type Err = PKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Pkey2005, Self::Pkey2009]
            .into_iter()
            .find(|a| a.uri() == s)
            .ok_or_else(|| PKeyError::UnknownAlgorithm(s.to_string()))
    }
}

/// The numeric fields a product key is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductKeyParams {
    /// Product family, 20 bits.
    pub group: u32,
    /// Sequence number within the group, 30 bits.
    pub serial: u32,
    /// Entropy bits, 53 bits.
    pub security: u64,
    /// Upgrade flag.
    pub upgrade: bool,
    /// Key generation.
    pub algorithm: PKeyAlgorithm,
}

/// Product descriptors a key inherits from its configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDetails {
    /// EULA type of the owning range (`Retail`, `OEM`, `Volume`...).
    pub eula_type: String,
    /// Part number of the owning range.
    pub part_number: String,
    /// Edition identifier.
    pub edition: String,
    /// Distribution channel.
    pub channel: String,
    /// Activation configuration the key belongs to.
    pub activation_id: Guid,
}

/// A packed product key and its string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductKey {
    params: ProductKeyParams,
    details: KeyDetails,
    low: u64,
    high: u64,
    text: String,
}

impl ProductKey {
    /// Builds a key from its parameters.
    ///
    /// PKEY2005 keys take their string suffix from a generator seeded by
    /// the running system's version.
    #[must_use]
    pub fn new(params: ProductKeyParams) -> Self {
        Self::with_details(params, KeyDetails::default())
    }

    /// Builds a key that carries product descriptors.
    #[must_use]
    pub fn with_details(params: ProductKeyParams, details: KeyDetails) -> Self {
        let (low, high) = pack(&params);
        let text = match params.algorithm {
            PKeyAlgorithm::Pkey2009 => encode_base24(low, high),
            PKeyAlgorithm::Pkey2005 => {
                let mut rng = StdRng::seed_from_u64(HostInfo::current().seed());
                legacy_string(&mut rng)
            }
        };
        Self {
            params,
            details,
            low,
            high,
            text,
        }
    }

    /// Parses a PKEY2009 key string and validates its checksum.
    ///
    /// Dashes are optional and letters may be lowercase. PKEY2005 strings
    /// are rejected since they do not encode their parameters.
    ///
    /// # Errors
    ///
    /// Returns [`PKeyError::InvalidKey`] for malformed input and
    /// [`PKeyError::ChecksumMismatch`] when the embedded checksum is wrong.
    pub fn parse(key: &str) -> PKeyResult<Self> {
        let chars: Vec<u8> = key
            .bytes()
            .filter(|&b| b != b'-')
            .map(|b| b.to_ascii_uppercase())
            .collect();
        if chars.len() != KEY_DIGITS {
            return Err(PKeyError::InvalidKey(format!(
                "expected {KEY_DIGITS} symbols, found {}",
                chars.len()
            )));
        }

        let mut marker = None;
        let mut digits = Vec::with_capacity(KEY_DIGITS);
        for (i, &c) in chars.iter().enumerate() {
            if c == b'N' {
                if marker.replace(i).is_some() {
                    return Err(PKeyError::InvalidKey("more than one N".to_string()));
                }
                continue;
            }
            let digit = ALPHABET
                .iter()
                .position(|&a| a == c)
                .ok_or_else(|| PKeyError::InvalidKey(format!("invalid symbol '{}'", c as char)))?;
            digits.push(digit as u128);
        }
        let first = marker.ok_or_else(|| PKeyError::InvalidKey("missing N".to_string()))?;

        let value = std::iter::once(first as u128)
            .chain(digits)
            .fold(0u128, |acc, d| acc * 24 + d);
        let low = value as u64;
        let high = (value >> 64) as u64;
        if high >> 50 != 0 {
            return Err(PKeyError::InvalidKey("value out of range".to_string()));
        }

        let stored = ((high >> CHECKSUM_SHIFT) & CHECKSUM_MASK) as u32;
        let bare = high & !(CHECKSUM_MASK << CHECKSUM_SHIFT);
        let computed = checksum(low, bare);
        if stored != computed {
            return Err(PKeyError::ChecksumMismatch { stored, computed });
        }

        let params = ProductKeyParams {
            group: (low & 0xfffff) as u32,
            serial: ((low >> 20) & 0x3fff_ffff) as u32,
            security: (low >> 50) | ((bare & SECURITY_HIGH_MASK) << 14),
            upgrade: (high >> 49) & 1 == 1,
            algorithm: PKeyAlgorithm::Pkey2009,
        };
        Ok(Self {
            params,
            details: KeyDetails::default(),
            low,
            high,
            text: encode_base24(low, high),
        })
    }

    /// The numeric parameters.
    #[must_use]
    pub fn params(&self) -> &ProductKeyParams {
        &self.params
    }

    /// Product descriptors inherited from configuration.
    #[must_use]
    pub fn details(&self) -> &KeyDetails {
        &self.details
    }

    #[must_use]
    pub fn group(&self) -> u32 {
        self.params.group
    }

    #[must_use]
    pub fn serial(&self) -> u32 {
        self.params.serial
    }

    #[must_use]
    pub fn security(&self) -> u64 {
        self.params.security
    }

    #[must_use]
    pub fn upgrade(&self) -> bool {
        self.params.upgrade
    }

    #[must_use]
    pub fn algorithm(&self) -> PKeyAlgorithm {
        self.params.algorithm
    }

    /// The packed low word.
    #[must_use]
    pub fn low_word(&self) -> u64 {
        self.low
    }

    /// The packed high word, checksum included.
    #[must_use]
    pub fn high_word(&self) -> u64 {
        self.high
    }

    /// The 10-bit checksum stored in the high word.
    #[must_use]
    pub fn checksum(&self) -> u32 {
        ((self.high >> CHECKSUM_SHIFT) & CHECKSUM_MASK) as u32
    }

    /// The packed words as 16 little-endian bytes.
    #[must_use]
    pub fn key_bytes(&self) -> [u8; 16] {
        key_bytes(self.low, self.high)
    }

    /// The dashed key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The rights-management URI of the key's algorithm.
    #[must_use]
    pub fn algorithm_uri(&self) -> &'static str {
        self.params.algorithm.uri()
    }

    /// The product key id: the first 16 bytes of a SHA-256 over the key's
    /// binding bag, read as a GUID.
    #[must_use]
    pub fn pkey_id(&self) -> Guid {
        let mut bag = VariableBag::new(BagLayout::Current);
        bag.extend([
            BagEntry::string("SppPkeyBindingProductKey", &self.text),
            BagEntry::binary("SppPkeyBindingMiscData", Vec::new()),
            BagEntry::string("SppPkeyBindingAlgorithm", self.algorithm_uri()),
        ]);
        let digest = sha256(&bag.serialize());
        let mut head = [0u8; 16];
        head.copy_from_slice(&digest[..16]);
        Guid::from_bytes_le(head)
    }

    /// The compact parameter block used for phone activation.
    ///
    /// # Errors
    ///
    /// Returns [`PKeyError::UnsupportedVersion`] for Vista, which has no
    /// phone data layout.
    pub fn phone_data(&self, version: PsVersion) -> PKeyResult<Vec<u8>> {
        let p = &self.params;
        match version {
            PsVersion::Vista => Err(PKeyError::UnsupportedVersion(version)),
            PsVersion::Win7 => {
                let packed = (u64::from(p.group) << 41)
                    | (p.security << 31)
                    | (u64::from(p.serial) << 1)
                    | u64::from(p.upgrade);
                Ok(packed.to_le_bytes().to_vec())
            }
            PsVersion::Win8 | PsVersion::WinBlue | PsVersion::WinModern => {
                let mut w = ByteWriter::with_capacity(40);
                w.write_bytes(&p.algorithm.id().to_bytes_le());
                w.write_i32(p.group as i32);
                w.write_i32((p.serial / 1_000_000) as i32);
                w.write_i32((p.serial % 1_000_000) as i32);
                w.write_i32(i32::from(p.upgrade));
                w.write_u64(p.security);
                Ok(w.into_inner())
            }
        }
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for ProductKey {
    type Err = PKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn pack(p: &ProductKeyParams) -> (u64, u64) {
    let low = (p.security & 0x3fff) << 50
        | (u64::from(p.serial) & 0x3fff_ffff) << 20
        | (u64::from(p.group) & 0xfffff);
    let high = u64::from(p.upgrade) << 49 | ((p.security >> 14) & SECURITY_HIGH_MASK);
    (low, high | u64::from(checksum(low, high)) << CHECKSUM_SHIFT)
}

fn key_bytes(low: u64, high: u64) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&low.to_le_bytes());
    bytes[8..].copy_from_slice(&high.to_le_bytes());
    bytes
}

fn checksum(low: u64, high: u64) -> u32 {
    crc32(&key_bytes(low, high)) & CHECKSUM_MASK as u32
}

fn encode_base24(low: u64, high: u64) -> String {
    let mut value = u128::from(low) | u128::from(high) << 64;
    let mut digits = [0u8; KEY_DIGITS];
    for d in digits.iter_mut().rev() {
        *d = (value % 24) as u8;
        value /= 24;
    }

    let first = usize::from(digits[0]);
    let mut symbols: Vec<u8> = digits[1..].iter().map(|&d| ALPHABET[usize::from(d)]).collect();
    symbols.insert(first, b'N');
    group_symbols(&symbols)
}

fn legacy_string<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut symbols = LEGACY_PREFIX.as_bytes().to_vec();
    symbols.extend((0..5).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())]));
    group_symbols(&symbols)
}

fn group_symbols(symbols: &[u8]) -> String {
    symbols
        .chunks(5)
        .map(|chunk| chunk.iter().map(|&b| b as char).collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}
