//! Product-version families and the on-disk layouts they select.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The licensing-service generation that owns a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PsVersion {
    /// Vista / Server 2008.
    Vista,
    /// Windows 7 / Server 2008 R2.
    Win7,
    /// Windows 8 / Server 2012.
    Win8,
    /// Windows 8.1 / Server 2012 R2.
    WinBlue,
    /// Windows 10 and later.
    WinModern,
}

/// Record layout used by a trusted store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreLayout {
    /// Flat record list without keys, mirrored to two files.
    Vista,
    /// Flat record list with a key per record, mirrored to two files.
    Win7,
    /// Records grouped under string keys, single file.
    Modern,
}

/// Entry layout used by a variable bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BagLayout {
    /// Checksum-last entries, CRC over the value only, no padding.
    Legacy,
    /// Checksum-first entries, CRC over the canonical encoding, 8-byte aligned.
    Current,
}

impl PsVersion {
    /// All known versions, oldest first.
    pub const ALL: [PsVersion; 5] = [
        PsVersion::Vista,
        PsVersion::Win7,
        PsVersion::Win8,
        PsVersion::WinBlue,
        PsVersion::WinModern,
    ];

    /// Returns the trusted-store record layout for this version.
    #[must_use]
    pub const fn store_layout(self) -> StoreLayout {
        match self {
            Self::Vista => StoreLayout::Vista,
            Self::Win7 => StoreLayout::Win7,
            Self::Win8 | Self::WinBlue | Self::WinModern => StoreLayout::Modern,
        }
    }

    /// Returns the variable-bag layout for this version.
    #[must_use]
    pub const fn bag_layout(self) -> BagLayout {
        match self {
            Self::Vista => BagLayout::Legacy,
            _ => BagLayout::Current,
        }
    }

    /// Returns the 4-byte tag written at the start of an encrypted store.
    #[must_use]
    pub const fn envelope_tag(self) -> u32 {
        match self {
            Self::Vista => 2,
            Self::Win7 => 5,
            Self::Win8 => 1,
            Self::WinBlue => 2,
            Self::WinModern => 3,
        }
    }

    /// Returns true if the trusted store is kept as a primary/secondary pair.
    #[must_use]
    pub const fn is_mirrored(self) -> bool {
        matches!(self, Self::Vista | Self::Win7)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Vista => "vista",
            Self::Win7 => "win7",
            Self::Win8 => "win8",
            Self::WinBlue => "winblue",
            Self::WinModern => "winmodern",
        }
    }
}

impl fmt::Display for PsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PsVersion {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == lower)
            .ok_or_else(|| crate::Error::UnknownVersion(s.to_string()))
    }
}
