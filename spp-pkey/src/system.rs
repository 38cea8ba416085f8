//! Facts about the running system that end up inside product identifiers.
//!
//! Only the Windows version string and build number are needed. Other
//! hosts report an unknown version with build 0.

use spp_crypto::digest::sha256;
use std::env;
use std::sync::OnceLock;

const UNKNOWN_VERSION: &str = "unknown";

/// US English, used when the system locale cannot be determined.
pub const DEFAULT_LCID: u32 = 0x0409;

/// Version details of the running system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// Operating system version string.
    pub os_version: String,
    /// Windows build number, 0 elsewhere.
    pub build: u32,
    /// Locale identifier.
    pub lcid: u32,
    /// Architecture name as setup configuration files spell it.
    pub arch: &'static str,
}

impl HostInfo {
    /// Information about the running system, collected on first use.
    #[must_use]
    pub fn current() -> &'static Self {
        static HOST: OnceLock<HostInfo> = OnceLock::new();
        HOST.get_or_init(Self::collect)
    }

    /// Collects information about the running system.
    #[must_use]
    pub fn collect() -> Self {
        let os_version = get_os_version();
        let build = parse_build(&os_version).unwrap_or(0);
        Self {
            os_version,
            build,
            lcid: DEFAULT_LCID,
            arch: setup_arch(),
        }
    }

    /// A stable seed derived from the OS version and build.
    #[must_use]
    pub fn seed(&self) -> u64 {
        let digest = sha256(format!("{}|{}", self.os_version, self.build).as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(head)
    }
}

/// Extracts the build number from a `major.minor.build[.revision]` string.
#[must_use]
pub fn parse_build(version: &str) -> Option<u32> {
    let start = version.find(|c: char| c.is_ascii_digit())?;
    let numeric: String = version[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric.split('.').nth(2)?.parse().ok()
}

fn setup_arch() -> &'static str {
    match env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        _ => "x86",
    }
}

#[cfg(windows)]
fn get_os_version() -> String {
    // "Microsoft Windows [Version 10.0.19045.3693]"
    std::process::Command::new("cmd")
        .args(["/C", "ver"])
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .and_then(|s| {
            let (_, rest) = s.split_once("Version ")?;
            Some(rest.trim_end_matches([']', '\r', '\n']).to_string())
        })
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
}

#[cfg(not(windows))]
fn get_os_version() -> String {
    UNKNOWN_VERSION.to_string()
}
