//! Product ids derived from a key: PID2, `DigitalProductId` (PID3),
//! `DigitalProductId4` and the extended PID string.
//!
//! Only PKEY2005 keys have a PID2; for PKEY2009 it is empty and the
//! structures embedding it carry an empty string.

use crate::key::{PKeyAlgorithm, ProductKey};
use crate::system::HostInfo;
use chrono::{Datelike, Local, NaiveDate};
use rand::Rng;
use spp_types::{ByteWriter, crc32, encode_fixed_ascii, encode_fixed_utf16};

/// Size of a `DigitalProductId` structure.
pub const PID3_SIZE: usize = 0xA4;

/// Size of a `DigitalProductId4` structure.
pub const PID4_SIZE: usize = 0x4F8;

/// Returns the default MPC (manufacturing product code) for an OS build.
#[must_use]
pub fn mpc_for_build(build: u32) -> &'static str {
    match build {
        10240.. => "03612",
        9600.. => "06401",
        9200.. => "05426",
        _ => "55041",
    }
}

/// Looks up `"{arch}.{edition}="` in the contents of an `oobe\setup.cfg`.
#[must_use]
pub fn setup_cfg_mpc(contents: &str, arch: &str, edition: &str) -> Option<String> {
    let needle = format!("{arch}.{edition}=");
    contents
        .lines()
        .find(|line| line.contains(&needle))
        .and_then(|line| line.split('=').nth(1))
        .map(|mpc| mpc.trim().to_string())
}

/// System facts mixed into product ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidContext {
    /// OS build number.
    pub build: u32,
    /// Locale identifier.
    pub lcid: u32,
    /// Architecture name used in setup configuration.
    pub arch: String,
    /// Install date.
    pub date: NaiveDate,
    /// Contents of the system's `setup.cfg`, if one exists.
    pub setup_cfg: Option<String>,
}

impl PidContext {
    #[must_use]
    pub fn new(build: u32, lcid: u32, date: NaiveDate) -> Self {
        Self {
            build,
            lcid,
            arch: "amd64".to_string(),
            date,
            setup_cfg: None,
        }
    }

    /// Context for the running system and today's date.
    #[must_use]
    pub fn current() -> Self {
        let host = HostInfo::current();
        Self {
            build: host.build,
            lcid: host.lcid,
            arch: host.arch.to_string(),
            date: Local::now().date_naive(),
            setup_cfg: read_setup_cfg(),
        }
    }

    #[must_use]
    pub fn with_setup_cfg(mut self, contents: impl Into<String>) -> Self {
        self.setup_cfg = Some(contents.into());
        self
    }
}

fn read_setup_cfg() -> Option<String> {
    let root = std::env::var_os("SystemRoot")?;
    let path = std::path::Path::new(&root)
        .join("System32")
        .join("oobe")
        .join("setup.cfg");
    std::fs::read_to_string(path).ok()
}

impl ProductKey {
    /// The MPC for this key: the edition's entry in `setup.cfg`, or the
    /// default for the build.
    #[must_use]
    pub fn mpc(&self, ctx: &PidContext) -> String {
        let edition = &self.details().edition;
        ctx.setup_cfg
            .as_deref()
            .filter(|_| !edition.contains(';'))
            .and_then(|cfg| setup_cfg_mpc(cfg, &ctx.arch, edition))
            .unwrap_or_else(|| mpc_for_build(ctx.build).to_string())
    }

    /// The PID2 string, empty for PKEY2009 keys.
    #[must_use]
    pub fn pid2(&self, ctx: &PidContext) -> String {
        self.pid2_with(ctx, &mut rand::thread_rng())
    }

    /// [`pid2`](Self::pid2) with a caller-supplied generator for the
    /// random part of retail ids.
    #[must_use]
    pub fn pid2_with<R: Rng + ?Sized>(&self, ctx: &PidContext, rng: &mut R) -> String {
        if self.algorithm() != PKeyAlgorithm::Pkey2005 {
            return String::new();
        }

        let group = self.group();
        let serial = self.serial();
        let (high, low, last) = if self.details().eula_type == "OEM" {
            let low = ((group / 2) % 100) * 10000 + serial / 100_000;
            ("OEM".to_string(), low, serial % 100_000)
        } else {
            let last = ((group / 2) % 100) * 1000 + rng.gen_range(0..1000);
            (format!("{:03}", serial / 1_000_000), serial % 1_000_000, last)
        };

        format!(
            "{}-{high}-{low:06}{}-{last:05}",
            self.mpc(ctx),
            check_digit(low)
        )
    }

    /// The 0xA4-byte `DigitalProductId`.
    #[must_use]
    pub fn pid3(&self, ctx: &PidContext) -> Vec<u8> {
        let details = self.details();
        let mut w = ByteWriter::with_capacity(PID3_SIZE);
        w.write_u32(PID3_SIZE as u32);
        w.write_u32(3);
        w.write_bytes(&encode_fixed_ascii(&self.pid2(ctx), 24));
        w.write_i32(self.group() as i32);
        w.write_bytes(&encode_fixed_ascii(&details.part_number, 16));
        w.write_zeros(0x6C);

        let reversed: Vec<u8> = w.as_slice().iter().rev().copied().collect();
        w.write_bytes(&(!crc32(&reversed)).to_be_bytes());
        w.into_inner()
    }

    /// The 0x4F8-byte `DigitalProductId4`.
    #[must_use]
    pub fn pid4(&self, ctx: &PidContext) -> Vec<u8> {
        let details = self.details();
        let mut w = ByteWriter::with_capacity(PID4_SIZE);
        w.write_u32(PID4_SIZE as u32);
        w.write_u32(4);
        w.write_bytes(&encode_fixed_utf16(&self.extended_pid(ctx), 0x80));
        w.write_bytes(&encode_fixed_utf16(&details.activation_id.to_string(), 0x80));
        w.write_zeros(0x10);
        w.write_bytes(&encode_fixed_utf16(&details.edition, 0x208));
        w.write_u64(u64::from(self.upgrade()));
        w.write_zeros(0x50);
        w.write_bytes(&encode_fixed_utf16(&details.part_number, 0x80));
        w.write_bytes(&encode_fixed_utf16(&details.channel, 0x80));
        w.write_bytes(&encode_fixed_utf16(&details.eula_type, 0x80));
        w.into_inner()
    }

    /// The extended PID:
    /// `mpc-group-serialHigh-serialLow-licenseType-lcid-build.0000-dayYear`.
    #[must_use]
    pub fn extended_pid(&self, ctx: &PidContext) -> String {
        let license_type = match self.details().eula_type.as_str() {
            "OEM" => 2,
            "Volume" => 3,
            _ => 0,
        };
        format!(
            "{}-{:05}-{:03}-{:06}-{:02}-{:04}-{:04}.0000-{:03}{:04}",
            self.mpc(ctx),
            self.group(),
            self.serial() / 1_000_000,
            self.serial() % 1_000_000,
            license_type,
            ctx.lcid,
            ctx.build,
            ctx.date.ordinal(),
            ctx.date.year(),
        )
    }
}

fn check_digit(low: u32) -> u32 {
    let sum: u32 = low
        .to_string()
        .chars()
        .filter_map(|c| c.to_digit(10))
        .sum();
    7 - sum % 7
}
