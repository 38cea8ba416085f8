//! Key material for the store envelope.
//!
//! A store is protected by one of two RSA-1024 key pairs, "production" and
//! "test". Which one applies is always an explicit caller decision; nothing
//! here tries to guess it from file contents. Keys are exchanged as
//! Microsoft CryptoAPI `PRIVATEKEYBLOB`s.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use spp_types::{ByteReader, ByteWriter};
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of an RSA block (signature or wrapped key) in bytes.
pub const RSA_BLOCK_SIZE: usize = 0x80;

/// Size of the per-write integrity key in bytes.
pub const INTEGRITY_KEY_SIZE: usize = 0x10;

const PRIVATEKEYBLOB: u8 = 0x07;
const CUR_BLOB_VERSION: u8 = 0x02;
const CALG_RSA_KEYX: u32 = 0x0000_A400;
const RSA2_MAGIC: u32 = 0x3241_5352;

/// Selects which of the two key pairs protects a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySet {
    /// Keys used by retail builds of the licensing service.
    #[default]
    Production,
    /// Keys used by test-signed builds.
    Test,
}

/// An RSA-1024 private key able to open and seal store envelopes.
#[derive(Clone)]
pub struct StoreKey {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl StoreKey {
    /// Wraps an RSA private key, rejecting moduli that do not fit the
    /// envelope's 0x80-byte fields.
    pub fn new(private: RsaPrivateKey) -> CryptoResult<Self> {
        if private.size() != RSA_BLOCK_SIZE {
            return Err(CryptoError::UnsupportedKeySize {
                bits: private.size() * 8,
            });
        }
        let public = private.to_public_key();
        Ok(Self { private, public })
    }

    /// Parses a CryptoAPI `PRIVATEKEYBLOB`.
    pub fn from_csp_blob(blob: &[u8]) -> CryptoResult<Self> {
        let invalid = |e: spp_types::Error| CryptoError::InvalidKeyBlob(e.to_string());
        let mut r = ByteReader::new(blob);

        let header: [u8; 2] = r.read_array().map_err(invalid)?;
        if header[0] != PRIVATEKEYBLOB {
            return Err(CryptoError::InvalidKeyBlob(format!(
                "blob type {:#04x} is not a private key",
                header[0]
            )));
        }
        r.skip(2).map_err(invalid)?;
        let _alg = r.read_u32().map_err(invalid)?;

        if r.read_u32().map_err(invalid)? != RSA2_MAGIC {
            return Err(CryptoError::InvalidKeyBlob("missing RSA2 magic".to_string()));
        }
        let bit_len = r.read_u32().map_err(invalid)? as usize;
        if bit_len % 16 != 0 || bit_len == 0 {
            return Err(CryptoError::InvalidKeyBlob(format!("bad modulus length {bit_len}")));
        }
        let exponent = BigUint::from(r.read_u32().map_err(invalid)?);

        let full = bit_len / 8;
        let half = bit_len / 16;
        let mut next = |len: usize| -> CryptoResult<BigUint> {
            Ok(BigUint::from_bytes_le(r.read_bytes(len).map_err(invalid)?))
        };
        let modulus = next(full)?;
        let prime1 = next(half)?;
        let prime2 = next(half)?;
        let _exponent1 = next(half)?;
        let _exponent2 = next(half)?;
        let _coefficient = next(half)?;
        let private_exponent = next(full)?;

        let private = RsaPrivateKey::from_components(
            modulus,
            exponent,
            private_exponent,
            vec![prime1, prime2],
        )
        .map_err(|e| CryptoError::InvalidKeyBlob(e.to_string()))?;
        Self::new(private)
    }

    /// Serializes the key as a CryptoAPI `PRIVATEKEYBLOB`.
    pub fn to_csp_blob(&self) -> CryptoResult<Vec<u8>> {
        use rsa::traits::PrivateKeyParts;

        let primes = self.private.primes();
        if primes.len() != 2 {
            return Err(CryptoError::InvalidKeyBlob(
                "multi-prime keys cannot be exported".to_string(),
            ));
        }
        let (p, q) = (&primes[0], &primes[1]);
        let d = self.private.d();
        let one = BigUint::from(1u8);
        let dp = d % &(p - &one);
        let dq = d % &(q - &one);
        let qinv = self
            .private
            .crt_coefficient()
            .ok_or_else(|| CryptoError::InvalidKeyBlob("primes are not coprime".to_string()))?;
        let mut exponent = self.public.e().to_bytes_le();
        if exponent.len() > 4 {
            return Err(CryptoError::InvalidKeyBlob(
                "public exponent exceeds 32 bits".to_string(),
            ));
        }
        exponent.resize(4, 0);

        let full = RSA_BLOCK_SIZE;
        let half = RSA_BLOCK_SIZE / 2;
        let mut w = ByteWriter::with_capacity(20 + full * 2 + half * 5);
        w.write_bytes(&[PRIVATEKEYBLOB, CUR_BLOB_VERSION, 0, 0]);
        w.write_u32(CALG_RSA_KEYX);
        w.write_u32(RSA2_MAGIC);
        w.write_len(full * 8);
        w.write_bytes(&exponent);
        for (value, len) in [
            (self.public.n(), full),
            (p, half),
            (q, half),
            (&dp, half),
            (&dq, half),
            (&qinv, half),
            (d, full),
        ] {
            let mut bytes = value.to_bytes_le();
            bytes.resize(len, 0);
            w.write_bytes(&bytes);
        }
        Ok(w.into_inner())
    }

    /// Loads a `PRIVATEKEYBLOB` from a file.
    pub fn load(path: &Path) -> CryptoResult<Self> {
        Self::from_csp_blob(&fs::read(path)?)
    }

    /// Encrypts a short secret with the public key (PKCS#1 v1.5).
    pub fn encrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        self.public
            .encrypt(&mut rand::rngs::OsRng, Pkcs1v15Encrypt, data)
            .map_err(|e| CryptoError::Encryption(e.to_string()))
    }

    /// Decrypts a block produced by [`StoreKey::encrypt`].
    pub fn decrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        self.private
            .decrypt(Pkcs1v15Encrypt, data)
            .map_err(|e| CryptoError::Decryption(e.to_string()))
    }

    /// Signs the SHA-1 digest of `data` (PKCS#1 v1.5).
    pub fn sign(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let hash = crate::digest::sha1(data);
        self.private
            .sign(Pkcs1v15Sign::new::<Sha1>(), &hash)
            .map_err(|e| CryptoError::Encryption(e.to_string()))
    }

    /// Verifies a signature produced by [`StoreKey::sign`].
    #[must_use]
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let hash = crate::digest::sha1(data);
        self.public
            .verify(Pkcs1v15Sign::new::<Sha1>(), &hash, signature)
            .is_ok()
    }
}

impl std::fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreKey")
            .field("bits", &(self.public.size() * 8))
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// Paths to the two key blobs, as found in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRingConfig {
    /// `PRIVATEKEYBLOB` for the production key pair.
    pub production: PathBuf,
    /// `PRIVATEKEYBLOB` for the test key pair.
    pub test: PathBuf,
}

impl KeyRingConfig {
    /// Parses a JSON configuration document.
    pub fn from_json(json: &str) -> CryptoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Both store key pairs.
#[derive(Debug, Clone)]
pub struct KeyRing {
    production: StoreKey,
    test: StoreKey,
}

impl KeyRing {
    /// Builds a key ring from already-parsed keys.
    #[must_use]
    pub fn new(production: StoreKey, test: StoreKey) -> Self {
        Self { production, test }
    }

    /// Loads both key blobs named by `config`.
    pub fn load(config: &KeyRingConfig) -> CryptoResult<Self> {
        Ok(Self {
            production: StoreKey::load(&config.production)?,
            test: StoreKey::load(&config.test)?,
        })
    }

    /// Returns the key pair for `set`.
    #[must_use]
    pub fn select(&self, set: KeySet) -> &StoreKey {
        match set {
            KeySet::Production => &self.production,
            KeySet::Test => &self.test,
        }
    }
}

/// Per-write key for the payload integrity tag, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct IntegrityKey {
    bytes: [u8; INTEGRITY_KEY_SIZE],
}

impl IntegrityKey {
    /// Generates a fresh random key.
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0u8; INTEGRITY_KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Wraps raw key bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; INTEGRITY_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; INTEGRITY_KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for IntegrityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrityKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
