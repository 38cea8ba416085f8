//! AES-128-CBC with a fixed all-zero IV and PKCS#7 padding.
//!
//! The IV never varies in this format; confidentiality of the payload rests
//! on the wrapped key alone.

use crate::error::{CryptoError, CryptoResult};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};

/// Size of the symmetric key in bytes.
pub const AES_KEY_SIZE: usize = 16;

const ZERO_IV: [u8; 16] = [0u8; 16];

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Encrypts `plaintext` under `key`.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = Aes128CbcEnc::new_from_slices(key, &ZERO_IV)
        .map_err(|e| CryptoError::Encryption(format!("invalid AES key: {e}")))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypts `ciphertext` under `key`.
pub fn decrypt(key: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = Aes128CbcDec::new_from_slices(key, &ZERO_IV)
        .map_err(|e| CryptoError::Decryption(format!("invalid AES key: {e}")))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Decryption("bad padding (wrong key or corrupt data)".to_string()))
}
