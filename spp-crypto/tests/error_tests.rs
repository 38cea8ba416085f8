use spp_crypto::CryptoError;

#[test]
fn error_display_truncated() {
    let err = CryptoError::Truncated {
        expected: 0x110,
        actual: 12,
    };
    let msg = format!("{err}");
    assert!(msg.contains("272"));
    assert!(msg.contains("12"));
}

#[test]
fn error_display_signature() {
    let err = CryptoError::SignatureInvalid;
    assert!(format!("{err}").contains("signature invalid"));
}

#[test]
fn error_display_integrity() {
    let err = CryptoError::IntegrityMismatch {
        algorithm: "HMAC-SHA1",
    };
    assert!(format!("{err}").contains("HMAC-SHA1"));
}

#[test]
fn error_display_key_size() {
    let err = CryptoError::UnsupportedKeySize { bits: 2048 };
    assert!(format!("{err}").contains("2048"));
}

#[test]
fn error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: CryptoError = io.into();
    assert!(format!("{err}").contains("I/O error"));
}

#[test]
fn error_from_serde_json() {
    let serde_err: Result<serde_json::Value, _> = serde_json::from_str("not json");
    let err: CryptoError = serde_err.unwrap_err().into();
    assert!(format!("{err}").contains("invalid configuration"));
}

#[test]
fn error_is_debug() {
    let _ = format!("{:?}", CryptoError::Decryption("x".into()));
}
