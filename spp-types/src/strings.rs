//! UTF-16LE string encodings used by the stores.

fn utf16_units(bytes: &[u8]) -> impl Iterator<Item = u16> + '_ {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
}

/// Encodes `s` as UTF-16LE followed by a NUL code unit.
#[must_use]
pub fn encode_string(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

/// Decodes UTF-16LE bytes, dropping surrounding NUL code units.
///
/// Invalid sequences are replaced rather than rejected since record values
/// are frequently binary.
#[must_use]
pub fn decode_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = utf16_units(bytes).collect();
    String::from_utf16_lossy(&units)
        .trim_matches('\0')
        .to_string()
}

/// Decodes a fixed-width UTF-16LE field, stopping at the first NUL.
#[must_use]
pub fn decode_fixed_utf16(bytes: &[u8]) -> String {
    let units: Vec<u16> = utf16_units(bytes).take_while(|&u| u != 0).collect();
    String::from_utf16_lossy(&units)
}

/// Encodes `s` as UTF-16LE into exactly `width` bytes, truncating or
/// zero-padding as needed.
#[must_use]
pub fn encode_fixed_utf16(s: &str, width: usize) -> Vec<u8> {
    let mut out: Vec<u8> = s.encode_utf16().flat_map(u16::to_le_bytes).collect();
    out.resize(width, 0);
    out
}

/// Encodes `s` as single-byte characters into exactly `width` bytes.
/// Characters outside ASCII become `?`.
#[must_use]
pub fn encode_fixed_ascii(s: &str, width: usize) -> Vec<u8> {
    let mut out: Vec<u8> = s
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect();
    out.resize(width, 0);
    out
}
