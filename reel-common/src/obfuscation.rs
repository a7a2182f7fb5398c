//! Media URL obfuscation
//!
//! The backend ships episode URLs as base64 of the URL bytes XORed with a
//! repeating key. The key is a fixed deployment constant, so this hides
//! URLs from casual inspection only. It is not a trust boundary.

use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Recover the plain URL from an obfuscated blob
///
/// Fails when the key is empty, the blob is not base64, or the XORed
/// bytes are not UTF-8.
pub fn reveal(blob: &str, key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(Error::Decode("obfuscation key is empty".to_string()));
    }

    let bytes = STANDARD
        .decode(blob.trim())
        .map_err(|e| Error::Decode(format!("invalid base64: {}", e)))?;

    let plain = xor_with_key(&bytes, key.as_bytes());

    String::from_utf8(plain).map_err(|e| Error::Decode(format!("not UTF-8 after XOR: {}", e)))
}

/// Produce the obfuscated form of a URL (inverse of [`reveal`])
pub fn conceal(plain: &str, key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(Error::Decode("obfuscation key is empty".to_string()));
    }
    Ok(STANDARD.encode(xor_with_key(plain.as_bytes(), key.as_bytes())))
}

fn xor_with_key(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, byte)| byte ^ key[i % key.len()])
        .collect()
}
