//! Reversible credential obfuscation for the host settings store.
//!
//! This is NOT cryptography: a stored value is XORed against a process-wide
//! secret and base64-encoded, which only guarantees the settings store never
//! holds the literal credential. A rebuild that needs confidentiality under
//! threat should replace this with authenticated encryption. Credentials are
//! stored per vendor, so switching vendors keeps the others intact.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use storeagent_core::Error;

fn xor(data: &[u8], secret: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(secret.iter().cycle())
        .map(|(byte, key)| byte ^ key)
        .collect()
}

/// Obfuscate a plaintext credential for storage.
pub fn obfuscate(plain: &str, secret: &str) -> String {
    STANDARD.encode(xor(plain.as_bytes(), secret.as_bytes()))
}

/// Reverse [`obfuscate`] on a stored value.
pub fn reveal(stored: &str, secret: &str) -> Result<String, Error> {
    let raw = STANDARD
        .decode(stored)
        .map_err(|e| Error::Config(format!("stored credential is not valid base64: {}", e)))?;
    String::from_utf8(xor(&raw, secret.as_bytes()))
        .map_err(|_| Error::Config("stored credential did not decode to UTF-8".to_string()))
}
