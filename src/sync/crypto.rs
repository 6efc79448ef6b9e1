//! Sealing for sync payloads sent to a remote (non-local-file) server
//! (§4.7): serialize, compress with `zstd`, then seal with `aes-gcm` so
//! the server sees only opaque blobs.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::SyncError;

const NONCE_LEN: usize = 12;

fn key_from_secret(secret: &[u8; 32]) -> Key<Aes256Gcm> {
    *Key::<Aes256Gcm>::from_slice(secret)
}

/// Decode a `Configuration::sync`'s base64-encoded secret into the
/// 32-byte AEAD key `seal`/`unseal` need.
pub fn decode_secret(encoded: &str) -> Result<[u8; 32], SyncError> {
    let bytes = BASE64.decode(encoded).map_err(|e| SyncError::Crypto { message: e.to_string() })?;
    bytes.try_into().map_err(|bytes: Vec<u8>| SyncError::Crypto {
        message: format!("encryption secret must decode to 32 bytes, got {}", bytes.len()),
    })
}

/// Compress then seal `plaintext`, returning `nonce || ciphertext`.
pub fn seal(plaintext: &[u8], secret: &[u8; 32]) -> Result<Vec<u8>, SyncError> {
    let compressed = zstd::encode_all(plaintext, 0).map_err(|e| SyncError::Crypto { message: e.to_string() })?;

    let cipher = Aes256Gcm::new(&key_from_secret(secret));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, compressed.as_ref())
        .map_err(|e| SyncError::Crypto { message: e.to_string() })?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Inverse of [`seal`]: split the nonce prefix, decrypt, decompress.
pub fn unseal(sealed: &[u8], secret: &[u8; 32]) -> Result<Vec<u8>, SyncError> {
    if sealed.len() < NONCE_LEN {
        return Err(SyncError::Crypto { message: "sealed payload too short".to_string() });
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new(&key_from_secret(secret));
    let compressed = cipher
        .decrypt(nonce_bytes.into(), ciphertext)
        .map_err(|e| SyncError::Crypto { message: e.to_string() })?;

    zstd::decode_all(compressed.as_slice()).map_err(|e| SyncError::Crypto { message: e.to_string() })
}
