//! Stored payload formats.
//!
//! Plain:  `SHV1 | u32 LE dimension | dimension × f32 LE`
//! Sealed: `SHX1 | 24-byte XChaCha20 nonce | ciphertext(plain payload)`
//!
//! The sealing nonce is derived from the key and the plaintext, so sealing is
//! deterministic and identical vectors share one content address.

use crate::error::CatalogError;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use sha2::{Digest, Sha256};

pub const PLAIN_MAGIC: &[u8; 4] = b"SHV1";
pub const SEALED_MAGIC: &[u8; 4] = b"SHX1";

const HEADER_LEN: usize = 8;
const NONCE_LEN: usize = 24;
const NONCE_DOMAIN: &[u8] = b"shardex/seal-nonce/v1";

pub fn encode_vector(vector: &[f32]) -> Result<Vec<u8>, CatalogError> {
    let dimension = u32::try_from(vector.len())
        .map_err(|_| CatalogError::Codec(format!("dimension {} too large", vector.len())))?;
    let mut out = Vec::with_capacity(HEADER_LEN + vector.len() * 4);
    out.extend_from_slice(PLAIN_MAGIC);
    out.extend_from_slice(&dimension.to_le_bytes());
    for value in vector {
        out.extend_from_slice(&value.to_le_bytes());
    }
    Ok(out)
}

pub fn decode_vector(bytes: &[u8]) -> Result<Vec<f32>, CatalogError> {
    let Some((magic, rest)) = bytes.split_first_chunk::<4>() else {
        return Err(CatalogError::Codec("payload shorter than header".to_string()));
    };
    if magic != PLAIN_MAGIC {
        return Err(CatalogError::Codec("unknown payload magic".to_string()));
    }
    let Some((dimension, body)) = rest.split_first_chunk::<4>() else {
        return Err(CatalogError::Codec("payload shorter than header".to_string()));
    };
    let dimension = u32::from_le_bytes(*dimension) as usize;
    if body.len() != dimension.saturating_mul(4) {
        return Err(CatalogError::Codec(format!(
            "expected {dimension} components, found {} bytes",
            body.len()
        )));
    }
    Ok(body
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

pub fn is_sealed(bytes: &[u8]) -> bool {
    bytes.starts_with(SEALED_MAGIC)
}

fn derive_nonce(key: &[u8; 32], plaintext: &[u8]) -> [u8; NONCE_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(NONCE_DOMAIN);
    hasher.update(key);
    hasher.update(plaintext);
    let digest = hasher.finalize();
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&digest[..NONCE_LEN]);
    nonce
}

pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, CatalogError> {
    let nonce = derive_nonce(key, plaintext);
    let cipher = XChaCha20Poly1305::new(key.into());
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| CatalogError::Crypto(e.to_string()))?;
    let mut out = Vec::with_capacity(4 + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(SEALED_MAGIC);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub fn open(key: &[u8; 32], sealed: &[u8]) -> Result<Vec<u8>, CatalogError> {
    let body = sealed
        .strip_prefix(SEALED_MAGIC.as_slice())
        .ok_or_else(|| CatalogError::Crypto("payload is not sealed".to_string()))?;
    if body.len() < NONCE_LEN {
        return Err(CatalogError::Crypto("sealed payload truncated".to_string()));
    }
    let (nonce, ciphertext) = body.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(key.into());
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| CatalogError::Crypto("authentication failed".to_string()))
}
