//! Ed25519 signer and verifier. Addresses are hex-encoded verifying keys.

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use shardex_core::{SignatureVerifier, Signer, SignerError};

/// In-process signer holding an Ed25519 key.
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    pub fn from_hex(secret_hex: &str) -> Result<Self, SignerError> {
        let bytes: [u8; 32] = hex::decode(secret_hex.trim())
            .map_err(|e| SignerError::Signing(format!("secret key: {e}")))?
            .try_into()
            .map_err(|_| SignerError::Signing("expected 32-byte secret key".to_string()))?;
        Ok(Self::from_bytes(&bytes))
    }

    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for Ed25519Signer {
    fn address(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<String, SignerError> {
        Ok(hex::encode(self.signing_key.sign(message).to_bytes()))
    }
}

/// Verifies hex signatures against hex verifying-key addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, address: &str, message: &[u8], signature: &str) -> Result<(), SignerError> {
        let key = parse_verifying_key(address)?;
        let sig = parse_signature(signature)?;
        key.verify(message, &sig)
            .map_err(|_| SignerError::BadSignature(address.to_string()))
    }
}

fn parse_verifying_key(hex_key: &str) -> Result<VerifyingKey, SignerError> {
    let invalid = || SignerError::InvalidAddress(hex_key.to_string());
    let bytes: [u8; 32] = hex::decode(hex_key)
        .map_err(|_| invalid())?
        .try_into()
        .map_err(|_| invalid())?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| invalid())
}

fn parse_signature(hex_sig: &str) -> Result<Signature, SignerError> {
    let bytes: [u8; 64] = hex::decode(hex_sig)
        .map_err(|e| SignerError::MalformedSignature(e.to_string()))?
        .try_into()
        .map_err(|_| SignerError::MalformedSignature("expected 64-byte signature".to_string()))?;
    Ok(Signature::from_bytes(&bytes))
}
