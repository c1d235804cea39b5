//! Signing capabilities used by the payment protocol.

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    #[error("signing failed: {0}")]
    Signing(String),

    #[error("invalid signer address `{0}`")]
    InvalidAddress(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("signature does not verify for `{0}`")]
    BadSignature(String),
}

/// A wallet able to sign payment messages.
///
/// No assumption is made about where keys live; remote wallets and hardware
/// signers are expected to implement this.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Public identity of this signer.
    fn address(&self) -> String;

    /// Sign `message`, returning the encoded signature.
    async fn sign_message(&self, message: &[u8]) -> Result<String, SignerError>;
}

/// Verifies signatures produced by a [`Signer`].
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, address: &str, message: &[u8], signature: &str) -> Result<(), SignerError>;
}
