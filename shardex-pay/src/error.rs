//! Payment protocol errors

use shardex_core::SignerError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("malformed payment challenge: {0}")]
    MalformedChallenge(String),

    #[error("expected status 402 Payment Required, got {0}")]
    UnsupportedStatus(u16),

    #[error("response carries no payment challenge")]
    MissingChallenge,

    #[error("no signer configured")]
    MissingSigner,

    #[error("payment challenge expired at {expiry} (now {now})")]
    ExpiredChallenge { expiry: u64, now: u64 },

    #[error("nonce `{0}` was already used")]
    ReplayedNonce(String),

    #[error("malformed authorization token: {0}")]
    MalformedToken(String),

    #[error("authorization does not match any outstanding challenge for `{0}`")]
    UnknownProof(String),

    #[error("payment signature rejected: {0}")]
    InvalidSignature(String),

    #[error("payment flow cannot move from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("header encoding failed: {0}")]
    Encoding(String),

    #[error(transparent)]
    Signer(#[from] SignerError),
}

impl PaymentError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedChallenge(_) => "malformed_challenge",
            Self::UnsupportedStatus(_) => "unsupported_status",
            Self::MissingChallenge => "missing_challenge",
            Self::MissingSigner => "missing_signer",
            Self::ExpiredChallenge { .. } => "expired_challenge",
            Self::ReplayedNonce(_) => "replayed_nonce",
            Self::MalformedToken(_) => "malformed_token",
            Self::UnknownProof(_) => "unknown_proof",
            Self::InvalidSignature(_) => "invalid_signature",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Encoding(_) => "encoding_error",
            Self::Signer(_) => "signer_error",
        }
    }
}
