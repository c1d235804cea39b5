//! Payment proofs and the authorization header value that carries them.

use crate::error::PaymentError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Evidence that a challenge was signed.
///
/// Serializes as `{"tx":…,"sig":…,"ts":…}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    #[serde(rename = "tx")]
    pub transaction_ref: String,
    #[serde(rename = "sig")]
    pub signature: String,
    /// Unix seconds at signing.
    #[serde(rename = "ts")]
    pub timestamp: u64,
}

/// `<scheme> <base64(json proof)>`, ready for an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorizationToken(String);

impl AuthorizationToken {
    pub fn encode(scheme: &str, proof: &PaymentProof) -> Result<Self, PaymentError> {
        let json = serde_json::to_vec(proof).map_err(|e| PaymentError::Encoding(e.to_string()))?;
        Ok(Self(format!("{scheme} {}", STANDARD.encode(json))))
    }

    /// Decode a header value issued under `scheme`.
    pub fn decode(scheme: &str, value: &str) -> Result<PaymentProof, PaymentError> {
        let malformed = |msg: String| PaymentError::MalformedToken(msg);
        let value = value.trim();
        let (found, payload) = value
            .split_once(' ')
            .ok_or_else(|| malformed("expected `<scheme> <payload>`".to_string()))?;
        if !found.eq_ignore_ascii_case(scheme) {
            return Err(malformed(format!("unexpected scheme `{found}`")));
        }
        let json = STANDARD
            .decode(payload.trim())
            .map_err(|e| malformed(format!("base64: {e}")))?;
        serde_json::from_slice(&json).map_err(|e| malformed(format!("json: {e}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AuthorizationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AuthorizationToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
