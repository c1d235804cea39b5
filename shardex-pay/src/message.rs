//! Canonical signed payment message.
//!
//! The preimage is a JSON object with a fixed field order:
//!
//! ```text
//! {"v":1,"url":…,"price":…,"recipient":…,"token":…,"nonce":…,"payer":…,"timestamp":…}
//! ```
//!
//! `price` is the canonical decimal rendering, `token` falls back to
//! [`NATIVE_TOKEN`], and `timestamp` is unix seconds. Two implementations given
//! the same logical inputs must produce byte-identical preimages.

use crate::challenge::PaymentChallenge;
use crate::error::PaymentError;
use serde::Serialize;
use sha2::{Digest, Sha256};

pub const PAYMENT_MESSAGE_VERSION: u8 = 1;

/// Token value signed when the challenge names no token contract.
pub const NATIVE_TOKEN: &str = "native";

#[derive(Serialize)]
struct CanonicalPaymentMessage<'a> {
    v: u8,
    url: &'a str,
    price: String,
    recipient: &'a str,
    token: &'a str,
    nonce: &'a str,
    payer: &'a str,
    timestamp: u64,
}

/// The nonce a proof binds: the challenge's own, or one derived from the
/// signing time.
pub fn effective_nonce(challenge: &PaymentChallenge, now_millis: u64) -> String {
    challenge
        .nonce
        .clone()
        .unwrap_or_else(|| format!("t{now_millis}"))
}

/// Serialize the canonical preimage.
pub fn canonical_message(
    challenge: &PaymentChallenge,
    url: &str,
    payer: &str,
    nonce: &str,
    timestamp: u64,
) -> Result<Vec<u8>, PaymentError> {
    let message = CanonicalPaymentMessage {
        v: PAYMENT_MESSAGE_VERSION,
        url,
        price: challenge.price.to_string(),
        recipient: &challenge.pay_to,
        token: challenge.token.as_deref().unwrap_or(NATIVE_TOKEN),
        nonce,
        payer,
        timestamp,
    };
    serde_json::to_vec(&message).map_err(|e| PaymentError::Encoding(e.to_string()))
}

/// `0x`-prefixed sha256 over the message followed by the signature.
pub fn transaction_ref(message: &[u8], signature: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message);
    hasher.update(signature.as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}
