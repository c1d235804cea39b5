//! shardex-pay - HTTP 402 payment challenge protocol.
//!
//! A resource server answers an unpaid request with `402 Payment Required`
//! and a challenge ([`PaymentGate::challenge_response`]). The buyer signs the
//! challenge ([`PaymentClient::process_payment_flow`]) and retries with the
//! resulting [`AuthorizationToken`], which the gate checks with
//! [`PaymentGate::verify`].

pub mod challenge;
pub mod client;
pub mod ed25519;
pub mod error;
pub mod gate;
pub mod message;
pub mod nonce;
pub mod token;

pub use challenge::{ChallengeCodec, PaymentChallenge, parse_challenge, validate_status};
pub use client::{FlowState, PaymentClient, PaymentFlow};
pub use ed25519::{Ed25519Signer, Ed25519Verifier};
pub use error::PaymentError;
pub use gate::{IssuedChallenge, PaymentGate, VerifiedPayment};
pub use message::{NATIVE_TOKEN, PAYMENT_MESSAGE_VERSION, canonical_message, transaction_ref};
pub use nonce::NonceLedger;
pub use token::{AuthorizationToken, PaymentProof};
