//! Resource-server side: issue challenges and check the proofs that come back.

use crate::challenge::{ChallengeCodec, PaymentChallenge};
use crate::error::PaymentError;
use crate::message::{canonical_message, transaction_ref};
use crate::token::{AuthorizationToken, PaymentProof};
use http::{Response, StatusCode};
use parking_lot::Mutex;
use shardex_core::{PaymentConfig, Price, SignatureVerifier, unix_now};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A challenge the gate is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedChallenge {
    pub resource: String,
    pub challenge: PaymentChallenge,
}

/// A proof that matched an outstanding challenge and carried a valid signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    pub resource: String,
    pub payer: String,
    pub challenge: PaymentChallenge,
    pub proof: PaymentProof,
}

#[derive(Debug)]
struct Pending {
    challenge: PaymentChallenge,
    consumed: bool,
    retain_until: u64,
}

/// Issues nonce-bearing challenges per resource and accepts each one once.
pub struct PaymentGate {
    codec: ChallengeCodec,
    ttl: Duration,
    retention: Duration,
    max_pending: usize,
    verifier: Arc<dyn SignatureVerifier>,
    pending: Mutex<HashMap<String, Vec<Pending>>>,
}

impl PaymentGate {
    pub fn new(
        config: &PaymentConfig,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Result<Self, PaymentError> {
        Ok(Self {
            codec: ChallengeCodec::from_config(config)?,
            ttl: config.challenge_ttl(),
            retention: config.nonce_retention(),
            max_pending: config.max_pending_per_resource.max(1),
            verifier,
            pending: Mutex::new(HashMap::new()),
        })
    }

    pub fn codec(&self) -> &ChallengeCodec {
        &self.codec
    }

    pub fn issue(
        &self,
        resource: &str,
        price: Price,
        pay_to: &str,
        token: Option<String>,
    ) -> IssuedChallenge {
        self.issue_at(resource, price, pay_to, token, unix_now())
    }

    #[doc(hidden)]
    pub fn issue_at(
        &self,
        resource: &str,
        price: Price,
        pay_to: &str,
        token: Option<String>,
        now: u64,
    ) -> IssuedChallenge {
        let expiry = now.saturating_add(self.ttl.as_secs());
        let mut challenge = PaymentChallenge::new(price, pay_to)
            .with_nonce(uuid::Uuid::new_v4().simple().to_string())
            .with_expiry(expiry);
        challenge.token = token;

        let mut pending = self.pending.lock();
        prune_locked(&mut pending, now);
        let entries = pending.entry(resource.to_string()).or_default();
        let open = entries.iter().filter(|p| !p.consumed).count();
        if open >= self.max_pending
            && let Some(oldest) = entries.iter().position(|p| !p.consumed)
        {
            let evicted = entries.remove(oldest);
            tracing::debug!(
                resource,
                nonce = evicted.challenge.nonce.as_deref().unwrap_or_default(),
                "evicted oldest unpaid challenge"
            );
        }
        entries.push(Pending {
                challenge: challenge.clone(),
                consumed: false,
                retain_until: expiry.saturating_add(self.retention.as_secs()),
            });
        tracing::debug!(resource, %price, pay_to, expiry, "payment challenge issued");

        IssuedChallenge {
            resource: resource.to_string(),
            challenge,
        }
    }

    /// A bodiless 402 carrying both challenge encodings.
    pub fn challenge_response(
        &self,
        issued: &IssuedChallenge,
    ) -> Result<Response<()>, PaymentError> {
        let mut response = Response::new(());
        *response.status_mut() = StatusCode::PAYMENT_REQUIRED;
        self.codec.render(&issued.challenge, response.headers_mut())?;
        Ok(response)
    }

    pub fn verify(
        &self,
        authorization: &str,
        payer: &str,
        resource: &str,
    ) -> Result<VerifiedPayment, PaymentError> {
        self.verify_at(authorization, payer, resource, unix_now())
    }

    /// Match `authorization` against the challenges issued for `resource`,
    /// then consume the matched challenge.
    ///
    /// The proof only carries `(tx, sig, ts)`; the matching challenge is the
    /// one whose canonical message hashes to `tx` together with `sig`.
    #[doc(hidden)]
    pub fn verify_at(
        &self,
        authorization: &str,
        payer: &str,
        resource: &str,
        now: u64,
    ) -> Result<VerifiedPayment, PaymentError> {
        let proof = AuthorizationToken::decode(self.codec.scheme(), authorization)?;

        let mut pending = self.pending.lock();
        prune_locked(&mut pending, now);
        let entries = pending
            .get_mut(resource)
            .ok_or_else(|| PaymentError::UnknownProof(resource.to_string()))?;

        let mut matched = None;
        for (idx, entry) in entries.iter().enumerate() {
            let Some(nonce) = entry.challenge.nonce.as_deref() else {
                continue;
            };
            let message =
                canonical_message(&entry.challenge, resource, payer, nonce, proof.timestamp)?;
            if transaction_ref(&message, &proof.signature) == proof.transaction_ref {
                matched = Some((idx, message));
                break;
            }
        }
        let Some((idx, message)) = matched else {
            tracing::warn!(resource, payer, "authorization matches no outstanding challenge");
            return Err(PaymentError::UnknownProof(resource.to_string()));
        };

        let entry = &mut entries[idx];
        if entry.consumed {
            let nonce = entry.challenge.nonce.clone().unwrap_or_default();
            tracing::warn!(resource, payer, nonce = %nonce, "replayed payment proof");
            return Err(PaymentError::ReplayedNonce(nonce));
        }
        if let Some(expiry) = entry.challenge.expiry {
            if entry.challenge.is_expired_at(now) {
                return Err(PaymentError::ExpiredChallenge { expiry, now });
            }
            if entry.challenge.is_expired_at(proof.timestamp) {
                return Err(PaymentError::ExpiredChallenge {
                    expiry,
                    now: proof.timestamp,
                });
            }
        }
        self.verifier
            .verify(payer, &message, &proof.signature)
            .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;

        entry.consumed = true;
        entry.retain_until = entry
            .retain_until
            .max(now.saturating_add(self.retention.as_secs()));
        tracing::info!(
            resource,
            payer,
            transaction_ref = %proof.transaction_ref,
            "payment verified"
        );

        Ok(VerifiedPayment {
            resource: resource.to_string(),
            payer: payer.to_string(),
            challenge: entry.challenge.clone(),
            proof,
        })
    }

    /// Drop challenges whose retention window has lapsed.
    pub fn prune(&self, now: u64) {
        prune_locked(&mut self.pending.lock(), now);
    }

    /// Outstanding, unconsumed challenges that have not expired at `now`.
    pub fn pending_count(&self, now: u64) -> usize {
        self.pending
            .lock()
            .values()
            .flatten()
            .filter(|p| !p.consumed && !p.challenge.is_expired_at(now))
            .count()
    }
}

impl std::fmt::Debug for PaymentGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentGate")
            .field("scheme", &self.codec.scheme())
            .field("ttl", &self.ttl)
            .field("retention", &self.retention)
            .field("max_pending", &self.max_pending)
            .finish_non_exhaustive()
    }
}

fn prune_locked(pending: &mut HashMap<String, Vec<Pending>>, now: u64) {
    pending.retain(|_, entries| {
        entries.retain(|p| p.retain_until >= now);
        !entries.is_empty()
    });
}
