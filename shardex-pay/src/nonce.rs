//! Consumed-nonce retention for replay protection.

use crate::error::PaymentError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Per-identity record of nonces that went into signed proofs.
///
/// A nonce is remembered until the later of its challenge expiry and
/// `now + retention`; entries past that point are pruned lazily.
#[derive(Debug)]
pub struct NonceLedger {
    retention: Duration,
    consumed: Mutex<HashMap<String, HashMap<String, u64>>>,
}

impl NonceLedger {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            consumed: Mutex::new(HashMap::new()),
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Claim `nonce` for `identity`, failing if it is still retained.
    pub fn reserve(
        &self,
        identity: &str,
        nonce: &str,
        expiry: Option<u64>,
        now: u64,
    ) -> Result<(), PaymentError> {
        let retain_until = now
            .saturating_add(self.retention.as_secs())
            .max(expiry.unwrap_or(0));
        let mut consumed = self.consumed.lock();
        prune_locked(&mut consumed, now);
        let nonces = consumed.entry(identity.to_string()).or_default();
        if nonces.contains_key(nonce) {
            return Err(PaymentError::ReplayedNonce(nonce.to_string()));
        }
        nonces.insert(nonce.to_string(), retain_until);
        Ok(())
    }

    /// Forget a reservation whose signing never completed.
    pub fn release(&self, identity: &str, nonce: &str) {
        let mut consumed = self.consumed.lock();
        if let Some(nonces) = consumed.get_mut(identity) {
            nonces.remove(nonce);
            if nonces.is_empty() {
                consumed.remove(identity);
            }
        }
    }

    pub fn is_consumed(&self, identity: &str, nonce: &str, now: u64) -> bool {
        self.consumed
            .lock()
            .get(identity)
            .and_then(|nonces| nonces.get(nonce))
            .is_some_and(|retain_until| *retain_until >= now)
    }

    /// Drop entries whose retention has lapsed.
    pub fn prune(&self, now: u64) {
        prune_locked(&mut self.consumed.lock(), now);
    }

    /// Number of retained nonces across all identities.
    pub fn len(&self) -> usize {
        self.consumed.lock().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn prune_locked(consumed: &mut HashMap<String, HashMap<String, u64>>, now: u64) {
    consumed.retain(|_, nonces| {
        nonces.retain(|_, retain_until| *retain_until >= now);
        !nonces.is_empty()
    });
}
