//! Marketplace audit events.
//!
//! Events are delivered through an [`EventTap`]: a bounded channel that never
//! blocks the emitting operation. When the consumer falls behind, events are
//! dropped and a `StreamTruncated` marker is delivered ahead of the next event
//! that fits.

use crate::price::Price;
use crate::types::{ContentId, ListingId, RecordId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    VectorUploaded {
        record_id: RecordId,
        content_id: ContentId,
        dimension: usize,
        encrypted: bool,
    },
    OwnershipTransferred {
        record_id: RecordId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        to: String,
    },
    Listed {
        listing_id: ListingId,
        seller: String,
        price: Price,
    },
    ListingCancelled {
        listing_id: ListingId,
        seller: String,
    },
    ChallengeIssued {
        resource: String,
        nonce: String,
        price: Price,
        pay_to: String,
    },
    PurchaseSettled {
        listing_id: ListingId,
        buyer: String,
        seller: String,
        price: Price,
        transaction_ref: String,
    },
    SettlementSubmitted {
        listing_id: ListingId,
        reference: String,
    },
    SettlementFailed {
        listing_id: ListingId,
        error: String,
    },
    StreamTruncated {
        reason: String,
    },
}

pub struct EventTapState {
    pub tx: mpsc::Sender<MarketEvent>,
    pub truncated: AtomicBool,
}

/// Shared, optionally-attached event sink.
#[derive(Clone, Default)]
pub struct EventTap {
    inner: Arc<Mutex<Option<EventTapState>>>,
}

impl EventTap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a fresh channel of `capacity` and return its receiver.
    ///
    /// Replaces any previously attached channel.
    pub fn attach(&self, capacity: usize) -> mpsc::Receiver<MarketEvent> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        *self.inner.lock() = Some(EventTapState {
            tx,
            truncated: AtomicBool::new(false),
        });
        rx
    }

    pub fn detach(&self) {
        self.inner.lock().take();
    }

    pub fn is_attached(&self) -> bool {
        self.inner.lock().is_some()
    }

    /// Send without waiting. Never fails the caller.
    ///
    /// After events were dropped, a `StreamTruncated` marker is delivered
    /// ahead of the next event that fits.
    pub fn emit(&self, event: MarketEvent) {
        let guard = self.inner.lock();
        let Some(state) = guard.as_ref() else {
            return;
        };
        if state.truncated.load(Ordering::SeqCst) {
            let marker = MarketEvent::StreamTruncated {
                reason: "event tap channel was full; events were dropped".to_string(),
            };
            match state.tx.try_send(marker) {
                Ok(()) => state.truncated.store(false, Ordering::SeqCst),
                // Still full (or gone): this event is dropped as well.
                Err(_) => return,
            }
        }
        match state.tx.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => {
                if !state.truncated.swap(true, Ordering::SeqCst) {
                    tracing::warn!("market event tap is full; dropping events");
                }
            }
        }
    }
}

impl std::fmt::Debug for EventTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventTap")
            .field("attached", &self.is_attached())
            .finish()
    }
}
