//! MarketplaceEngine - listings, search and payment-gated purchase.
//!
//! Each listing sits behind its own `tokio::sync::Mutex`. Status changes
//! (`Active → Sold`, `Active → Cancelled`) happen only while that mutex is
//! held, so at most one purchase or cancellation wins per listing. The
//! listing map lock is held only to look up or insert slots.
//!
//! A verified purchase first claims the listing. Only the claim holder may
//! retrieve, settle and commit, and the claim is released when the purchase
//! fails or its future is dropped. Collaborator I/O (payload retrieval,
//! settlement) runs while claimed but outside the listing mutex.

use crate::error::MarketError;
use crate::listing::{ListOptions, SearchFilters, SearchHit};
use chrono::Utc;
use http::Response;
use indexmap::IndexMap;
use shardex_catalog::VectorCatalog;
use shardex_core::{
    EventTap, Ledger, LedgerError, Listing, ListingId, ListingStatus, MarketConfig, MarketEvent,
    Price, PurchaseRecord, RecordId, RecordMetadata, SettlementPolicy, SettlementRequest,
};
use shardex_pay::{IssuedChallenge, PaymentGate, VerifiedPayment};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

struct ListingSlot {
    listing: Mutex<Listing>,
    /// Buyer whose purchase is in flight.
    claim: parking_lot::Mutex<Option<String>>,
}

impl ListingSlot {
    fn new(listing: Listing) -> Self {
        Self {
            listing: Mutex::new(listing),
            claim: parking_lot::Mutex::new(None),
        }
    }
}

type SharedSlot = Arc<ListingSlot>;

/// Exclusive right to complete a purchase. Released on drop.
struct PurchaseClaim {
    slot: SharedSlot,
}

impl PurchaseClaim {
    async fn acquire(slot: &SharedSlot, buyer: &str) -> Result<Self, MarketError> {
        let listing = slot.listing.lock().await;
        ensure_active(&listing)?;
        let mut claim = slot.claim.lock();
        if let Some(holder) = claim.as_deref() {
            tracing::debug!(listing_id = %listing.id, holder, buyer, "listing already claimed");
            return Err(MarketError::ListingReserved {
                listing_id: listing.id,
            });
        }
        *claim = Some(buyer.to_string());
        Ok(Self { slot: slot.clone() })
    }
}

impl Drop for PurchaseClaim {
    fn drop(&mut self) {
        self.slot.claim.lock().take();
    }
}

pub struct MarketplaceEngine {
    catalog: Arc<VectorCatalog>,
    gate: Arc<PaymentGate>,
    config: MarketConfig,
    ledger: Option<Arc<dyn Ledger>>,
    listings: RwLock<IndexMap<ListingId, SharedSlot>>,
    purchases: parking_lot::Mutex<Vec<PurchaseRecord>>,
    events: EventTap,
}

impl MarketplaceEngine {
    pub fn new(catalog: Arc<VectorCatalog>, gate: Arc<PaymentGate>, config: MarketConfig) -> Self {
        Self {
            catalog,
            gate,
            config,
            ledger: None,
            listings: RwLock::new(IndexMap::new()),
            purchases: parking_lot::Mutex::new(Vec::new()),
            events: EventTap::new(),
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn Ledger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_events(mut self, events: EventTap) -> Self {
        self.events = events;
        self
    }

    pub fn catalog(&self) -> &Arc<VectorCatalog> {
        &self.catalog
    }

    pub fn gate(&self) -> &Arc<PaymentGate> {
        &self.gate
    }

    pub fn events(&self) -> &EventTap {
        &self.events
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// The resource URL a listing's payment is bound to.
    pub fn resource_url(&self, listing_id: &ListingId) -> String {
        format!(
            "{}/listings/{listing_id}",
            self.config.resource_base.trim_end_matches('/')
        )
    }

    /// Upload `vector` and offer it for sale.
    pub async fn list(
        &self,
        vector: &[f32],
        price: Price,
        seller: &str,
        options: ListOptions,
    ) -> Result<ListingId, MarketError> {
        let record = self
            .catalog
            .upload(
                vector,
                RecordMetadata {
                    owner: Some(seller.to_string()),
                    tags: options.tags,
                },
            )
            .await?;

        let id = ListingId::new();
        let listing = Listing {
            id,
            record,
            price,
            seller: seller.to_string(),
            listed_at: Utc::now(),
            status: ListingStatus::Active,
            description: options.description,
            category: options.category,
        };
        let slot = Arc::new(ListingSlot::new(listing));
        self.listings.write().await.insert(id, slot);

        tracing::info!(listing_id = %id, seller, %price, "listing created");
        self.events.emit(MarketEvent::Listed {
            listing_id: id,
            seller: seller.to_string(),
            price,
        });
        Ok(id)
    }

    /// Active listings similar to `query`, in similarity order.
    pub async fn search(
        &self,
        query: &[f32],
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, MarketError> {
        let catalog_config = self.catalog.config();
        let limit = filters
            .limit
            .unwrap_or(catalog_config.default_limit)
            .min(catalog_config.max_limit);

        // Sold and cancelled records stay ranked, so filter before truncating.
        let hits = self.catalog.rank(query, filters.min_similarity).await?;
        if hits.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let by_record: HashMap<RecordId, Listing> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|listing| filters.matches(listing))
            .map(|listing| (listing.record.id, listing))
            .collect();

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                by_record.get(&hit.record.id).map(|listing| SearchHit {
                    listing: listing.clone(),
                    similarity: hit.similarity,
                })
            })
            .take(limit)
            .collect())
    }

    pub async fn get_listing(&self, id: &ListingId) -> Option<Listing> {
        let slot = self.slot(id).await?;
        let listing = slot.listing.lock().await.clone();
        Some(listing)
    }

    /// Every listing in creation order, whatever its status.
    pub async fn list_all(&self) -> Vec<Listing> {
        self.snapshot().await
    }

    /// Completed purchases, oldest first.
    pub fn purchases(&self) -> Vec<PurchaseRecord> {
        self.purchases.lock().clone()
    }

    /// Issue a payment challenge for an active listing.
    pub async fn issue_challenge(
        &self,
        listing_id: &ListingId,
    ) -> Result<IssuedChallenge, MarketError> {
        let listing = self.active_snapshot(listing_id).await?;
        let issued = self.gate.issue(
            &self.resource_url(listing_id),
            listing.price,
            &listing.seller,
            None,
        );
        self.events.emit(MarketEvent::ChallengeIssued {
            resource: issued.resource.clone(),
            nonce: issued.challenge.nonce.clone().unwrap_or_default(),
            price: issued.challenge.price,
            pay_to: issued.challenge.pay_to.clone(),
        });
        Ok(issued)
    }

    /// The `402 Payment Required` answer to an unpaid access attempt.
    pub async fn request_access(
        &self,
        listing_id: &ListingId,
    ) -> Result<Response<()>, MarketError> {
        let issued = self.issue_challenge(listing_id).await?;
        Ok(self.gate.challenge_response(&issued)?)
    }

    /// Buy a listing with an authorization produced for its challenge.
    ///
    /// Returns the purchased vector. Every failure leaves the listing, the
    /// record owner and the purchase ledger unchanged, and nothing is
    /// submitted to the ledger unless this buyer holds the listing's claim.
    pub async fn purchase(
        &self,
        listing_id: &ListingId,
        buyer: &str,
        authorization: &str,
    ) -> Result<Vec<f32>, MarketError> {
        let slot = self
            .slot(listing_id)
            .await
            .ok_or(MarketError::ListingNotFound(*listing_id))?;
        let listing = slot.listing.lock().await.clone();
        ensure_active(&listing)?;

        let verified = self
            .gate
            .verify(authorization, buyer, &self.resource_url(listing_id))?;
        check_terms(&listing, &verified)?;

        let claim = PurchaseClaim::acquire(&slot, buyer).await?;
        let vector = self.catalog.retrieve(&listing.record.content_id).await?;
        if self.config.settlement == SettlementPolicy::BeforeAccess {
            self.settle(&listing, &verified).await?;
        }

        let record = {
            let mut current = slot.listing.lock().await;
            ensure_active(&current)?;
            let moved = self
                .catalog
                .transfer_owner(&current.record.id, Some(current.seller.as_str()), buyer)
                .await?;
            current.status = ListingStatus::Sold;
            current.record.owner = moved.owner;

            let purchase = PurchaseRecord {
                listing_id: *listing_id,
                buyer: buyer.to_string(),
                seller: current.seller.clone(),
                price: current.price,
                settled_at: Utc::now(),
                transaction_ref: verified.proof.transaction_ref.clone(),
            };
            self.purchases.lock().push(purchase.clone());
            purchase
        };
        drop(claim);

        tracing::info!(
            listing_id = %listing_id,
            buyer,
            seller = %record.seller,
            price = %record.price,
            "purchase committed"
        );
        self.events.emit(MarketEvent::PurchaseSettled {
            listing_id: *listing_id,
            buyer: record.buyer.clone(),
            seller: record.seller.clone(),
            price: record.price,
            transaction_ref: record.transaction_ref.clone(),
        });

        if self.config.settlement == SettlementPolicy::Deferred
            && let Err(err) = self.settle(&listing, &verified).await
        {
            tracing::warn!(listing_id = %listing_id, error = %err, "deferred settlement failed");
        }
        Ok(vector)
    }

    /// Withdraw an active listing. Only its seller may do this.
    pub async fn cancel(
        &self,
        listing_id: &ListingId,
        seller: &str,
    ) -> Result<Listing, MarketError> {
        let slot = self
            .slot(listing_id)
            .await
            .ok_or(MarketError::ListingNotFound(*listing_id))?;
        let mut listing = slot.listing.lock().await;
        if listing.seller != seller {
            return Err(MarketError::NotSeller {
                listing_id: *listing_id,
                caller: seller.to_string(),
            });
        }
        ensure_active(&listing)?;
        if slot.claim.lock().is_some() {
            return Err(MarketError::ListingReserved {
                listing_id: *listing_id,
            });
        }
        listing.status = ListingStatus::Cancelled;
        let cancelled = listing.clone();
        drop(listing);

        tracing::info!(listing_id = %listing_id, seller, "listing cancelled");
        self.events.emit(MarketEvent::ListingCancelled {
            listing_id: *listing_id,
            seller: seller.to_string(),
        });
        Ok(cancelled)
    }

    async fn slot(&self, id: &ListingId) -> Option<SharedSlot> {
        self.listings.read().await.get(id).cloned()
    }

    async fn snapshot(&self) -> Vec<Listing> {
        let slots: Vec<SharedSlot> = self.listings.read().await.values().cloned().collect();
        let mut listings = Vec::with_capacity(slots.len());
        for slot in slots {
            listings.push(slot.listing.lock().await.clone());
        }
        listings
    }

    async fn active_snapshot(&self, id: &ListingId) -> Result<Listing, MarketError> {
        let listing = self
            .get_listing(id)
            .await
            .ok_or(MarketError::ListingNotFound(*id))?;
        ensure_active(&listing)?;
        Ok(listing)
    }

    async fn settle(
        &self,
        listing: &Listing,
        verified: &VerifiedPayment,
    ) -> Result<(), MarketError> {
        let result = match &self.ledger {
            Some(ledger) => {
                ledger
                    .submit(SettlementRequest {
                        listing_id: listing.id,
                        buyer: verified.payer.clone(),
                        pay_to: verified.challenge.pay_to.clone(),
                        price: verified.challenge.price,
                        token: verified.challenge.token.clone(),
                        transaction_ref: verified.proof.transaction_ref.clone(),
                        signature: verified.proof.signature.clone(),
                        timestamp: verified.proof.timestamp,
                    })
                    .await
            }
            None => Err(LedgerError::Unavailable("no ledger configured".to_string())),
        };

        match result {
            Ok(receipt) => {
                tracing::debug!(
                    listing_id = %listing.id,
                    reference = %receipt.reference,
                    "settlement submitted"
                );
                self.events.emit(MarketEvent::SettlementSubmitted {
                    listing_id: listing.id,
                    reference: receipt.reference,
                });
                Ok(())
            }
            Err(err) => {
                self.events.emit(MarketEvent::SettlementFailed {
                    listing_id: listing.id,
                    error: err.to_string(),
                });
                Err(err.into())
            }
        }
    }
}

impl std::fmt::Debug for MarketplaceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceEngine")
            .field("config", &self.config)
            .field("ledger", &self.ledger.is_some())
            .finish_non_exhaustive()
    }
}

fn ensure_active(listing: &Listing) -> Result<(), MarketError> {
    if listing.is_active() {
        Ok(())
    } else {
        Err(MarketError::ListingUnavailable {
            listing_id: listing.id,
            status: listing.status,
        })
    }
}

fn check_terms(listing: &Listing, verified: &VerifiedPayment) -> Result<(), MarketError> {
    let challenge = &verified.challenge;
    let reason = if challenge.pay_to != listing.seller {
        format!(
            "paid to `{}`, listing sold by `{}`",
            challenge.pay_to, listing.seller
        )
    } else if challenge.price != listing.price {
        format!("paid {}, listing costs {}", challenge.price, listing.price)
    } else {
        return Ok(());
    };
    tracing::warn!(listing_id = %listing.id, %reason, "payment mismatch");
    Err(MarketError::PaymentMismatch {
        listing_id: listing.id,
        reason,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use shardex_catalog::MemoryContentStore;
    use shardex_core::{CatalogConfig, PaymentConfig, Signer};
    use shardex_pay::{Ed25519Signer, Ed25519Verifier, PaymentClient};

    fn engine() -> MarketplaceEngine {
        engine_with(CatalogConfig::default())
    }

    fn engine_with(catalog_config: CatalogConfig) -> MarketplaceEngine {
        let catalog = Arc::new(VectorCatalog::new(
            Arc::new(MemoryContentStore::new()),
            catalog_config,
        ));
        let gate = Arc::new(
            PaymentGate::new(&PaymentConfig::default(), Arc::new(Ed25519Verifier)).unwrap(),
        );
        MarketplaceEngine::new(catalog, gate, MarketConfig::default())
    }

    fn buyer(seed: u8) -> (PaymentClient, String) {
        let signer = Arc::new(Ed25519Signer::from_bytes(&[seed; 32]));
        let address = signer.address();
        let client = PaymentClient::new(&PaymentConfig::default())
            .unwrap()
            .with_signer(signer);
        (client, address)
    }

    async fn authorize(
        engine: &MarketplaceEngine,
        client: &PaymentClient,
        id: &ListingId,
    ) -> String {
        let response = engine.request_access(id).await.unwrap();
        client
            .process_payment_flow(&response, &engine.resource_url(id))
            .await
            .unwrap()
            .into_string()
    }

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let engine = engine();
        let id = engine
            .list(
                &[1.0, 0.0],
                price("2"),
                "seller",
                ListOptions::default().with_category("docs"),
            )
            .await
            .unwrap();
        let listing = engine.get_listing(&id).await.unwrap();
        assert_eq!(listing.status, ListingStatus::Active);
        assert_eq!(listing.record.owner.as_deref(), Some("seller"));
        assert_eq!(listing.category.as_deref(), Some("docs"));
        assert_eq!(engine.list_all().await.len(), 1);
        assert!(engine.get_listing(&ListingId::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_purchase_transfers_everything_once() {
        let engine = engine();
        let id = engine
            .list(&[0.5, 0.5], price("1.25"), "seller", ListOptions::default())
            .await
            .unwrap();
        let (client, address) = buyer(1);
        let token = authorize(&engine, &client, &id).await;

        let vector = engine.purchase(&id, &address, &token).await.unwrap();
        assert_eq!(vector, vec![0.5, 0.5]);

        let listing = engine.get_listing(&id).await.unwrap();
        assert_eq!(listing.status, ListingStatus::Sold);
        assert_eq!(listing.record.owner.as_deref(), Some(address.as_str()));
        let record = engine.catalog().record(&listing.record.id).await.unwrap();
        assert_eq!(record.owner.as_deref(), Some(address.as_str()));

        let purchases = engine.purchases();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].buyer, address);
        assert_eq!(purchases[0].price, price("1.25"));

        let err = engine.purchase(&id, &address, &token).await.unwrap_err();
        assert!(matches!(
            err,
            MarketError::ListingUnavailable {
                status: ListingStatus::Sold,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_listing() {
        let engine = engine();
        let err = engine.purchase(&ListingId::new(), "b", "X402 e30=").await.unwrap_err();
        assert_eq!(err.error_code(), "listing_not_found");
        assert!(matches!(
            engine.request_access(&ListingId::new()).await,
            Err(MarketError::ListingNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_payment_for_other_listing_is_rejected() {
        let engine = engine();
        let a = engine
            .list(&[1.0, 0.0], price("1"), "seller", ListOptions::default())
            .await
            .unwrap();
        let b = engine
            .list(&[0.0, 1.0], price("1"), "seller", ListOptions::default())
            .await
            .unwrap();
        let (client, address) = buyer(1);
        let token_for_a = authorize(&engine, &client, &a).await;

        let err = engine.purchase(&b, &address, &token_for_a).await.unwrap_err();
        assert!(matches!(
            err,
            MarketError::Payment(shardex_pay::PaymentError::UnknownProof(_))
        ));
        assert!(engine.get_listing(&b).await.unwrap().is_active());
    }

    #[tokio::test]
    async fn test_mismatched_terms_leave_listing_active() {
        let engine = engine();
        let id = engine
            .list(&[1.0, 0.0], price("5"), "seller", ListOptions::default())
            .await
            .unwrap();
        let (client, address) = buyer(1);

        // Cheaper challenge for the right resource, issued around the engine.
        let resource = engine.resource_url(&id);
        for (amount, pay_to) in [("4.99", "seller"), ("5", "someone-else")] {
            let issued = engine.gate().issue(&resource, price(amount), pay_to, None);
            let proof = client
                .sign_payment(&issued.challenge, &resource)
                .await
                .unwrap();
            let token = client.create_authorization_token(&proof).unwrap();
            let err = engine.purchase(&id, &address, token.as_str()).await.unwrap_err();
            assert!(matches!(err, MarketError::PaymentMismatch { .. }), "{err}");
        }
        assert!(engine.get_listing(&id).await.unwrap().is_active());
        assert!(engine.purchases().is_empty());
    }

    #[tokio::test]
    async fn test_cancel() {
        let engine = engine();
        let id = engine
            .list(&[1.0, 0.0], price("1"), "seller", ListOptions::default())
            .await
            .unwrap();
        let (client, address) = buyer(1);
        let token = authorize(&engine, &client, &id).await;

        assert!(matches!(
            engine.cancel(&id, "mallory").await,
            Err(MarketError::NotSeller { .. })
        ));
        let cancelled = engine.cancel(&id, "seller").await.unwrap();
        assert_eq!(cancelled.status, ListingStatus::Cancelled);
        assert!(matches!(
            engine.cancel(&id, "seller").await,
            Err(MarketError::ListingUnavailable { .. })
        ));

        let err = engine.purchase(&id, &address, &token).await.unwrap_err();
        assert!(matches!(
            err,
            MarketError::ListingUnavailable {
                status: ListingStatus::Cancelled,
                ..
            }
        ));
        assert!(
            engine
                .search(&[1.0, 0.0], &SearchFilters::default())
                .await
                .unwrap()
                .is_empty()
        );
        assert!(matches!(
            engine.request_access(&id).await,
            Err(MarketError::ListingUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_filters_and_order() {
        let engine = engine();
        let best = engine
            .list(&[1.0, 0.0], price("3"), "alice", ListOptions::default().with_category("a"))
            .await
            .unwrap();
        let good = engine
            .list(&[0.9, 0.2], price("1"), "bob", ListOptions::default().with_category("a"))
            .await
            .unwrap();
        engine
            .list(&[0.0, 1.0], price("1"), "bob", ListOptions::default())
            .await
            .unwrap();

        let all = engine
            .search(&[1.0, 0.0], &SearchFilters::default())
            .await
            .unwrap();
        let ids: Vec<_> = all.iter().map(|h| h.listing.id).collect();
        assert_eq!(ids, vec![best, good]);

        let cheap = engine
            .search(&[1.0, 0.0], &SearchFilters::default().with_max_price(price("2")))
            .await
            .unwrap();
        assert_eq!(cheap.len(), 1);
        assert_eq!(cheap[0].listing.id, good);

        let by_alice = engine
            .search(&[1.0, 0.0], &SearchFilters::default().with_seller("alice"))
            .await
            .unwrap();
        assert_eq!(by_alice.len(), 1);

        let loose = engine
            .search(
                &[1.0, 0.0],
                &SearchFilters::default().with_min_similarity(-1.0).with_limit(2),
            )
            .await
            .unwrap();
        assert_eq!(loose.len(), 2);

        assert!(matches!(
            engine.search(&[1.0], &SearchFilters::default()).await,
            Ok(hits) if hits.is_empty()
        ));
        assert!(matches!(
            engine.search(&[0.0, 0.0], &SearchFilters::default()).await,
            Err(MarketError::Vector(_))
        ));
    }

    #[tokio::test]
    async fn test_inactive_listings_do_not_hide_active_matches() {
        let engine = engine_with(CatalogConfig {
            max_limit: 3,
            ..CatalogConfig::default()
        });
        for _ in 0..3 {
            let id = engine
                .list(&[1.0, 0.0], price("1"), "seller", ListOptions::default())
                .await
                .unwrap();
            engine.cancel(&id, "seller").await.unwrap();
        }
        let active = engine
            .list(&[1.0, 0.2], price("1"), "seller", ListOptions::default())
            .await
            .unwrap();

        let hits = engine
            .search(&[1.0, 0.0], &SearchFilters::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].listing.id, active);
    }

    #[tokio::test]
    async fn test_cancel_refused_while_purchase_claimed() {
        let engine = engine();
        let id = engine
            .list(&[1.0, 0.0], price("1"), "seller", ListOptions::default())
            .await
            .unwrap();
        let slot = engine.slot(&id).await.unwrap();

        let claim = PurchaseClaim::acquire(&slot, "buyer").await.unwrap();
        assert!(matches!(
            PurchaseClaim::acquire(&slot, "other").await,
            Err(MarketError::ListingReserved { .. })
        ));
        assert!(matches!(
            engine.cancel(&id, "seller").await,
            Err(MarketError::ListingReserved { .. })
        ));

        drop(claim);
        assert!(slot.claim.lock().is_none());
        engine.cancel(&id, "seller").await.unwrap();
    }

    #[tokio::test]
    async fn test_events_follow_purchase() {
        let engine = engine();
        let mut rx = engine.events().attach(16);
        let id = engine
            .list(&[1.0], price("1"), "seller", ListOptions::default())
            .await
            .unwrap();
        let (client, address) = buyer(2);
        let token = authorize(&engine, &client, &id).await;
        engine.purchase(&id, &address, &token).await.unwrap();

        assert!(matches!(rx.recv().await, Some(MarketEvent::Listed { .. })));
        assert!(matches!(rx.recv().await, Some(MarketEvent::ChallengeIssued { .. })));
        assert!(matches!(
            rx.recv().await,
            Some(MarketEvent::PurchaseSettled { buyer, .. }) if buyer == address
        ));
    }

    #[test]
    fn test_resource_url() {
        let mut config = MarketConfig::default();
        config.resource_base = "https://shards.example/".to_string();
        let catalog = Arc::new(VectorCatalog::new(
            Arc::new(MemoryContentStore::new()),
            CatalogConfig::default(),
        ));
        let gate = Arc::new(
            PaymentGate::new(&PaymentConfig::default(), Arc::new(Ed25519Verifier)).unwrap(),
        );
        let engine = MarketplaceEngine::new(catalog, gate, config);
        let id = ListingId::new();
        assert_eq!(
            engine.resource_url(&id),
            format!("https://shards.example/listings/{id}")
        );
    }
}
