#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use shardex_catalog::{MemoryContentStore, VectorCatalog};
use shardex_core::{
    CatalogConfig, Ledger, LedgerError, ListingId, ListingStatus, MarketConfig, MarketEvent,
    PaymentConfig, SettlementPolicy, SettlementReceipt, SettlementRequest, Signer,
};
use shardex_market::{ListOptions, MarketError, MarketplaceEngine};
use shardex_pay::{Ed25519Signer, Ed25519Verifier, PaymentClient, PaymentError, PaymentGate};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

#[derive(Default)]
struct RecordingLedger {
    fail: bool,
    submitted: Mutex<Vec<SettlementRequest>>,
}

#[async_trait]
impl Ledger for RecordingLedger {
    async fn submit(&self, request: SettlementRequest) -> Result<SettlementReceipt, LedgerError> {
        if self.fail {
            return Err(LedgerError::Rejected("insufficient funds".to_string()));
        }
        let reference = format!("ledger-{}", self.submitted.lock().len());
        self.submitted.lock().push(request);
        Ok(SettlementReceipt { reference })
    }
}

/// Hangs on the first submission until the caller gives up.
#[derive(Default)]
struct StallingLedger {
    calls: AtomicUsize,
    entered: Notify,
}

#[async_trait]
impl Ledger for StallingLedger {
    async fn submit(&self, request: SettlementRequest) -> Result<SettlementReceipt, LedgerError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.entered.notify_one();
            std::future::pending::<()>().await;
        }
        Ok(SettlementReceipt {
            reference: request.transaction_ref,
        })
    }
}

fn engine(settlement: SettlementPolicy) -> MarketplaceEngine {
    let catalog = Arc::new(VectorCatalog::new(
        Arc::new(MemoryContentStore::new()),
        CatalogConfig::default(),
    ));
    let gate =
        Arc::new(PaymentGate::new(&PaymentConfig::default(), Arc::new(Ed25519Verifier)).unwrap());
    MarketplaceEngine::new(
        catalog,
        gate,
        MarketConfig {
            settlement,
            ..MarketConfig::default()
        },
    )
}

fn buyer(seed: u8) -> (PaymentClient, String) {
    let signer = Arc::new(Ed25519Signer::from_bytes(&[seed; 32]));
    let address = signer.address();
    let client = PaymentClient::new(&PaymentConfig::default())
        .unwrap()
        .with_signer(signer);
    (client, address)
}

async fn authorize(engine: &MarketplaceEngine, client: &PaymentClient, id: &ListingId) -> String {
    let response = engine.request_access(id).await.unwrap();
    client
        .process_payment_flow(&response, &engine.resource_url(id))
        .await
        .unwrap()
        .into_string()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_purchases_have_exactly_one_winner() {
    const BUYERS: u8 = 16;
    let engine = Arc::new(engine(SettlementPolicy::Disabled));
    let id = engine
        .list(&[0.3, 0.4, 0.5], "10".parse().unwrap(), "seller", ListOptions::default())
        .await
        .unwrap();

    // Every buyer holds a valid authorization before anyone buys.
    let mut attempts = Vec::new();
    for seed in 1..=BUYERS {
        let (client, address) = buyer(seed);
        let token = authorize(&engine, &client, &id).await;
        attempts.push((address, token));
    }

    let tasks = attempts.into_iter().map(|(address, token)| {
        let engine = engine.clone();
        tokio::spawn(async move { engine.purchase(&id, &address, &token).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(
            matches!(
                result,
                Err(MarketError::ListingUnavailable {
                    status: ListingStatus::Sold,
                    ..
                }) | Err(MarketError::ListingReserved { .. })
            ),
            "unexpected {result:?}"
        );
    }

    let purchases = engine.purchases();
    assert_eq!(purchases.len(), 1);
    let listing = engine.get_listing(&id).await.unwrap();
    assert_eq!(listing.status, ListingStatus::Sold);
    assert_eq!(listing.record.owner.as_deref(), Some(purchases[0].buyer.as_str()));
}

#[tokio::test]
async fn replayed_authorization_is_rejected() {
    let engine = engine(SettlementPolicy::Disabled);
    let id = engine
        .list(&[1.0, 2.0], "1".parse().unwrap(), "seller", ListOptions::default())
        .await
        .unwrap();
    let (client, address) = buyer(1);
    let token = authorize(&engine, &client, &id).await;

    // Consume the challenge directly, then try to buy with the same token.
    engine
        .gate()
        .verify(&token, &address, &engine.resource_url(&id))
        .unwrap();
    let err = engine.purchase(&id, &address, &token).await.unwrap_err();
    assert!(matches!(
        err,
        MarketError::Payment(PaymentError::ReplayedNonce(_))
    ));
    assert!(engine.get_listing(&id).await.unwrap().is_active());
}

#[tokio::test]
async fn token_from_another_buyer_is_rejected() {
    let engine = engine(SettlementPolicy::Disabled);
    let id = engine
        .list(&[1.0, 2.0], "1".parse().unwrap(), "seller", ListOptions::default())
        .await
        .unwrap();
    let (client, _) = buyer(1);
    let (_, thief) = buyer(2);
    let token = authorize(&engine, &client, &id).await;

    let err = engine.purchase(&id, &thief, &token).await.unwrap_err();
    assert_eq!(err.error_code(), "payment_invalid");
    assert!(engine.purchases().is_empty());
}

#[tokio::test]
async fn before_access_settlement_failure_aborts_purchase() {
    let ledger = Arc::new(RecordingLedger {
        fail: true,
        ..RecordingLedger::default()
    });
    let engine = engine(SettlementPolicy::BeforeAccess).with_ledger(ledger);
    let mut events = engine.events().attach(16);
    let id = engine
        .list(&[1.0, 2.0], "1".parse().unwrap(), "seller", ListOptions::default())
        .await
        .unwrap();
    let (client, address) = buyer(1);
    let token = authorize(&engine, &client, &id).await;

    let err = engine.purchase(&id, &address, &token).await.unwrap_err();
    assert!(matches!(err, MarketError::Settlement(LedgerError::Rejected(_))));
    let listing = engine.get_listing(&id).await.unwrap();
    assert!(listing.is_active());
    assert_eq!(listing.record.owner.as_deref(), Some("seller"));
    assert!(engine.purchases().is_empty());

    let mut saw_failure = false;
    while let Ok(event) = events.try_recv() {
        saw_failure |= matches!(event, MarketEvent::SettlementFailed { .. });
        assert!(!matches!(event, MarketEvent::PurchaseSettled { .. }));
    }
    assert!(saw_failure);
}

#[tokio::test]
async fn before_access_settlement_submits_proof() {
    let ledger = Arc::new(RecordingLedger::default());
    let engine = engine(SettlementPolicy::BeforeAccess).with_ledger(ledger.clone());
    let id = engine
        .list(&[1.0, 2.0], "0.75".parse().unwrap(), "seller", ListOptions::default())
        .await
        .unwrap();
    let (client, address) = buyer(1);
    let token = authorize(&engine, &client, &id).await;

    engine.purchase(&id, &address, &token).await.unwrap();
    let submitted = ledger.submitted.lock();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].buyer, address);
    assert_eq!(submitted[0].pay_to, "seller");
    assert_eq!(submitted[0].price, "0.75".parse().unwrap());
    assert_eq!(
        submitted[0].transaction_ref,
        engine.purchases()[0].transaction_ref
    );
}

#[tokio::test]
async fn deferred_settlement_failure_keeps_purchase() {
    let ledger = Arc::new(RecordingLedger {
        fail: true,
        ..RecordingLedger::default()
    });
    let engine = engine(SettlementPolicy::Deferred).with_ledger(ledger);
    let id = engine
        .list(&[1.0, 2.0], "1".parse().unwrap(), "seller", ListOptions::default())
        .await
        .unwrap();
    let (client, address) = buyer(1);
    let token = authorize(&engine, &client, &id).await;

    let vector = engine.purchase(&id, &address, &token).await.unwrap();
    assert_eq!(vector, vec![1.0, 2.0]);
    assert_eq!(engine.purchases().len(), 1);
    assert_eq!(
        engine.get_listing(&id).await.unwrap().status,
        ListingStatus::Sold
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn purchase_racing_cancel_has_one_outcome() {
    for round in 0..8u8 {
        let engine = Arc::new(engine(SettlementPolicy::Disabled));
        let id = engine
            .list(&[1.0, 0.0], "1".parse().unwrap(), "seller", ListOptions::default())
            .await
            .unwrap();
        let (client, address) = buyer(round + 1);
        let token = authorize(&engine, &client, &id).await;

        let buy = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.purchase(&id, &address, &token).await })
        };
        let cancel = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.cancel(&id, "seller").await })
        };
        let bought = buy.await.unwrap().is_ok();
        let cancelled = cancel.await.unwrap().is_ok();
        assert!(bought ^ cancelled, "round {round}: bought={bought} cancelled={cancelled}");

        let status = engine.get_listing(&id).await.unwrap().status;
        if bought {
            assert_eq!(status, ListingStatus::Sold);
            assert_eq!(engine.purchases().len(), 1);
        } else {
            assert_eq!(status, ListingStatus::Cancelled);
            assert!(engine.purchases().is_empty());
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn only_the_winner_is_settled_before_access() {
    const BUYERS: u8 = 8;
    let ledger = Arc::new(RecordingLedger::default());
    let engine = Arc::new(engine(SettlementPolicy::BeforeAccess).with_ledger(ledger.clone()));
    let id = engine
        .list(&[0.6, 0.8], "3".parse().unwrap(), "seller", ListOptions::default())
        .await
        .unwrap();

    let mut attempts = Vec::new();
    for seed in 1..=BUYERS {
        let (client, address) = buyer(seed);
        let token = authorize(&engine, &client, &id).await;
        attempts.push((address, token));
    }
    let tasks = attempts.into_iter().map(|(address, token)| {
        let engine = engine.clone();
        tokio::spawn(async move { engine.purchase(&id, &address, &token).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.error_code() == "listing_unavailable")
    );
    let submitted = ledger.submitted.lock();
    assert_eq!(submitted.len(), winners);
    assert_eq!(submitted[0].buyer, engine.purchases()[0].buyer);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_purchase_releases_the_listing() {
    let ledger = Arc::new(StallingLedger::default());
    let engine = Arc::new(engine(SettlementPolicy::BeforeAccess).with_ledger(ledger.clone()));
    let id = engine
        .list(&[1.0, 0.0], "1".parse().unwrap(), "seller", ListOptions::default())
        .await
        .unwrap();
    let (first, first_address) = buyer(1);
    let first_token = authorize(&engine, &first, &id).await;
    let (second, second_address) = buyer(2);
    let second_token = authorize(&engine, &second, &id).await;

    let stalled = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.purchase(&id, &first_address, &first_token).await })
    };
    ledger.entered.notified().await;

    // Held by the stalled purchase.
    assert!(matches!(
        engine.cancel(&id, "seller").await,
        Err(MarketError::ListingReserved { .. })
    ));

    stalled.abort();
    assert!(stalled.await.unwrap_err().is_cancelled());
    assert!(engine.get_listing(&id).await.unwrap().is_active());

    let vector = engine
        .purchase(&id, &second_address, &second_token)
        .await
        .unwrap();
    assert_eq!(vector, vec![1.0, 0.0]);
    assert_eq!(engine.purchases().len(), 1);
    assert_eq!(engine.purchases()[0].buyer, second_address);
}
