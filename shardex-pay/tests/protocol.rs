#![allow(clippy::unwrap_used, clippy::expect_used)]

use futures::future::join_all;
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use shardex_core::{PaymentConfig, Signer};
use shardex_pay::{
    AuthorizationToken, Ed25519Signer, Ed25519Verifier, PaymentClient, PaymentError, PaymentGate,
    parse_challenge,
};
use std::sync::Arc;

const RESOURCE: &str = "https://shards.test/listings/7";

fn client(seed: u8) -> (Arc<PaymentClient>, String) {
    let signer = Arc::new(Ed25519Signer::from_bytes(&[seed; 32]));
    let address = signer.address();
    let client = PaymentClient::new(&PaymentConfig::default())
        .unwrap()
        .with_signer(signer);
    (Arc::new(client), address)
}

#[tokio::test]
async fn flat_headers_only_server_round_trip() {
    // A server that only speaks the flat header encoding.
    let mut headers = HeaderMap::new();
    headers.insert("x-payment-price", HeaderValue::from_static("0.010"));
    headers.insert("x-payment-wallet", HeaderValue::from_static("0xseller"));
    headers.insert("x-payment-nonce", HeaderValue::from_static("flat-1"));
    let challenge = parse_challenge(&headers).unwrap().unwrap();
    assert_eq!(challenge.price.to_string(), "0.01");

    let mut response = Response::new(());
    *response.status_mut() = StatusCode::PAYMENT_REQUIRED;
    *response.headers_mut() = headers;

    let (client, _) = client(1);
    let token = client.process_payment_flow(&response, RESOURCE).await.unwrap();
    let proof = AuthorizationToken::decode("X402", token.as_str()).unwrap();
    assert_eq!(proof.transaction_ref.len(), 66);

    // Same nonce again from the same wallet.
    assert_eq!(
        client.process_payment_flow(&response, RESOURCE).await,
        Err(PaymentError::ReplayedNonce("flat-1".to_string()))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_signing_of_one_nonce_succeeds_once() {
    let gate = PaymentGate::new(&PaymentConfig::default(), Arc::new(Ed25519Verifier)).unwrap();
    let issued = gate.issue(RESOURCE, "1".parse().unwrap(), "0xseller", None);
    let (client, _) = client(2);

    let attempts = (0..8).map(|_| {
        let client = client.clone();
        let challenge = issued.challenge.clone();
        tokio::spawn(async move { client.sign_payment(&challenge, RESOURCE).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, PaymentError::ReplayedNonce(_)))
    );
}

#[tokio::test]
async fn gate_issued_challenge_verifies_for_signer() {
    let gate = PaymentGate::new(&PaymentConfig::default(), Arc::new(Ed25519Verifier)).unwrap();
    let issued = gate.issue(RESOURCE, "3.5".parse().unwrap(), "0xseller", Some("usdc".to_string()));
    let response = gate.challenge_response(&issued).unwrap();

    let (client, payer) = client(3);
    let token = client.process_payment_flow(&response, RESOURCE).await.unwrap();
    let verified = gate.verify(token.as_str(), &payer, RESOURCE).unwrap();
    assert_eq!(verified.challenge.token.as_deref(), Some("usdc"));
    assert_eq!(verified.challenge.price, "3.5".parse().unwrap());

    let err = gate.verify(token.as_str(), &payer, RESOURCE).unwrap_err();
    assert_eq!(err.error_code(), "replayed_nonce");
}
