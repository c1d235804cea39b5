//! Buyer side of the protocol: challenge → signed proof → authorization token.

use crate::challenge::{ChallengeCodec, PaymentChallenge, validate_status};
use crate::error::PaymentError;
use crate::message::{canonical_message, effective_nonce, transaction_ref};
use crate::nonce::NonceLedger;
use crate::token::{AuthorizationToken, PaymentProof};
use http::{HeaderMap, Response};
use shardex_core::{PaymentConfig, Signer};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Where a single payment attempt stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    ChallengeReceived(PaymentChallenge),
    Signed(PaymentProof),
    Authorized(AuthorizationToken),
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::ChallengeReceived(_) => "challenge_received",
            FlowState::Signed(_) => "signed",
            FlowState::Authorized(_) => "authorized",
        }
    }
}

/// One pass through `Idle → ChallengeReceived → Signed → Authorized`.
pub struct PaymentFlow<'a> {
    client: &'a PaymentClient,
    url: String,
    challenge: Option<PaymentChallenge>,
    state: FlowState,
}

impl<'a> PaymentFlow<'a> {
    pub fn new(client: &'a PaymentClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            challenge: None,
            state: FlowState::Idle,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    fn expect_state(&self, expected: &'static str, to: &'static str) -> Result<(), PaymentError> {
        if self.state.name() == expected {
            Ok(())
        } else {
            Err(PaymentError::InvalidTransition {
                from: self.state.name(),
                to,
            })
        }
    }

    /// Accept a 402 response and extract its challenge.
    pub fn receive<B>(&mut self, response: &Response<B>) -> Result<PaymentChallenge, PaymentError> {
        self.expect_state("idle", "challenge_received")?;
        validate_status(response.status())?;
        let challenge = self
            .client
            .parse_challenge(response.headers())?
            .ok_or(PaymentError::MissingChallenge)?;
        tracing::debug!(
            url = %self.url,
            price = %challenge.price,
            pay_to = %challenge.pay_to,
            "payment challenge received"
        );
        self.challenge = Some(challenge.clone());
        self.state = FlowState::ChallengeReceived(challenge.clone());
        Ok(challenge)
    }

    pub async fn sign(&mut self) -> Result<PaymentProof, PaymentError> {
        self.expect_state("challenge_received", "signed")?;
        let Some(challenge) = self.challenge.as_ref() else {
            return Err(PaymentError::MissingChallenge);
        };
        let proof = self.client.sign_payment(challenge, &self.url).await?;
        self.state = FlowState::Signed(proof.clone());
        Ok(proof)
    }

    pub fn authorize(&mut self) -> Result<AuthorizationToken, PaymentError> {
        self.expect_state("signed", "authorized")?;
        let FlowState::Signed(proof) = &self.state else {
            return Err(PaymentError::InvalidTransition {
                from: self.state.name(),
                to: "authorized",
            });
        };
        let token = self.client.create_authorization_token(proof)?;
        self.state = FlowState::Authorized(token.clone());
        Ok(token)
    }
}

/// Signs payment challenges on behalf of one wallet.
pub struct PaymentClient {
    signer: Option<Arc<dyn Signer>>,
    codec: ChallengeCodec,
    nonces: NonceLedger,
}

impl PaymentClient {
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        Ok(Self {
            signer: None,
            codec: ChallengeCodec::from_config(config)?,
            nonces: NonceLedger::new(config.nonce_retention()),
        })
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn signer_address(&self) -> Option<String> {
        self.signer.as_ref().map(|s| s.address())
    }

    pub fn codec(&self) -> &ChallengeCodec {
        &self.codec
    }

    pub fn nonces(&self) -> &NonceLedger {
        &self.nonces
    }

    pub fn validate_status<B>(&self, response: &Response<B>) -> Result<(), PaymentError> {
        validate_status(response.status())
    }

    pub fn parse_challenge(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<PaymentChallenge>, PaymentError> {
        self.codec.parse(headers)
    }

    /// Sign `challenge` for a request to `url`.
    pub async fn sign_payment(
        &self,
        challenge: &PaymentChallenge,
        url: &str,
    ) -> Result<PaymentProof, PaymentError> {
        let now_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.sign_payment_at(challenge, url, now_millis).await
    }

    /// Sign like [`PaymentClient::sign_payment`], with an explicit clock.
    #[doc(hidden)]
    pub async fn sign_payment_at(
        &self,
        challenge: &PaymentChallenge,
        url: &str,
        now_millis: u64,
    ) -> Result<PaymentProof, PaymentError> {
        let signer = self.signer.as_ref().ok_or(PaymentError::MissingSigner)?;
        let now = now_millis / 1000;
        if let Some(expiry) = challenge.expiry
            && challenge.is_expired_at(now)
        {
            return Err(PaymentError::ExpiredChallenge { expiry, now });
        }

        let payer = signer.address();
        let nonce = effective_nonce(challenge, now_millis);
        let message = canonical_message(challenge, url, &payer, &nonce, now)?;

        // Reserve before the signer call so concurrent signs of one nonce race here.
        self.nonces.reserve(&payer, &nonce, challenge.expiry, now)?;
        let signature = match signer.sign_message(&message).await {
            Ok(signature) => signature,
            Err(err) => {
                self.nonces.release(&payer, &nonce);
                return Err(err.into());
            }
        };

        let proof = PaymentProof {
            transaction_ref: transaction_ref(&message, &signature),
            signature,
            timestamp: now,
        };
        tracing::info!(
            url,
            payer = %payer,
            transaction_ref = %proof.transaction_ref,
            "payment proof signed"
        );
        Ok(proof)
    }

    pub fn create_authorization_token(
        &self,
        proof: &PaymentProof,
    ) -> Result<AuthorizationToken, PaymentError> {
        AuthorizationToken::encode(self.codec.scheme(), proof)
    }

    /// Turn a 402 response into an authorization token for retrying `url`.
    ///
    /// Performs no retry of its own.
    pub async fn process_payment_flow<B>(
        &self,
        response: &Response<B>,
        url: &str,
    ) -> Result<AuthorizationToken, PaymentError> {
        let mut flow = PaymentFlow::new(self, url);
        flow.receive(response)?;
        flow.sign().await?;
        flow.authorize()
    }
}
