//! Ledger trait: optional on-chain settlement of payment proofs.

use crate::price::Price;
use crate::types::ListingId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a proof is paying for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub listing_id: ListingId,
    pub buyer: String,
    pub pay_to: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub transaction_ref: String,
    pub signature: String,
    pub timestamp: u64,
}

/// Acknowledgement from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    /// Ledger-side reference (e.g. a transaction hash).
    pub reference: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger rejected settlement: {0}")]
    Rejected(String),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Broadcast layer for settling payments.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn submit(&self, request: SettlementRequest) -> Result<SettlementReceipt, LedgerError>;
}
