//! shardex-core - Core types and collaborator traits for the shardex marketplace
//!
//! This crate holds the vector math, the domain model shared by every other
//! crate, and the narrow traits through which the marketplace reaches its
//! external collaborators (content storage, signing wallets, settlement
//! ledgers). It performs no network I/O of its own.

pub mod config;
pub mod content;
pub mod event;
pub mod ledger;
pub mod price;
pub mod signer;
pub mod types;
pub mod vector;

pub use config::{
    CatalogConfig, Config, ConfigError, MarketConfig, PaymentConfig, SettlementPolicy,
    StorageConfig,
};
pub use content::{ContentStore, ContentStoreError};
pub use event::{EventTap, MarketEvent};
pub use ledger::{Ledger, LedgerError, SettlementReceipt, SettlementRequest};
pub use price::{Price, PriceError};
pub use signer::{SignatureVerifier, Signer, SignerError};
pub use types::{
    ContentId, Listing, ListingId, ListingStatus, PurchaseRecord, RecordId, RecordMetadata,
    VectorRecord,
};
pub use vector::VectorError;

/// Current unix time in whole seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
