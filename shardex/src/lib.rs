//! shardex - Payment-gated marketplace for vector memory shards
//!
//! # Quick Start
//!
//! ```text
//! use shardex::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let factory = MarketFactory::load().await?;
//!     let engine = factory.build_engine().await?;
//!
//!     let id = engine
//!         .list(&[0.1, 0.7, 0.2], "0.5".parse()?, "seller-wallet", ListOptions::default())
//!         .await?;
//!
//!     // Buyer: answer the 402 challenge and retry with the token.
//!     let signer = Arc::new(Ed25519Signer::generate());
//!     let buyer = signer.address();
//!     let client = factory.payment_client(signer)?;
//!     let response = engine.request_access(&id).await?;
//!     let token = client
//!         .process_payment_flow(&response, &engine.resource_url(&id))
//!         .await?;
//!     let vector = engine.purchase(&id, &buyer, token.as_str()).await?;
//!     println!("{vector:?}");
//!     Ok(())
//! }
//! ```

pub mod factory;

pub use factory::{FactoryError, MarketFactory};

// Core types
pub use shardex_core::{
    // Config
    CatalogConfig,
    Config,
    ConfigError,
    // Collaborators
    ContentId,
    ContentStore,
    ContentStoreError,
    // Events
    EventTap,
    Ledger,
    LedgerError,
    Listing,
    ListingId,
    ListingStatus,
    MarketConfig,
    MarketEvent,
    PaymentConfig,
    Price,
    PriceError,
    PurchaseRecord,
    RecordId,
    RecordMetadata,
    SettlementPolicy,
    SettlementReceipt,
    SettlementRequest,
    SignatureVerifier,
    Signer,
    SignerError,
    StorageConfig,
    VectorError,
    VectorRecord,
};
pub use shardex_core::vector;

pub use shardex_catalog::{
    CatalogError, FsContentStore, MemoryContentStore, SimilarityHit, VectorCatalog,
};
pub use shardex_market::{ListOptions, MarketError, MarketplaceEngine, SearchFilters, SearchHit};
pub use shardex_pay::{
    AuthorizationToken, Ed25519Signer, Ed25519Verifier, FlowState, IssuedChallenge,
    PaymentChallenge, PaymentClient, PaymentError, PaymentFlow, PaymentGate, PaymentProof,
    VerifiedPayment,
};

pub mod prelude {
    pub use super::{
        Config, Ed25519Signer, ListOptions, MarketError, MarketFactory, MarketplaceEngine,
        PaymentClient, PaymentError, Price, SearchFilters, Signer,
    };
}
