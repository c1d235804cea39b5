//! shardex-market - Marketplace engine for vector memory shards.
//!
//! Sellers list vectors at a price; buyers search by similarity and purchase
//! through the 402 payment flow in `shardex-pay`. A purchase atomically marks
//! the listing sold, transfers the record to the buyer and appends a
//! [`PurchaseRecord`](shardex_core::PurchaseRecord).

pub mod engine;
pub mod error;
pub mod listing;

pub use engine::MarketplaceEngine;
pub use error::MarketError;
pub use listing::{ListOptions, SearchFilters, SearchHit};
