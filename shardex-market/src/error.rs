//! Marketplace errors

use shardex_catalog::CatalogError;
use shardex_core::{LedgerError, ListingId, ListingStatus, VectorError};
use shardex_pay::PaymentError;

#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("listing not found: {0}")]
    ListingNotFound(ListingId),

    /// The listing exists but can no longer be bought or changed.
    #[error("listing {listing_id} is {status}")]
    ListingUnavailable {
        listing_id: ListingId,
        status: ListingStatus,
    },

    /// Another buyer's purchase of the listing is settling.
    #[error("listing {listing_id} is reserved by a purchase in progress")]
    ListingReserved { listing_id: ListingId },

    #[error("payment does not match listing {listing_id}: {reason}")]
    PaymentMismatch { listing_id: ListingId, reason: String },

    #[error("`{caller}` is not the seller of listing {listing_id}")]
    NotSeller { listing_id: ListingId, caller: String },

    #[error("payment rejected: {0}")]
    Payment(#[from] PaymentError),

    #[error("catalog error: {0}")]
    Catalog(CatalogError),

    #[error("settlement failed: {0}")]
    Settlement(#[from] LedgerError),

    #[error(transparent)]
    Vector(#[from] VectorError),
}

impl From<CatalogError> for MarketError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Vector(err) => MarketError::Vector(err),
            other => MarketError::Catalog(other),
        }
    }
}

impl MarketError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ListingNotFound(_) => "listing_not_found",
            Self::ListingUnavailable { .. } | Self::ListingReserved { .. } => {
                "listing_unavailable"
            }
            Self::PaymentMismatch { .. } => "payment_mismatch",
            Self::NotSeller { .. } => "not_seller",
            Self::Payment(_) => "payment_invalid",
            Self::Catalog(_) => "catalog_error",
            Self::Settlement(_) => "settlement_failed",
            Self::Vector(_) => "invalid_vector",
        }
    }

    pub fn to_error_payload(&self) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "error": self.error_code(),
            "message": self.to_string(),
        });
        if let Self::Payment(err) = self {
            payload["payment_error"] = serde_json::Value::from(err.error_code());
        }
        payload
    }
}
