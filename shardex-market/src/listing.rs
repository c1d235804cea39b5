//! Listing options and search filters.

use serde::{Deserialize, Serialize};
use shardex_core::{Listing, Price};

/// Optional listing attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListOptions {
    pub description: Option<String>,
    pub category: Option<String>,
    /// Tags stored on the uploaded record.
    pub tags: Vec<String>,
}

impl ListOptions {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Narrowing applied on top of similarity ranking. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    /// Similarity threshold; the catalog default when unset.
    pub min_similarity: Option<f32>,
    /// Inclusive price ceiling.
    pub max_price: Option<Price>,
    pub category: Option<String>,
    pub seller: Option<String>,
    /// Result count; the catalog default when unset, never above its ceiling.
    pub limit: Option<usize>,
}

impl SearchFilters {
    pub fn with_min_similarity(mut self, threshold: f32) -> Self {
        self.min_similarity = Some(threshold);
        self
    }

    pub fn with_max_price(mut self, price: Price) -> Self {
        self.max_price = Some(price);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_seller(mut self, seller: impl Into<String>) -> Self {
        self.seller = Some(seller.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `listing` is active and passes every set filter.
    pub fn matches(&self, listing: &Listing) -> bool {
        if !listing.is_active() {
            return false;
        }
        if let Some(max_price) = self.max_price
            && listing.price > max_price
        {
            return false;
        }
        if let Some(category) = &self.category
            && listing.category.as_ref() != Some(category)
        {
            return false;
        }
        if let Some(seller) = &self.seller
            && listing.seller != *seller
        {
            return false;
        }
        true
    }
}

/// A listing returned by search, with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub listing: Listing,
    pub similarity: f32,
}
