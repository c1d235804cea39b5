//! MarketFactory - wires a marketplace engine from [`Config`].

use shardex_catalog::{FsContentStore, MemoryContentStore, VectorCatalog};
use shardex_core::{
    Config, ConfigError, ContentStore, ContentStoreError, EventTap, Ledger, SettlementPolicy,
    SignatureVerifier, Signer,
};
use shardex_market::MarketplaceEngine;
use shardex_pay::{Ed25519Verifier, PaymentClient, PaymentError, PaymentGate};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("content store error: {0}")]
    Store(#[from] ContentStoreError),

    #[error("payment setup error: {0}")]
    Payment(#[from] PaymentError),

    #[error("settlement policy `{0:?}` needs a ledger")]
    MissingLedger(SettlementPolicy),
}

/// Builds engines, stores and payment clients that share one config and
/// one event tap.
pub struct MarketFactory {
    config: Config,
    verifier: Arc<dyn SignatureVerifier>,
    ledger: Option<Arc<dyn Ledger>>,
    events: EventTap,
}

impl MarketFactory {
    /// Factory over `config`, verifying payments as Ed25519.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            verifier: Arc::new(Ed25519Verifier),
            ledger: None,
            events: EventTap::new(),
        }
    }

    /// Factory over the layered config found from the current directory.
    pub async fn load() -> Result<Self, FactoryError> {
        Ok(Self::new(Config::load().await?))
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn Ledger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn events(&self) -> &EventTap {
        &self.events
    }

    /// Filesystem store when `storage.directory` is set, otherwise in-memory.
    pub async fn build_store(&self) -> Result<Arc<dyn ContentStore>, FactoryError> {
        match &self.config.storage.directory {
            Some(directory) => {
                let store = FsContentStore::new(directory);
                store.init().await?;
                tracing::debug!(directory = %directory.display(), "using filesystem content store");
                Ok(Arc::new(store))
            }
            None => Ok(Arc::new(MemoryContentStore::new())),
        }
    }

    pub async fn build_catalog(&self) -> Result<VectorCatalog, FactoryError> {
        let store = self.build_store().await?;
        let mut catalog = VectorCatalog::new(store, self.config.catalog.clone())
            .with_events(self.events.clone());
        if let Some(key) = self.config.encryption_key()? {
            catalog = catalog.with_encryption_key(key);
        }
        Ok(catalog)
    }

    pub fn build_gate(&self) -> Result<PaymentGate, FactoryError> {
        Ok(PaymentGate::new(&self.config.payment, self.verifier.clone())?)
    }

    pub async fn build_engine(&self) -> Result<MarketplaceEngine, FactoryError> {
        let settlement = self.config.market.settlement;
        if settlement != SettlementPolicy::Disabled && self.ledger.is_none() {
            return Err(FactoryError::MissingLedger(settlement));
        }

        let catalog = Arc::new(self.build_catalog().await?);
        let gate = Arc::new(self.build_gate()?);
        let mut engine = MarketplaceEngine::new(catalog, gate, self.config.market.clone())
            .with_events(self.events.clone());
        if let Some(ledger) = &self.ledger {
            engine = engine.with_ledger(ledger.clone());
        }
        tracing::info!(
            settlement = ?settlement,
            encrypted = engine.catalog().is_encrypted(),
            "marketplace engine ready"
        );
        Ok(engine)
    }

    /// A buyer-side client speaking this marketplace's payment scheme.
    pub fn payment_client(&self, signer: Arc<dyn Signer>) -> Result<PaymentClient, FactoryError> {
        Ok(PaymentClient::new(&self.config.payment)?.with_signer(signer))
    }
}

impl std::fmt::Debug for MarketFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketFactory")
            .field("config", &self.config)
            .field("ledger", &self.ledger.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settlement_without_ledger_is_rejected() {
        let mut config = Config::default();
        config.market.settlement = SettlementPolicy::Deferred;
        let err = MarketFactory::new(config).build_engine().await.unwrap_err();
        assert!(matches!(err, FactoryError::MissingLedger(SettlementPolicy::Deferred)));
    }

    #[tokio::test]
    async fn test_bad_key_surfaces_config_error() {
        let mut config = Config::default();
        config.catalog.encryption_key = Some("not-hex".to_string());
        let err = MarketFactory::new(config).build_catalog().await.unwrap_err();
        assert!(matches!(err, FactoryError::Config(_)));
    }

    #[tokio::test]
    async fn test_events_are_shared() {
        let factory = MarketFactory::new(Config::default());
        let engine = factory.build_engine().await.unwrap();
        let mut rx = factory.events().attach(4);
        engine
            .catalog()
            .upload(&[1.0], Default::default())
            .await
            .unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(shardex_core::MarketEvent::VectorUploaded { .. })
        ));
    }
}
