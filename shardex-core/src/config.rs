//! Configuration for shardex
//!
//! Supports layered configuration: defaults → file → env (secrets only)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the hex-encoded catalog encryption key.
pub const ENCRYPTION_KEY_ENV: &str = "SHARDEX_ENCRYPTION_KEY";

const PROJECT_CONFIG_PATH: &str = ".shardex/config.toml";

/// Complete configuration for shardex
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub payment: PaymentConfig,
    pub market: MarketConfig,
    pub storage: StorageConfig,
}

/// Similarity search defaults and payload encryption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Threshold used when a search does not give one.
    pub default_threshold: f32,
    /// Result count used when a search does not give one.
    pub default_limit: usize,
    /// Upper bound applied to every requested limit.
    pub max_limit: usize,
    /// Hex-encoded 32-byte key. When set, payloads are sealed before storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_threshold: 0.75,
            default_limit: 10,
            max_limit: 100,
            encryption_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Authentication scheme name used in challenge and authorization headers.
    pub scheme: String,
    /// Prefix of the flat challenge headers (`<prefix>Price`, `<prefix>Wallet`, ...).
    pub header_prefix: String,
    /// Lifetime of challenges issued by the payment gate.
    pub challenge_ttl_secs: u64,
    /// How long consumed nonces are remembered. Never shorter than the
    /// challenge lifetime.
    pub nonce_retention_secs: u64,
    /// Unpaid challenges the gate keeps per resource; the oldest is evicted
    /// beyond this.
    pub max_pending_per_resource: usize,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            scheme: "X402".to_string(),
            header_prefix: "X-Payment-".to_string(),
            challenge_ttl_secs: 300,
            nonce_retention_secs: 3600,
            max_pending_per_resource: 256,
        }
    }
}

impl PaymentConfig {
    pub fn challenge_ttl(&self) -> Duration {
        Duration::from_secs(self.challenge_ttl_secs)
    }

    pub fn nonce_retention(&self) -> Duration {
        Duration::from_secs(self.nonce_retention_secs)
    }
}

/// When the payment proof is handed to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementPolicy {
    /// Never submit proofs.
    #[default]
    Disabled,
    /// Submit after the purchase commits; failures are reported, not rolled back.
    Deferred,
    /// Submit before the purchase commits; failure aborts the purchase.
    BeforeAccess,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Base of the resource URLs listings are paid for under.
    pub resource_base: String,
    pub settlement: SettlementPolicy,
    /// Capacity of the audit event channel.
    pub event_buffer: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            resource_base: "shard://market".to_string(),
            settlement: SettlementPolicy::Disabled,
            event_buffer: 256,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the filesystem content store; in-memory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources with proper layering
    /// Order: defaults → project config OR global config → env vars (secrets only)
    pub async fn load() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir()?;
        let home = dirs::home_dir();
        Self::load_from_with_env(&cwd, home.as_deref(), |key| std::env::var(key).ok()).await
    }

    /// Load config like [`Config::load`], but with explicit start directory, home directory,
    /// and environment variable provider.
    #[doc(hidden)]
    pub async fn load_from_with_env<F>(
        start_dir: &Path,
        home_dir: Option<&Path>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = Self::find_project_config_from(start_dir).await {
            config.merge_file(&path).await?;
        } else if let Some(path) = home_dir.map(|home| home.join(PROJECT_CONFIG_PATH))
            && tokio::fs::try_exists(&path).await.unwrap_or(false)
        {
            config.merge_file(&path).await?;
        }

        config.apply_env_overrides_from(env);
        config.validate()?;
        tracing::debug!(
            settlement = ?config.market.settlement,
            encrypted = config.catalog.encryption_key.is_some(),
            "loaded shardex config"
        );
        Ok(config)
    }

    /// Walk up from `start_dir` looking for `.shardex/config.toml`.
    pub async fn find_project_config_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();
        loop {
            let config_path = current.join(PROJECT_CONFIG_PATH);
            if tokio::fs::try_exists(&config_path).await.unwrap_or(false) {
                return Some(config_path);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Merge configuration from a TOML file
    pub async fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let file_config: Config = toml::from_str(&content)?;
        self.merge(file_config);
        Ok(())
    }

    /// Sections that differ from their defaults replace ours.
    fn merge(&mut self, other: Config) {
        if other.catalog != CatalogConfig::default() {
            self.catalog = other.catalog;
        }
        if other.payment != PaymentConfig::default() {
            self.payment = other.payment;
        }
        if other.market != MarketConfig::default() {
            self.market = other.market;
        }
        if other.storage.directory.is_some() {
            self.storage.directory = other.storage.directory;
        }
    }

    /// Apply environment variable overrides (secrets only) using an explicit env provider.
    #[doc(hidden)]
    pub fn apply_env_overrides_from<F>(&mut self, mut env: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        if self.catalog.encryption_key.is_none()
            && let Some(key) = env(ENCRYPTION_KEY_ENV).filter(|k| !k.trim().is_empty())
        {
            self.catalog.encryption_key = Some(key.trim().to_string());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let catalog = &self.catalog;
        if !(-1.0..=1.0).contains(&catalog.default_threshold) {
            return Err(ConfigError::InvalidValue(format!(
                "catalog.default_threshold must be within [-1, 1], got {}",
                catalog.default_threshold
            )));
        }
        if catalog.default_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "catalog.default_limit must be positive".to_string(),
            ));
        }
        if catalog.max_limit < catalog.default_limit {
            return Err(ConfigError::InvalidValue(format!(
                "catalog.max_limit ({}) is below catalog.default_limit ({})",
                catalog.max_limit, catalog.default_limit
            )));
        }
        self.encryption_key()?;

        let payment = &self.payment;
        if payment.scheme.trim().is_empty() || payment.scheme.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidValue(format!(
                "payment.scheme must be a single token, got `{}`",
                payment.scheme
            )));
        }
        if payment.challenge_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "payment.challenge_ttl_secs must be positive".to_string(),
            ));
        }
        if payment.nonce_retention_secs < payment.challenge_ttl_secs {
            return Err(ConfigError::InvalidValue(
                "payment.nonce_retention_secs must cover payment.challenge_ttl_secs".to_string(),
            ));
        }
        if payment.max_pending_per_resource == 0 {
            return Err(ConfigError::InvalidValue(
                "payment.max_pending_per_resource must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Decoded catalog encryption key, if configured.
    pub fn encryption_key(&self) -> Result<Option<[u8; 32]>, ConfigError> {
        let Some(raw) = self.catalog.encryption_key.as_deref() else {
            return Ok(None);
        };
        let bytes = hex::decode(raw).map_err(|_| {
            ConfigError::InvalidValue("catalog.encryption_key must be hex".to_string())
        })?;
        let key: [u8; 32] = bytes.try_into().map_err(|_| {
            ConfigError::InvalidValue("catalog.encryption_key must be 32 bytes".to_string())
        })?;
        Ok(Some(key))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
