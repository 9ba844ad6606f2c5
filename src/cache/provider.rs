//! Cache provider with enum dispatch
//!
//! Consumers hold a `CacheProvider` and never see the concrete backend.
//! Construction failure is fatal: there is no fallback to direct source reads.

use super::errors::CacheResult;
use super::providers::{MokaCacheService, RedisCacheService};
use super::traits::CacheService;
use crate::config::{CacheBackend as BackendKind, CacheConfig};
use tracing::info;

/// Internal cache backend enum for zero-cost dispatch
#[derive(Debug, Clone)]
enum CacheBackend {
    /// Redis cache provider (boxed to reduce enum size)
    Redis(Box<RedisCacheService>),

    /// Moka in-memory cache provider
    Moka(Box<MokaCacheService>),
}

impl CacheBackend {
    fn provider_name(&self) -> &'static str {
        match self {
            Self::Redis(s) => s.provider_name(),
            Self::Moka(s) => s.provider_name(),
        }
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        match self {
            Self::Redis(s) => s.get(key).await,
            Self::Moka(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        match self {
            Self::Redis(s) => s.set(key, value).await,
            Self::Moka(s) => s.set(key, value).await,
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        match self {
            Self::Redis(s) => s.delete(key).await,
            Self::Moka(s) => s.delete(key).await,
        }
    }

    async fn health_check(&self) -> CacheResult<bool> {
        match self {
            Self::Redis(s) => s.health_check().await,
            Self::Moka(s) => s.health_check().await,
        }
    }
}

/// Handle to the configured cache backend
#[derive(Clone)]
pub struct CacheProvider {
    backend: CacheBackend,
}

impl std::fmt::Debug for CacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheProvider")
            .field("provider", &self.backend.provider_name())
            .finish()
    }
}

impl CacheProvider {
    /// Build the backend named in configuration
    pub async fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        let backend = match config.backend {
            BackendKind::Redis => {
                let service = RedisCacheService::from_config(&config.redis).await?;
                CacheBackend::Redis(Box::new(service))
            }
            BackendKind::Moka => {
                CacheBackend::Moka(Box::new(MokaCacheService::from_config(&config.moka)))
            }
        };

        info!(
            provider = backend.provider_name(),
            freshness_seconds = config.freshness_seconds,
            "Cache provider initialized"
        );

        Ok(Self { backend })
    }

    /// In-process provider with the given capacity
    pub fn moka(max_capacity: u64) -> Self {
        Self {
            backend: CacheBackend::Moka(Box::new(MokaCacheService::new(max_capacity))),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.backend.provider_name()
    }
}

impl CacheService for CacheProvider {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.backend.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        self.backend.set(key, value).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.backend.delete(key).await
    }

    async fn health_check(&self) -> CacheResult<bool> {
        self.backend.health_check().await
    }

    fn provider_name(&self) -> &'static str {
        self.backend.provider_name()
    }
}
