//! In-memory cache provider using Moka
//!
//! Entries are bounded by capacity only; nothing expires on its own.
//! This cache is NOT distributed. Each process holds its own copy, so it
//! suits single-instance deployments and tests.

use crate::cache::errors::CacheResult;
use crate::cache::traits::CacheService;
use crate::config::MokaConfig;
use tracing::debug;

/// In-memory cache service using Moka
#[derive(Clone)]
pub struct MokaCacheService {
    cache: moka::future::Cache<String, Vec<u8>>,
}

impl std::fmt::Debug for MokaCacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCacheService")
            .field("max_capacity", &self.cache.policy().max_capacity())
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl MokaCacheService {
    /// Create a new Moka cache service from configuration
    pub fn from_config(config: &MokaConfig) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(config.max_capacity)
            .build();

        debug!(
            max_capacity = config.max_capacity,
            "Moka in-memory cache service created"
        );

        Self { cache }
    }

    /// Create with an explicit capacity (for testing)
    pub fn new(max_capacity: u64) -> Self {
        Self::from_config(&MokaConfig { max_capacity })
    }
}

impl CacheService for MokaCacheService {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let result = self.cache.get(key).await;

        if result.is_some() {
            debug!(key = key, "Cache HIT (moka)");
        } else {
            debug!(key = key, "Cache MISS (moka)");
        }

        Ok(result)
    }

    async fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        self.cache.insert(key.to_string(), value.to_vec()).await;
        debug!(key = key, bytes = value.len(), "Cache SET (moka)");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.cache.invalidate(key).await;
        debug!(key = key, "Cache DEL (moka)");
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        // In-process cache is always reachable
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "moka"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let service = MokaCacheService::new(16);

        assert_eq!(service.get("all_grades").await.unwrap(), None);

        service.set("all_grades", b"[1,2,3]").await.unwrap();
        assert_eq!(
            service.get("all_grades").await.unwrap(),
            Some(b"[1,2,3]".to_vec())
        );

        service.set("all_grades", b"[]").await.unwrap();
        assert_eq!(service.get("all_grades").await.unwrap(), Some(b"[]".to_vec()));

        service.delete("all_grades").await.unwrap();
        assert_eq!(service.get("all_grades").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_health_check_and_name() {
        let service = MokaCacheService::new(4);
        assert!(service.health_check().await.unwrap());
        assert_eq!(service.provider_name(), "moka");
    }
}
