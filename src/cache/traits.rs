//! Cache service trait definition

use super::errors::CacheResult;

/// Byte-oriented key/value operations implemented by every cache backend.
///
/// Entries never expire on their own; staleness is decided by the shared
/// freshness timestamp, not by backend TTLs.
pub trait CacheService: Send + Sync {
    /// Get a value from the cache by key
    ///
    /// Returns `Ok(Some(value))` on cache hit, `Ok(None)` on cache miss.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = CacheResult<Option<Vec<u8>>>> + Send;

    /// Store a value, replacing any previous one
    fn set(
        &self,
        key: &str,
        value: &[u8],
    ) -> impl std::future::Future<Output = CacheResult<()>> + Send;

    /// Delete a specific key from the cache
    fn delete(&self, key: &str) -> impl std::future::Future<Output = CacheResult<()>> + Send;

    /// Check if the cache backend is healthy
    fn health_check(&self) -> impl std::future::Future<Output = CacheResult<bool>> + Send;

    /// Get the name of the cache provider
    fn provider_name(&self) -> &'static str;
}
