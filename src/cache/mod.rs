//! # Cache Store
//!
//! Byte-oriented cache backends (Redis, Moka) behind `CacheProvider`, the
//! codec for cached tables, and `ReferenceCache`, the read-through service
//! that keeps every entry inside the freshness window.

pub mod clock;
pub mod codec;
pub mod errors;
pub mod keys;
pub mod provider;
pub mod providers;
pub mod store;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{CacheError, CacheResult};
pub use keys::CacheKey;
pub use provider::CacheProvider;
pub use store::{CacheEntry, ReferenceCache};
pub use traits::CacheService;
