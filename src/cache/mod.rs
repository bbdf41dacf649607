//! Cache module - TTL entry store and cache key derivation

pub mod key;
pub mod store;

pub use key::derive_cache_key;
pub use store::{CacheEntry, CacheStore, Clock, SystemClock};
