//! Tag-addressable entity cache.
//!
//! Read-through wrappers around the application repository traits serialize
//! entities as JSON and store them under structured keys, each entry tagged
//! by the entity ids it depends on. Writes evict by tag; backend failures on
//! the read path degrade to misses and never surface to callers.

pub mod config;
pub mod keys;
pub(crate) mod lock;
pub mod repos;
pub mod store;

pub use config::CacheConfig;
pub use repos::{
    CachedConfigurationRepo, CachedMenuRepo, CachedNodeRepo, CachedPageRepo, CachedSiteRepo,
};
pub use store::{CacheError, MemoryCache, TagCache};
