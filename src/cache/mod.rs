//! Caching primitives for published content.
//!
//! - **Hybrid cache**: a local LRU tier in front of a distributed tier, with
//!   coalesced population and stale-write protection
//! - **Elements cache**: converted property values for the live snapshot
//!
//! ## Configuration
//!
//! Lifetimes and the local tier are controlled via `pubcache.toml`:
//!
//! ```toml
//! [cache]
//! enable_local_tier = true
//! local_capacity = 10000
//! default_expiration_secs = 300
//! # ... see config.rs for all options
//! ```

mod config;
mod distributed;
mod elements;
mod error;
mod hybrid;
mod keys;
mod local;
pub(crate) mod lock;

pub use config::CacheConfig;
pub use distributed::{DistributedCache, InMemoryDistributedCache};
pub use elements::{ElementsCache, LiveSnapshot, PublishedSnapshot, SnapshotAccessor};
pub use error::CacheError;
pub use hybrid::{Cacheable, EntryOptions, HybridCache, Population};
pub use keys::{
    DRAFT_SUFFIX, content_cache_key, media_cache_key, property_value_entry_key,
    property_values_cache_key,
};
pub use local::LocalTier;
