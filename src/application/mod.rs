//! Cache services and the collaborator traits they depend on.

pub mod cache_node_factory;
pub mod content_cache;
pub mod error;
pub mod media_cache;
pub mod repos;

pub use cache_node_factory::CacheNodeFactory;
pub use content_cache::ContentCacheService;
pub use error::CacheServiceError;
pub use media_cache::MediaCacheService;
