use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Failure surfaced by the hybrid cache.
///
/// Cloneable so one failed population can be handed to every coalesced waiter.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("distributed cache operation `{op}` failed: {message}")]
    Backend { op: &'static str, message: String },
    #[error("failed to encode cache entry `{key}`: {message}")]
    Encode { key: String, message: String },
    #[error("failed to decode cache entry `{key}`: {message}")]
    Decode { key: String, message: String },
    #[error("population of `{key}` failed: {source}")]
    Populate {
        key: String,
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },
    #[error("population of `{key}` was aborted")]
    Aborted { key: String },
}

impl CacheError {
    pub fn populate(key: impl Into<String>, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Populate {
            key: key.into(),
            source: Arc::new(source),
        }
    }

    pub fn backend(op: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            op,
            message: message.into(),
        }
    }
}
