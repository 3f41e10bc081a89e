//! Cache key formats.
//!
//! Entry keys are compatible with other readers of the same distributed
//! cache: the published entry is the hyphenated key, the draft entry appends
//! `+draft`. `+` never occurs in a hyphenated UUID, so the two cannot collide.

use uuid::Uuid;

pub const DRAFT_SUFFIX: &str = "+draft";

const PROPERTY_VALUES_PREFIX: &str = "published.property.values";

/// Key of the cache entry holding one variant of a content item.
pub fn content_cache_key(key: Uuid, preview: bool) -> String {
    if preview {
        format!("{key}{DRAFT_SUFFIX}")
    } else {
        key.to_string()
    }
}

/// Key of the cache entry holding a media item (single variant).
pub fn media_cache_key(key: Uuid) -> String {
    key.to_string()
}

/// Base key under which a property's converted values live in the elements cache.
pub fn property_values_cache_key(content_key: Uuid, alias: &str, preview: bool) -> String {
    let variant = if preview { 'D' } else { 'P' };
    format!("{PROPERTY_VALUES_PREFIX}[{variant}:{content_key}:{alias}]")
}

/// Key of one (culture, segment) value below a property's base key.
pub fn property_value_entry_key(base: &str, culture: &str, segment: &str) -> String {
    format!("{base}[{culture}:{segment}]")
}
