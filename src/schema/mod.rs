//! Published schema: content types, property types, and their resolution cache.

mod cache;
mod types;

pub use cache::{ContentTypeCache, ContentTypeLookup, ContentTypeServices, SchemaError};
pub use types::{PublishedContentType, PublishedPropertyType};
