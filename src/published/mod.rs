//! Read-only published views of cached items.

mod content;
mod factory;
mod member;
mod property;

pub use content::{
    ContentNode, NoopModelFactory, PublishedContent, PublishedModel, PublishedModelFactory,
};
pub use factory::{FactoryError, PublishedContentFactory};
pub use member::PublishedMember;
pub use property::PublishedProperty;
