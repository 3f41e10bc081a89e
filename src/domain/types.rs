//! Shared domain enumerations for cached content.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of item a published snapshot represents.
///
/// Each kind resolves its schema through its own type-lookup service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Content,
    Media,
    Member,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Content => "content",
            ItemKind::Media => "media",
            ItemKind::Member => "member",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publishing state carried by a content entity when it is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishedState {
    /// Saved without publishing; no published version changes.
    #[default]
    Unpublished,
    /// Already published; the save only touches the draft.
    Published,
    /// Being published as part of this save.
    Publishing,
    /// Being unpublished as part of this save.
    Unpublishing,
}

impl PublishedState {
    pub fn is_publishing(self) -> bool {
        matches!(self, PublishedState::Publishing)
    }

    pub fn is_unpublishing(self) -> bool {
        matches!(self, PublishedState::Unpublishing)
    }
}

/// Granularity at which a converted property value is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyCacheLevel {
    /// Owned by the element (page) that carries the property.
    #[default]
    Element,
    /// Shared across every element that embeds the same nested structure.
    Elements,
    /// Lives for the duration of one published snapshot.
    Snapshot,
    /// Never cached; converted on every access.
    None,
}

/// How a content type or property type varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentVariation {
    #[default]
    Nothing,
    Culture,
    Segment,
    CultureAndSegment,
}

impl ContentVariation {
    pub fn varies_by_culture(self) -> bool {
        matches!(
            self,
            ContentVariation::Culture | ContentVariation::CultureAndSegment
        )
    }

    pub fn varies_by_segment(self) -> bool {
        matches!(
            self,
            ContentVariation::Segment | ContentVariation::CultureAndSegment
        )
    }
}
