use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::{ContentVariation, ItemKind, PropertyCacheLevel};

/// Schema of a single property as seen by published content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPropertyType {
    pub alias: String,
    #[serde(default)]
    pub editor_alias: String,
    /// False for properties the system maintains (member account fields and the like).
    #[serde(default = "default_true")]
    pub is_user_property: bool,
    #[serde(default)]
    pub cache_level: PropertyCacheLevel,
    #[serde(default)]
    pub variations: ContentVariation,
}

fn default_true() -> bool {
    true
}

impl PublishedPropertyType {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            editor_alias: String::new(),
            is_user_property: true,
            cache_level: PropertyCacheLevel::Element,
            variations: ContentVariation::Nothing,
        }
    }

    pub fn with_cache_level(mut self, level: PropertyCacheLevel) -> Self {
        self.cache_level = level;
        self
    }

    pub fn with_variations(mut self, variations: ContentVariation) -> Self {
        self.variations = variations;
        self
    }

    /// Mark the property as system-maintained rather than user-editable.
    pub fn system(mut self) -> Self {
        self.is_user_property = false;
        self
    }
}

/// Schema of a content, media, or member type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedContentType {
    pub id: i32,
    #[serde(default)]
    pub key: Uuid,
    pub alias: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub variations: ContentVariation,
    #[serde(default)]
    pub property_types: Vec<PublishedPropertyType>,
    #[serde(default)]
    pub composition_aliases: BTreeSet<String>,
}

impl PublishedContentType {
    pub fn new(id: i32, alias: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id,
            key: Uuid::nil(),
            alias: alias.into(),
            kind,
            variations: ContentVariation::Nothing,
            property_types: Vec::new(),
            composition_aliases: BTreeSet::new(),
        }
    }

    pub fn with_property(mut self, property_type: PublishedPropertyType) -> Self {
        self.property_types.push(property_type);
        self
    }

    pub fn with_variations(mut self, variations: ContentVariation) -> Self {
        self.variations = variations;
        self
    }

    /// Case-insensitive lookup by alias.
    pub fn property_type(&self, alias: &str) -> Option<&PublishedPropertyType> {
        self.property_types
            .iter()
            .find(|property_type| property_type.alias.eq_ignore_ascii_case(alias))
    }

    pub fn is_composed_of(&self, alias: &str) -> bool {
        self.alias.eq_ignore_ascii_case(alias)
            || self
                .composition_aliases
                .iter()
                .any(|composition| composition.eq_ignore_ascii_case(alias))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_lookup_ignores_case() {
        let content_type = PublishedContentType::new(1, "article", ItemKind::Content)
            .with_property(PublishedPropertyType::new("bodyText"));

        assert!(content_type.property_type("BODYTEXT").is_some());
        assert!(content_type.property_type("missing").is_none());
    }

    #[test]
    fn composition_includes_own_alias() {
        let mut content_type = PublishedContentType::new(1, "article", ItemKind::Content);
        content_type.composition_aliases.insert("seoMixin".to_string());

        assert!(content_type.is_composed_of("Article"));
        assert!(content_type.is_composed_of("seomixin"));
        assert!(!content_type.is_composed_of("page"));
    }
}
