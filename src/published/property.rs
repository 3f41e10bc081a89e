use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::cache::{ElementsCache, property_value_entry_key, property_values_cache_key};
use crate::domain::content::PropertyData;
use crate::domain::types::PropertyCacheLevel;
use crate::schema::PublishedPropertyType;

/// A property of a published item, bound to its declared type.
#[derive(Debug, Clone)]
pub struct PublishedProperty {
    property_type: Arc<PublishedPropertyType>,
    content_key: Uuid,
    preview: bool,
    values: Vec<PropertyData>,
}

impl PublishedProperty {
    pub fn new(
        property_type: Arc<PublishedPropertyType>,
        content_key: Uuid,
        preview: bool,
        values: Vec<PropertyData>,
    ) -> Self {
        Self {
            property_type,
            content_key,
            preview,
            values,
        }
    }

    pub fn alias(&self) -> &str {
        &self.property_type.alias
    }

    pub fn property_type(&self) -> &PublishedPropertyType {
        &self.property_type
    }

    pub fn cache_level(&self) -> PropertyCacheLevel {
        self.property_type.cache_level
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    /// Base key of this property's values in an elements cache.
    ///
    /// Draft and published properties of the same item never share a key.
    pub fn values_cache_key(&self) -> String {
        property_values_cache_key(self.content_key, &self.property_type.alias, self.preview)
    }

    /// Raw stored value for a (culture, segment) pair.
    ///
    /// Culture and segment are ignored when the property type does not vary by them.
    pub fn value(&self, culture: &str, segment: &str) -> Option<&Value> {
        let (culture, segment) = self.normalize(culture, segment);
        self.values
            .iter()
            .find(|data| data.matches(culture, segment))
            .map(|data| &data.value)
    }

    pub fn has_value(&self, culture: &str, segment: &str) -> bool {
        self.value(culture, segment).is_some_and(|value| !value.is_null())
    }

    pub fn values(&self) -> &[PropertyData] {
        &self.values
    }

    /// Value served through the elements cache when the property is
    /// element-scoped; other levels read the stored value directly.
    pub fn cached_value(
        &self,
        elements: Option<&ElementsCache>,
        culture: &str,
        segment: &str,
    ) -> Option<Value> {
        let value = self.value(culture, segment)?;
        match (self.cache_level(), elements) {
            (PropertyCacheLevel::Elements, Some(elements)) => {
                let (culture, segment) = self.normalize(culture, segment);
                let key = property_value_entry_key(&self.values_cache_key(), culture, segment);
                Some(elements.get_or_insert_with(&key, || value.clone()))
            }
            _ => Some(value.clone()),
        }
    }

    fn normalize<'a>(&self, culture: &'a str, segment: &'a str) -> (&'a str, &'a str) {
        let variations = self.property_type.variations;
        (
            if variations.varies_by_culture() { culture } else { "" },
            if variations.varies_by_segment() { segment } else { "" },
        )
    }
}
