//! Content snapshots as stored in the cache, and the mutable entities they are built from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::PublishedState;

/// One value of a property for a given (culture, segment) pair.
///
/// Empty culture and segment strings denote the invariant value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyData {
    #[serde(default)]
    pub culture: String,
    #[serde(default)]
    pub segment: String,
    pub value: Value,
}

impl PropertyData {
    pub fn invariant(value: Value) -> Self {
        Self {
            culture: String::new(),
            segment: String::new(),
            value,
        }
    }

    pub fn variant(culture: impl Into<String>, segment: impl Into<String>, value: Value) -> Self {
        Self {
            culture: culture.into(),
            segment: segment.into(),
            value,
        }
    }

    pub fn matches(&self, culture: &str, segment: &str) -> bool {
        self.culture.eq_ignore_ascii_case(culture) && self.segment.eq_ignore_ascii_case(segment)
    }
}

/// Per-culture naming information for a variant item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CultureVariation {
    pub name: String,
    pub url_segment: Option<String>,
    pub date: OffsetDateTime,
    pub is_draft: bool,
}

/// Payload of one variant (draft or published) of a cached item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentData {
    pub name: String,
    pub url_segment: Option<String>,
    pub version_id: i32,
    pub version_date: OffsetDateTime,
    pub writer_id: i32,
    pub template_id: Option<i32>,
    pub published: bool,
    /// Property alias to values, ordered and unique by (culture, segment).
    pub properties: BTreeMap<String, Vec<PropertyData>>,
    pub culture_infos: BTreeMap<String, CultureVariation>,
}

impl ContentData {
    pub fn new(name: impl Into<String>, version_date: OffsetDateTime) -> Self {
        Self {
            name: name.into(),
            url_segment: None,
            version_id: 0,
            version_date,
            writer_id: 0,
            template_id: None,
            published: false,
            properties: BTreeMap::new(),
            culture_infos: BTreeMap::new(),
        }
    }

    /// Insert or replace the value stored for `(data.culture, data.segment)`.
    pub fn set_property(&mut self, alias: impl Into<String>, data: PropertyData) {
        let values = self.properties.entry(alias.into()).or_default();
        match values
            .iter()
            .position(|existing| existing.matches(&data.culture, &data.segment))
        {
            Some(index) => values[index] = data,
            None => {
                values.push(data);
                values.sort_by(|a, b| {
                    a.culture
                        .cmp(&b.culture)
                        .then_with(|| a.segment.cmp(&b.segment))
                });
            }
        }
    }

    pub fn property_values(&self, alias: &str) -> Option<&[PropertyData]> {
        self.properties
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(alias))
            .map(|(_, values)| values.as_slice())
    }
}

/// Cached snapshot of a content or media item.
///
/// Draft and published payloads travel in separate slots; a node written to
/// the cache carries at least the slot relevant to the request that built it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentCacheNode {
    pub id: i32,
    pub key: Uuid,
    pub path: String,
    pub sort_order: i32,
    pub create_date: OffsetDateTime,
    pub creator_id: i32,
    pub content_type_id: i32,
    pub is_draft: bool,
    pub draft: Option<ContentData>,
    pub published: Option<ContentData>,
}

/// One (culture, segment) value of an entity property, edited and published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPropertyValue {
    #[serde(default)]
    pub culture: String,
    #[serde(default)]
    pub segment: String,
    pub edited: Value,
    #[serde(default)]
    pub published: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityProperty {
    pub alias: String,
    #[serde(default)]
    pub values: Vec<EntityPropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCulture {
    pub culture: String,
    pub name: String,
    #[serde(default)]
    pub published_name: Option<String>,
    #[serde(default)]
    pub url_segment: Option<String>,
    pub update_date: OffsetDateTime,
}

/// Mutable content or media entity as handed over by the lifecycle layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntity {
    pub id: i32,
    pub key: Uuid,
    pub content_type_id: i32,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub sort_order: i32,
    pub create_date: OffsetDateTime,
    pub update_date: OffsetDateTime,
    #[serde(default)]
    pub creator_id: i32,
    #[serde(default)]
    pub writer_id: i32,
    #[serde(default)]
    pub template_id: Option<i32>,
    pub name: String,
    #[serde(default)]
    pub published_name: Option<String>,
    #[serde(default)]
    pub publish_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub version_id: i32,
    #[serde(default)]
    pub published_version_id: i32,
    #[serde(default)]
    pub published_state: PublishedState,
    #[serde(default)]
    pub properties: Vec<EntityProperty>,
    #[serde(default)]
    pub cultures: Vec<EntityCulture>,
}

impl ContentEntity {
    pub fn new(id: i32, key: Uuid, content_type_id: i32, name: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id,
            key,
            content_type_id,
            path: format!("-1,{id}"),
            sort_order: 0,
            create_date: now,
            update_date: now,
            creator_id: 0,
            writer_id: 0,
            template_id: None,
            name: name.into(),
            published_name: None,
            publish_date: None,
            version_id: 1,
            published_version_id: 0,
            published_state: PublishedState::Unpublished,
            properties: Vec::new(),
            cultures: Vec::new(),
        }
    }

    /// Set the edited (and optionally published) value of a property.
    pub fn set_value(
        &mut self,
        alias: &str,
        culture: &str,
        segment: &str,
        edited: Value,
        published: Option<Value>,
    ) {
        let index = match self
            .properties
            .iter()
            .position(|property| property.alias.eq_ignore_ascii_case(alias))
        {
            Some(index) => index,
            None => {
                self.properties.push(EntityProperty {
                    alias: alias.to_string(),
                    values: Vec::new(),
                });
                self.properties.len() - 1
            }
        };
        let values = &mut self.properties[index].values;
        let entry = EntityPropertyValue {
            culture: culture.to_string(),
            segment: segment.to_string(),
            edited,
            published,
        };
        match values.iter().position(|value| {
            value.culture.eq_ignore_ascii_case(culture) && value.segment.eq_ignore_ascii_case(segment)
        }) {
            Some(position) => values[position] = entry,
            None => values.push(entry),
        }
    }

    /// Copy every edited value into its published counterpart and mark the
    /// entity as being published.
    pub fn publish(&mut self) {
        for property in &mut self.properties {
            for value in &mut property.values {
                value.published = Some(value.edited.clone());
            }
        }
        for culture in &mut self.cultures {
            culture.published_name = Some(culture.name.clone());
        }
        self.published_name = Some(self.name.clone());
        self.published_version_id = self.version_id;
        self.publish_date = Some(self.update_date);
        self.published_state = PublishedState::Publishing;
    }

    /// Drop the published values and mark the entity as being unpublished.
    pub fn unpublish(&mut self) {
        for property in &mut self.properties {
            for value in &mut property.values {
                value.published = None;
            }
        }
        for culture in &mut self.cultures {
            culture.published_name = None;
        }
        self.published_name = None;
        self.publish_date = None;
        self.published_state = PublishedState::Unpublishing;
    }

    pub fn has_published_version(&self) -> bool {
        self.published_name.is_some()
    }
}

/// Member entity; members are single-variant and carry account fields that
/// may surface as read-only pseudo-properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberEntity {
    pub id: i32,
    pub key: Uuid,
    pub content_type_id: i32,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub sort_order: i32,
    pub create_date: OffsetDateTime,
    pub update_date: OffsetDateTime,
    #[serde(default)]
    pub creator_id: i32,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub is_locked_out: bool,
    #[serde(default)]
    pub last_lockout_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub last_login_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub last_password_change_date: Option<OffsetDateTime>,
    /// Dynamic, schema-defined property values by alias.
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl MemberEntity {
    pub fn new(id: i32, key: Uuid, content_type_id: i32, name: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id,
            key,
            content_type_id,
            name: name.into(),
            path: format!("-1,{id}"),
            sort_order: 0,
            create_date: now,
            update_date: now,
            creator_id: 0,
            email: String::new(),
            username: String::new(),
            comments: None,
            is_approved: false,
            is_locked_out: false,
            last_lockout_date: None,
            last_login_date: None,
            last_password_change_date: None,
            properties: BTreeMap::new(),
        }
    }
}
