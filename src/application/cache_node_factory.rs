//! Builds cache nodes from mutable entities.

use std::collections::BTreeMap;

use slug::slugify;

use crate::domain::content::{
    ContentCacheNode, ContentData, ContentEntity, CultureVariation, PropertyData,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheNodeFactory;

impl CacheNodeFactory {
    /// Draft nodes carry the edited state in the draft slot; published nodes
    /// carry the published state in the published slot.
    pub fn to_content_cache_node(&self, content: &ContentEntity, preview: bool) -> ContentCacheNode {
        let data = if preview {
            draft_data(content)
        } else {
            published_data(content)
        };
        let (draft, published) = if preview { (Some(data), None) } else { (None, Some(data)) };
        node(content, preview, draft, published)
    }

    /// Media is never drafted; its current state is the published slot.
    pub fn to_media_cache_node(&self, media: &ContentEntity) -> ContentCacheNode {
        let mut data = draft_data(media);
        data.published = true;
        for culture in data.culture_infos.values_mut() {
            culture.is_draft = false;
        }
        node(media, false, None, Some(data))
    }
}

fn node(
    entity: &ContentEntity,
    is_draft: bool,
    draft: Option<ContentData>,
    published: Option<ContentData>,
) -> ContentCacheNode {
    ContentCacheNode {
        id: entity.id,
        key: entity.key,
        path: entity.path.clone(),
        sort_order: entity.sort_order,
        create_date: entity.create_date,
        creator_id: entity.creator_id,
        content_type_id: entity.content_type_id,
        is_draft,
        draft,
        published,
    }
}

fn draft_data(entity: &ContentEntity) -> ContentData {
    let mut data = ContentData::new(entity.name.clone(), entity.update_date);
    data.version_id = entity.version_id;
    data.writer_id = entity.writer_id;
    data.template_id = entity.template_id;
    data.url_segment = url_segment(&entity.name);
    for property in &entity.properties {
        for value in &property.values {
            data.set_property(
                property.alias.clone(),
                PropertyData::variant(&value.culture, &value.segment, value.edited.clone()),
            );
        }
    }
    data.culture_infos = entity
        .cultures
        .iter()
        .map(|culture| {
            let variation = CultureVariation {
                name: culture.name.clone(),
                url_segment: culture.url_segment.clone(),
                date: culture.update_date,
                is_draft: true,
            };
            (culture.culture.clone(), variation)
        })
        .collect();
    data
}

fn published_data(entity: &ContentEntity) -> ContentData {
    let name = entity
        .published_name
        .clone()
        .unwrap_or_else(|| entity.name.clone());
    let mut data = ContentData::new(name, entity.publish_date.unwrap_or(entity.update_date));
    data.version_id = entity.published_version_id;
    data.writer_id = entity.writer_id;
    data.template_id = entity.template_id;
    data.published = true;
    data.url_segment = url_segment(&data.name);
    for property in &entity.properties {
        for value in &property.values {
            if let Some(published) = &value.published {
                data.set_property(
                    property.alias.clone(),
                    PropertyData::variant(&value.culture, &value.segment, published.clone()),
                );
            }
        }
    }
    data.culture_infos = entity
        .cultures
        .iter()
        .filter_map(|culture| {
            let name = culture.published_name.clone()?;
            let variation = CultureVariation {
                name,
                url_segment: culture.url_segment.clone(),
                date: culture.update_date,
                is_draft: false,
            };
            Some((culture.culture.clone(), variation))
        })
        .collect::<BTreeMap<_, _>>();
    data
}

fn url_segment(name: &str) -> Option<String> {
    let segment = slugify(name);
    (!segment.is_empty()).then_some(segment)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::domain::types::PublishedState;

    fn entity() -> ContentEntity {
        let mut entity = ContentEntity::new(3, Uuid::new_v4(), 1, "Hello World");
        entity.set_value("title", "", "", json!("edited"), Some(json!("live")));
        entity.set_value("summary", "", "", json!("draft only"), None);
        entity.published_name = Some("Hello".to_string());
        entity.published_state = PublishedState::Published;
        entity
    }

    #[test]
    fn draft_node_carries_edited_values() {
        let node = CacheNodeFactory.to_content_cache_node(&entity(), true);

        assert!(node.is_draft);
        assert!(node.published.is_none());
        let draft = node.draft.expect("draft slot");
        assert!(!draft.published);
        assert_eq!(draft.url_segment.as_deref(), Some("hello-world"));
        assert_eq!(draft.property_values("title").expect("title")[0].value, json!("edited"));
        assert!(draft.property_values("summary").is_some());
    }

    #[test]
    fn published_node_carries_published_values_only() {
        let node = CacheNodeFactory.to_content_cache_node(&entity(), false);

        assert!(!node.is_draft);
        assert!(node.draft.is_none());
        let published = node.published.expect("published slot");
        assert!(published.published);
        assert_eq!(published.name, "Hello");
        assert_eq!(published.property_values("title").expect("title")[0].value, json!("live"));
        assert!(published.property_values("summary").is_none());
    }

    #[test]
    fn media_node_uses_published_slot() {
        let node = CacheNodeFactory.to_media_cache_node(&entity());

        assert!(!node.is_draft);
        assert!(node.draft.is_none());
        let published = node.published.expect("published slot");
        assert!(published.published);
        assert_eq!(published.property_values("title").expect("title")[0].value, json!("edited"));
    }
}
