//! Published views of cached content and the node that builds them.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::content::{ContentCacheNode, ContentData, CultureVariation, MemberEntity};
use crate::domain::types::ItemKind;
use crate::schema::PublishedContentType;

use super::member::PublishedMember;
use super::property::PublishedProperty;

/// Read-only view of one variant of a content or media item.
#[derive(Debug, Clone)]
pub struct PublishedContent {
    id: i32,
    key: Uuid,
    content_type: Arc<PublishedContentType>,
    name: String,
    url_segment: Option<String>,
    path: String,
    sort_order: i32,
    create_date: OffsetDateTime,
    update_date: OffsetDateTime,
    creator_id: i32,
    writer_id: i32,
    template_id: Option<i32>,
    is_draft: bool,
    is_published: bool,
    properties: Vec<PublishedProperty>,
    cultures: BTreeMap<String, CultureVariation>,
}

impl PublishedContent {
    fn build(
        identity: &NodeIdentity,
        content_type: &Arc<PublishedContentType>,
        data: &ContentData,
        preview: bool,
    ) -> Self {
        let properties = content_type
            .property_types
            .iter()
            .map(|property_type| {
                let values = data
                    .property_values(&property_type.alias)
                    .map(<[_]>::to_vec)
                    .unwrap_or_default();
                PublishedProperty::new(
                    Arc::new(property_type.clone()),
                    identity.key,
                    preview,
                    values,
                )
            })
            .collect();

        Self {
            id: identity.id,
            key: identity.key,
            content_type: Arc::clone(content_type),
            name: data.name.clone(),
            url_segment: data.url_segment.clone(),
            path: identity.path.clone(),
            sort_order: identity.sort_order,
            create_date: identity.create_date,
            update_date: data.version_date,
            creator_id: identity.creator_id,
            writer_id: data.writer_id,
            template_id: data.template_id,
            is_draft: preview,
            is_published: data.published,
            properties,
            cultures: data.culture_infos.clone(),
        }
    }

    pub(crate) fn for_member(
        member: &MemberEntity,
        content_type: &Arc<PublishedContentType>,
        data: &ContentData,
    ) -> Self {
        let identity = NodeIdentity {
            id: member.id,
            key: member.key,
            path: member.path.clone(),
            sort_order: member.sort_order,
            create_date: member.create_date,
            creator_id: member.creator_id,
        };
        Self::build(&identity, content_type, data, false)
    }

    /// Same content marked as a draft, with property cache keys in the draft space.
    pub fn as_draft(&self) -> Self {
        let mut draft = self.clone();
        draft.is_draft = true;
        draft.properties = self
            .properties
            .iter()
            .map(|property| {
                PublishedProperty::new(
                    Arc::new(property.property_type().clone()),
                    self.key,
                    true,
                    property.values().to_vec(),
                )
            })
            .collect();
        draft
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn key(&self) -> Uuid {
        self.key
    }

    pub fn kind(&self) -> ItemKind {
        self.content_type.kind
    }

    pub fn content_type(&self) -> &PublishedContentType {
        &self.content_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url_segment(&self) -> Option<&str> {
        self.url_segment.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn sort_order(&self) -> i32 {
        self.sort_order
    }

    pub fn create_date(&self) -> OffsetDateTime {
        self.create_date
    }

    pub fn update_date(&self) -> OffsetDateTime {
        self.update_date
    }

    pub fn creator_id(&self) -> i32 {
        self.creator_id
    }

    pub fn writer_id(&self) -> i32 {
        self.writer_id
    }

    pub fn template_id(&self) -> Option<i32> {
        self.template_id
    }

    pub fn is_draft(&self) -> bool {
        self.is_draft
    }

    pub fn is_published(&self) -> bool {
        self.is_published
    }

    pub fn cultures(&self) -> &BTreeMap<String, CultureVariation> {
        &self.cultures
    }

    pub fn properties(&self) -> &[PublishedProperty] {
        &self.properties
    }

    pub fn property(&self, alias: &str) -> Option<&PublishedProperty> {
        self.properties
            .iter()
            .find(|property| property.alias().eq_ignore_ascii_case(alias))
    }

    pub fn value(&self, alias: &str, culture: &str, segment: &str) -> Option<&Value> {
        self.property(alias)?.value(culture, segment)
    }
}

/// A published item as handed to consumers.
///
/// Model factories may wrap concrete content in typed layers; `Wrapped`
/// records one such layer under the model's name.
#[derive(Debug, Clone)]
pub enum PublishedModel {
    Content(Arc<PublishedContent>),
    Member(Arc<PublishedMember>),
    Wrapped {
        model: String,
        inner: Box<PublishedModel>,
    },
}

impl PublishedModel {
    pub fn wrap(model: impl Into<String>, inner: PublishedModel) -> Self {
        Self::Wrapped {
            model: model.into(),
            inner: Box::new(inner),
        }
    }

    /// Innermost model below every wrapping layer.
    pub fn innermost(&self) -> &PublishedModel {
        let mut current = self;
        while let PublishedModel::Wrapped { inner, .. } = current {
            current = inner;
        }
        current
    }

    /// Concrete content below any wrapping layers, if that is what the
    /// innermost model is.
    pub fn content(&self) -> Option<&PublishedContent> {
        match self.innermost() {
            PublishedModel::Content(content) => Some(content),
            PublishedModel::Member(member) => Some(member.content()),
            PublishedModel::Wrapped { .. } => None,
        }
    }

    pub fn model_name(&self) -> Option<&str> {
        match self {
            PublishedModel::Wrapped { model, .. } => Some(model),
            _ => None,
        }
    }
}

/// Builds typed models around concrete published content.
pub trait PublishedModelFactory: Send + Sync {
    fn create_model(&self, content: PublishedModel) -> PublishedModel;
}

/// Hands concrete content out unwrapped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopModelFactory;

impl PublishedModelFactory for NoopModelFactory {
    fn create_model(&self, content: PublishedModel) -> PublishedModel {
        content
    }
}

#[derive(Debug, Clone)]
struct NodeIdentity {
    id: i32,
    key: Uuid,
    path: String,
    sort_order: i32,
    create_date: OffsetDateTime,
    creator_id: i32,
}

/// A cached node bound to its resolved content type.
///
/// Draft and published models are built on first access and reused.
pub struct ContentNode {
    identity: NodeIdentity,
    content_type: Arc<PublishedContentType>,
    draft_data: Option<ContentData>,
    published_data: Option<ContentData>,
    model_factory: Arc<dyn PublishedModelFactory>,
    draft_model: OnceLock<Option<PublishedModel>>,
    published_model: OnceLock<Option<PublishedModel>>,
}

impl ContentNode {
    pub fn new(
        node: &ContentCacheNode,
        content_type: Arc<PublishedContentType>,
        model_factory: Arc<dyn PublishedModelFactory>,
    ) -> Self {
        Self {
            identity: NodeIdentity {
                id: node.id,
                key: node.key,
                path: node.path.clone(),
                sort_order: node.sort_order,
                create_date: node.create_date,
                creator_id: node.creator_id,
            },
            content_type,
            draft_data: node.draft.clone(),
            published_data: node.published.clone(),
            model_factory,
            draft_model: OnceLock::new(),
            published_model: OnceLock::new(),
        }
    }

    pub fn id(&self) -> i32 {
        self.identity.id
    }

    pub fn key(&self) -> Uuid {
        self.identity.key
    }

    pub fn content_type(&self) -> &Arc<PublishedContentType> {
        &self.content_type
    }

    pub fn draft_model(&self) -> Option<&PublishedModel> {
        self.draft_model
            .get_or_init(|| self.build_model(self.draft_data.as_ref(), true))
            .as_ref()
    }

    pub fn published_model(&self) -> Option<&PublishedModel> {
        self.published_model
            .get_or_init(|| self.build_model(self.published_data.as_ref(), false))
            .as_ref()
    }

    fn build_model(&self, data: Option<&ContentData>, preview: bool) -> Option<PublishedModel> {
        let data = data?;
        let content = PublishedContent::build(&self.identity, &self.content_type, data, preview);
        Some(
            self.model_factory
                .create_model(PublishedModel::Content(Arc::new(content))),
        )
    }
}
