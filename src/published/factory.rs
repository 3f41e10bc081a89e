//! Builds published views from cached nodes and member entities.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Value, json};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use crate::domain::content::{ContentCacheNode, ContentData, MemberEntity, PropertyData};
use crate::domain::types::ItemKind;
use crate::schema::{ContentTypeCache, PublishedContentType, SchemaError};

use super::content::{ContentNode, PublishedContent, PublishedModel, PublishedModelFactory};
use super::member::PublishedMember;

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("innermost published model is {found}, expected concrete content")]
    Invariant { found: &'static str },
}

pub struct PublishedContentFactory {
    content_types: Arc<ContentTypeCache>,
    model_factory: Arc<dyn PublishedModelFactory>,
}

impl PublishedContentFactory {
    pub fn new(
        content_types: Arc<ContentTypeCache>,
        model_factory: Arc<dyn PublishedModelFactory>,
    ) -> Self {
        Self {
            content_types,
            model_factory,
        }
    }

    /// Published view of a content node.
    ///
    /// Preview prefers the draft slot and otherwise falls back to the
    /// published slot's concrete content, marked as a draft.
    pub fn to_published_content(
        &self,
        node: &ContentCacheNode,
        preview: bool,
    ) -> Result<Option<PublishedModel>, FactoryError> {
        let content_type = self.content_types.get(ItemKind::Content, node.content_type_id)?;
        let node = ContentNode::new(node, content_type, Arc::clone(&self.model_factory));

        if !preview {
            return Ok(node.published_model().cloned());
        }
        if let Some(draft) = node.draft_model() {
            return Ok(Some(draft.clone()));
        }
        let Some(published) = node.published_model() else {
            return Ok(None);
        };

        debug!(id = node.id(), "No draft slot; serving published content as draft");
        let concrete = concrete_content(published)?;
        Ok(Some(PublishedModel::Content(Arc::new(concrete.as_draft()))))
    }

    /// Media has a single variant, always read from the published slot.
    pub fn to_published_media(
        &self,
        node: &ContentCacheNode,
    ) -> Result<Option<PublishedModel>, FactoryError> {
        let content_type = self.content_types.get(ItemKind::Media, node.content_type_id)?;
        let node = ContentNode::new(node, content_type, Arc::clone(&self.model_factory));
        Ok(node.published_model().cloned())
    }

    pub fn to_published_member(&self, member: &MemberEntity) -> Result<PublishedMember, FactoryError> {
        let content_type = self.content_types.get(ItemKind::Member, member.content_type_id)?;

        let mut data = ContentData::new(member.name.clone(), member.update_date);
        data.writer_id = member.creator_id;
        data.properties = member_properties(&content_type, member);

        let content = PublishedContent::for_member(member, &content_type, &data);
        Ok(PublishedMember::new(content, member))
    }
}

fn concrete_content(model: &PublishedModel) -> Result<&PublishedContent, FactoryError> {
    match model.innermost() {
        PublishedModel::Content(content) => Ok(content),
        PublishedModel::Member(_) => Err(FactoryError::Invariant { found: "a member" }),
        PublishedModel::Wrapped { .. } => Err(FactoryError::Invariant { found: "a wrapper" }),
    }
}

/// User properties plus account fields surfaced as properties.
///
/// An account field is surfaced only where the member type declares a
/// same-named system property, so it never replaces user-entered data.
fn member_properties(
    content_type: &PublishedContentType,
    member: &MemberEntity,
) -> BTreeMap<String, Vec<PropertyData>> {
    let mut properties: BTreeMap<String, Vec<PropertyData>> = member
        .properties
        .iter()
        .map(|(alias, value)| (alias.clone(), vec![PropertyData::invariant(value.clone())]))
        .collect();

    let account_fields = [
        ("Email", json!(member.email)),
        ("Username", json!(member.username)),
        ("Comments", json!(member.comments)),
        ("IsApproved", json!(member.is_approved)),
        ("IsLockedOut", json!(member.is_locked_out)),
        ("LastLockoutDate", date_value(member.last_lockout_date)),
        ("CreateDate", date_value(Some(member.create_date))),
        ("LastLoginDate", date_value(member.last_login_date)),
        ("LastPasswordChangeDate", date_value(member.last_password_change_date)),
    ];

    for (alias, value) in account_fields {
        let is_system_property = content_type
            .property_type(alias)
            .is_some_and(|property_type| !property_type.is_user_property);
        if !is_system_property {
            continue;
        }
        properties.retain(|existing, _| !existing.eq_ignore_ascii_case(alias));
        properties.insert(alias.to_string(), vec![PropertyData::invariant(value)]);
    }

    properties
}

fn date_value(date: Option<OffsetDateTime>) -> Value {
    date.and_then(|date| date.format(&Rfc3339).ok())
        .map_or(Value::Null, Value::String)
}
