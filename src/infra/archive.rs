//! TOML content archives loaded into the in-memory backend.
//!
//! An archive lists content types, content and media items, members, and the
//! relations between items. Items are described by their edited values; a
//! `published = true` item also gets a published version equal to its edits.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::CacheNodeFactory;
use crate::domain::content::{ContentEntity, EntityCulture, MemberEntity};
use crate::domain::relations::Relation;
use crate::domain::types::ItemKind;
use crate::schema::PublishedContentType;

use super::error::InfraError;
use super::memory::InMemoryBackend;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentArchive {
    pub content_types: Vec<PublishedContentType>,
    pub content: Vec<ContentRecord>,
    pub media: Vec<ContentRecord>,
    pub members: Vec<MemberRecord>,
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i32,
    pub key: Uuid,
    pub content_type: i32,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub template_id: Option<i32>,
    #[serde(default)]
    pub published: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated: Option<OffsetDateTime>,
    /// Invariant values by property alias.
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
    #[serde(default)]
    pub variants: Vec<VariantRecord>,
    #[serde(default)]
    pub cultures: Vec<CultureRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantRecord {
    pub alias: String,
    #[serde(default)]
    pub culture: String,
    #[serde(default)]
    pub segment: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CultureRecord {
    pub culture: String,
    pub name: String,
    #[serde(default)]
    pub url_segment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: i32,
    pub key: Uuid,
    pub content_type: i32,
    pub name: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub locked_out: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

/// What an archive put into a backend.
#[derive(Debug, Default)]
pub struct InstalledArchive {
    pub content: usize,
    pub media: usize,
    pub relations: usize,
    pub members: Vec<MemberEntity>,
}

impl InstalledArchive {
    pub fn member_by_id(&self, id: i32) -> Option<&MemberEntity> {
        self.members.iter().find(|member| member.id == id)
    }

    pub fn member_by_key(&self, key: Uuid) -> Option<&MemberEntity> {
        self.members.iter().find(|member| member.key == key)
    }
}

/// Read and validate an archive from disk.
pub fn load_archive(path: &Path) -> Result<ContentArchive, InfraError> {
    let data = fs::read_to_string(path)?;
    let archive: ContentArchive = toml::from_str(&data).map_err(|source| InfraError::ArchiveParse {
        path: path.to_path_buf(),
        source,
    })?;
    archive.validate()?;
    Ok(archive)
}

impl ContentArchive {
    /// Item ids are unique per kind and every item names a type of its kind.
    pub fn validate(&self) -> Result<(), InfraError> {
        let mut type_ids = HashSet::new();
        for content_type in &self.content_types {
            if !type_ids.insert((content_type.kind, content_type.id)) {
                return Err(InfraError::archive(format!(
                    "duplicate {} type id {}",
                    content_type.kind, content_type.id
                )));
            }
        }

        let records = [
            (ItemKind::Content, &self.content),
            (ItemKind::Media, &self.media),
        ];
        for (kind, records) in records {
            let mut ids = HashSet::new();
            for record in records {
                if !ids.insert(record.id) {
                    return Err(InfraError::archive(format!("duplicate {kind} id {}", record.id)));
                }
                ensure_type(&type_ids, kind, record.content_type, record.id)?;
            }
        }

        let mut member_ids = HashSet::new();
        for member in &self.members {
            if !member_ids.insert(member.id) {
                return Err(InfraError::archive(format!("duplicate member id {}", member.id)));
            }
            ensure_type(&type_ids, ItemKind::Member, member.content_type, member.id)?;
        }
        Ok(())
    }

    /// Register types, store item nodes, and record relations in `backend`.
    pub fn install(&self, backend: &InMemoryBackend) -> Result<InstalledArchive, InfraError> {
        self.validate()?;
        let factory = CacheNodeFactory;

        for content_type in &self.content_types {
            backend.insert_type(content_type.clone());
        }

        for record in &self.content {
            let entity = record.to_entity();
            backend
                .content
                .insert(factory.to_content_cache_node(&entity, true));
            if record.published {
                backend
                    .content
                    .insert(factory.to_content_cache_node(&entity, false));
            }
        }

        for record in &self.media {
            backend
                .media
                .insert(factory.to_media_cache_node(&record.to_entity()));
        }

        for relation in &self.relations {
            backend.relations.insert(relation.clone());
        }

        let installed = InstalledArchive {
            content: self.content.len(),
            media: self.media.len(),
            relations: self.relations.len(),
            members: self.members.iter().map(MemberRecord::to_entity).collect(),
        };
        info!(
            types = self.content_types.len(),
            content = installed.content,
            media = installed.media,
            members = installed.members.len(),
            relations = installed.relations,
            "Archive installed"
        );
        Ok(installed)
    }
}

fn ensure_type(
    type_ids: &HashSet<(ItemKind, i32)>,
    kind: ItemKind,
    type_id: i32,
    item_id: i32,
) -> Result<(), InfraError> {
    if type_ids.contains(&(kind, type_id)) {
        Ok(())
    } else {
        Err(InfraError::archive(format!(
            "{kind} {item_id} references unknown {kind} type {type_id}"
        )))
    }
}

impl ContentRecord {
    pub fn to_entity(&self) -> ContentEntity {
        let mut entity = ContentEntity::new(self.id, self.key, self.content_type, self.name.clone());
        if let Some(path) = &self.path {
            entity.path = path.clone();
        }
        if let Some(updated) = self.updated {
            entity.create_date = updated;
            entity.update_date = updated;
        }
        entity.sort_order = self.sort_order;
        entity.template_id = self.template_id;

        for (alias, value) in &self.values {
            entity.set_value(alias, "", "", value.clone(), None);
        }
        for variant in &self.variants {
            entity.set_value(
                &variant.alias,
                &variant.culture,
                &variant.segment,
                variant.value.clone(),
                None,
            );
        }
        entity.cultures = self
            .cultures
            .iter()
            .map(|culture| EntityCulture {
                culture: culture.culture.clone(),
                name: culture.name.clone(),
                published_name: None,
                url_segment: culture.url_segment.clone(),
                update_date: entity.update_date,
            })
            .collect();

        if self.published {
            entity.publish();
        }
        entity
    }
}

impl MemberRecord {
    pub fn to_entity(&self) -> MemberEntity {
        let mut member = MemberEntity::new(self.id, self.key, self.content_type, self.name.clone());
        member.email = self.email.clone();
        member.username = self.username.clone();
        member.comments = self.comments.clone();
        member.is_approved = self.approved;
        member.is_locked_out = self.locked_out;
        member.last_login_date = self.last_login;
        member.properties = self.values.clone();
        member
    }
}
