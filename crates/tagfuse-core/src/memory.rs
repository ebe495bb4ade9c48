//! In-memory [`TagStore`] used by this crate's tests.
//!
//! Relies on the trait's default (non-atomic) composite operations.

use std::{
  collections::{BTreeMap, BTreeSet, HashSet},
  sync::Mutex,
};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  history::{IgnoredMatch, TagAlias, TagMerge},
  normalize::normalize,
  store::{LegacyMetadata, MetadataSource, TagStore},
  tag::{ItemId, Tag, TagId, TagKind},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("injected failure deleting tag {0}")]
  Injected(TagId),
  #[error("duplicate alias {0:?}")]
  DuplicateAlias(String),
}

#[derive(Default)]
struct Inner {
  tags:        Vec<Tag>,
  item_tags:   BTreeSet<(ItemId, TagId)>,
  merges:      Vec<TagMerge>,
  aliases:     BTreeMap<String, TagAlias>,
  ignored:     Vec<IgnoredMatch>,
  metadata:    Vec<LegacyMetadata>,
  fail_delete: HashSet<TagId>,
}

#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn push_metadata(&self, record: LegacyMetadata) { self.lock().metadata.push(record); }

  /// Make every later `delete_tag(tag_id)` fail.
  pub fn fail_deletes_of(&self, tag_id: TagId) { self.lock().fail_delete.insert(tag_id); }
}

impl TagStore for MemoryStore {
  type Error = MemoryError;

  async fn get_or_create_tag(
    &self,
    name: &str,
    kind: TagKind,
    confidence: Option<f64>,
  ) -> Result<TagId, MemoryError> {
    let mut inner = self.lock();
    let key = normalize(name);
    if let Some(t) = inner.tags.iter().find(|t| t.normalized_name == key && t.kind == kind) {
      return Ok(t.tag_id);
    }
    let tag = Tag::new(name, kind, confidence);
    let id = tag.tag_id;
    inner.tags.push(tag);
    Ok(id)
  }

  async fn get_tag(&self, tag_id: TagId) -> Result<Option<Tag>, MemoryError> {
    Ok(self.lock().tags.iter().find(|t| t.tag_id == tag_id).cloned())
  }

  async fn list_tags(&self) -> Result<Vec<Tag>, MemoryError> {
    let mut tags = self.lock().tags.clone();
    crate::tag::sort_for_grouping(&mut tags);
    Ok(tags)
  }

  async fn search_tags(&self, query: &str, limit: usize) -> Result<Vec<Tag>, MemoryError> {
    let query = normalize(query);
    let mut tags: Vec<Tag> = self
      .lock()
      .tags
      .iter()
      .filter(|t| t.normalized_name.contains(&query))
      .cloned()
      .collect();
    tags.sort_by(|a, b| a.name.cmp(&b.name));
    tags.truncate(limit);
    Ok(tags)
  }

  async fn find_tags_by_name(&self, name: &str) -> Result<Vec<Tag>, MemoryError> {
    let wanted = normalize(name);
    let mut tags: Vec<Tag> = self
      .lock()
      .tags
      .iter()
      .filter(|t| t.normalized_name == wanted)
      .cloned()
      .collect();
    tags.sort_by_key(|t| t.kind.as_str());
    Ok(tags)
  }

  async fn delete_tag(&self, tag_id: TagId) -> Result<bool, MemoryError> {
    let mut inner = self.lock();
    if inner.fail_delete.contains(&tag_id) {
      return Err(MemoryError::Injected(tag_id));
    }
    let before = inner.tags.len();
    inner.tags.retain(|t| t.tag_id != tag_id);
    inner.item_tags.retain(|(_, t)| *t != tag_id);
    Ok(inner.tags.len() != before)
  }

  async fn add_tag_to_item(&self, item_id: &str, tag_id: TagId) -> Result<(), MemoryError> {
    self.lock().item_tags.insert((item_id.to_owned(), tag_id));
    Ok(())
  }

  async fn remove_tag_from_item(&self, item_id: &str, tag_id: TagId) -> Result<bool, MemoryError> {
    Ok(self.lock().item_tags.remove(&(item_id.to_owned(), tag_id)))
  }

  async fn get_items_with_tag(&self, tag_id: TagId) -> Result<Vec<ItemId>, MemoryError> {
    Ok(
      self
        .lock()
        .item_tags
        .iter()
        .filter(|(_, t)| *t == tag_id)
        .map(|(i, _)| i.clone())
        .collect(),
    )
  }

  async fn get_tags_for_item(&self, item_id: &str) -> Result<Vec<Tag>, MemoryError> {
    let inner = self.lock();
    let mut tags: Vec<Tag> = inner
      .tags
      .iter()
      .filter(|t| inner.item_tags.contains(&(item_id.to_owned(), t.tag_id)))
      .cloned()
      .collect();
    tags.sort_by(|a, b| (a.kind.as_str(), &a.name).cmp(&(b.kind.as_str(), &b.name)));
    Ok(tags)
  }

  async fn clear_tags_for_item(&self, item_id: &str) -> Result<(), MemoryError> {
    self.lock().item_tags.retain(|(i, _)| i != item_id);
    Ok(())
  }

  async fn append_merge(&self, record: TagMerge) -> Result<(), MemoryError> {
    self.lock().merges.push(record);
    Ok(())
  }

  async fn merge_history(&self, target: Option<TagId>) -> Result<Vec<TagMerge>, MemoryError> {
    Ok(
      self
        .lock()
        .merges
        .iter()
        .rev()
        .filter(|m| target.is_none_or(|t| m.target_tag_id == t))
        .cloned()
        .collect(),
    )
  }

  async fn insert_alias(&self, alias: TagAlias) -> Result<(), MemoryError> {
    let mut inner = self.lock();
    if inner.aliases.contains_key(&alias.alias_name) {
      return Err(MemoryError::DuplicateAlias(alias.alias_name));
    }
    inner.aliases.insert(alias.alias_name.clone(), alias);
    Ok(())
  }

  async fn find_alias(&self, alias_name: &str) -> Result<Option<TagAlias>, MemoryError> {
    Ok(self.lock().aliases.get(alias_name).cloned())
  }

  async fn list_aliases(&self, target: Option<TagId>) -> Result<Vec<TagAlias>, MemoryError> {
    Ok(
      self
        .lock()
        .aliases
        .values()
        .filter(|a| target.is_none_or(|t| a.target_tag_id == t))
        .cloned()
        .collect(),
    )
  }

  async fn delete_alias(&self, alias_name: &str) -> Result<bool, MemoryError> {
    Ok(self.lock().aliases.remove(alias_name).is_some())
  }

  async fn redirect_aliases(&self, from: TagId, to: TagId) -> Result<usize, MemoryError> {
    let mut count = 0;
    for alias in self.lock().aliases.values_mut() {
      if alias.target_tag_id == from {
        alias.target_tag_id = to;
        count += 1;
      }
    }
    Ok(count)
  }

  async fn ignore_match(&self, a: TagId, b: TagId) -> Result<IgnoredMatch, MemoryError> {
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    let mut inner = self.lock();
    if let Some(m) = inner.ignored.iter().find(|m| m.tag_id_a == a && m.tag_id_b == b) {
      return Ok(m.clone());
    }
    let m = IgnoredMatch {
      ignore_id:  Uuid::new_v4(),
      tag_id_a:   a,
      tag_id_b:   b,
      created_at: Utc::now(),
    };
    inner.ignored.push(m.clone());
    Ok(m)
  }

  async fn ignored_matches(&self) -> Result<Vec<IgnoredMatch>, MemoryError> {
    Ok(self.lock().ignored.clone())
  }
}

impl MetadataSource for MemoryStore {
  type Error = MemoryError;

  async fn legacy_metadata(&self) -> Result<Vec<LegacyMetadata>, MemoryError> {
    Ok(self.lock().metadata.clone())
  }
}
