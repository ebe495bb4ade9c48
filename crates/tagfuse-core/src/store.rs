//! The `TagStore` trait and the legacy metadata input.
//!
//! The trait is implemented by storage backends (e.g. `tagfuse-store-sqlite`).
//! The engines in this crate depend on this abstraction, not on any concrete
//! backend, and never interpret backend failures.

use std::future::Future;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  history::{AliasPolicy, IgnoredMatch, TagAlias, TagMerge},
  tag::{ItemId, Tag, TagId, TagKind},
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Durable storage for tags, item/tag associations, merge history, aliases
/// and ignored matches.
///
/// Backends are expected to be single-writer consistent. Callers must not run
/// overlapping merges or alias writes concurrently.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait TagStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Tags ──────────────────────────────────────────────────────────────

  /// Return the id of the tag identified by `(normalize(name), kind)`,
  /// creating it first if absent. Idempotent.
  fn get_or_create_tag<'a>(
    &'a self,
    name: &'a str,
    kind: TagKind,
    confidence: Option<f64>,
  ) -> impl Future<Output = Result<TagId, Self::Error>> + Send + 'a;

  /// Retrieve a tag by id. Returns `None` if not found.
  fn get_tag(
    &self,
    tag_id: TagId,
  ) -> impl Future<Output = Result<Option<Tag>, Self::Error>> + Send + '_;

  /// All tags, ascending by creation time then id.
  fn list_tags(
    &self,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  /// Tags whose normalized name contains `query` (normalized), by name.
  fn search_tags<'a>(
    &'a self,
    query: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + 'a;

  /// Every tag whose normalized name equals `normalize(name)`, one per kind
  /// at most, ordered by kind.
  fn find_tags_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + 'a;

  /// Remove a tag and, by cascade, all of its item associations. Returns
  /// whether a tag was removed.
  fn delete_tag(
    &self,
    tag_id: TagId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Associations ──────────────────────────────────────────────────────

  /// Associate a tag with an item. Idempotent.
  fn add_tag_to_item<'a>(
    &'a self,
    item_id: &'a str,
    tag_id: TagId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Returns whether an association was removed.
  fn remove_tag_from_item<'a>(
    &'a self,
    item_id: &'a str,
    tag_id: TagId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn get_items_with_tag(
    &self,
    tag_id: TagId,
  ) -> impl Future<Output = Result<Vec<ItemId>, Self::Error>> + Send + '_;

  /// Tags on an item, by kind then name.
  fn get_tags_for_item<'a>(
    &'a self,
    item_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + 'a;

  fn clear_tags_for_item<'a>(
    &'a self,
    item_id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Merge history ─────────────────────────────────────────────────────

  /// Append a merge record. Records are never updated or deleted.
  fn append_merge(
    &self,
    record: TagMerge,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Merge records, newest first, optionally restricted to one target.
  fn merge_history(
    &self,
    target: Option<TagId>,
  ) -> impl Future<Output = Result<Vec<TagMerge>, Self::Error>> + Send + '_;

  // ── Aliases ───────────────────────────────────────────────────────────

  /// Persist an alias. `alias.alias_name` is already normalized.
  fn insert_alias(
    &self,
    alias: TagAlias,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Look up an alias by its normalized name.
  fn find_alias<'a>(
    &'a self,
    alias_name: &'a str,
  ) -> impl Future<Output = Result<Option<TagAlias>, Self::Error>> + Send + 'a;

  /// Aliases by name, optionally restricted to one target.
  fn list_aliases(
    &self,
    target: Option<TagId>,
  ) -> impl Future<Output = Result<Vec<TagAlias>, Self::Error>> + Send + '_;

  /// Returns whether an alias was removed.
  fn delete_alias<'a>(
    &'a self,
    alias_name: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Re-point every alias targeting `from` at `to`. Returns the count.
  fn redirect_aliases(
    &self,
    from: TagId,
    to: TagId,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Ignored matches ───────────────────────────────────────────────────

  /// Record that `a` and `b` are not duplicates. Idempotent per pair,
  /// regardless of order.
  fn ignore_match(
    &self,
    a: TagId,
    b: TagId,
  ) -> impl Future<Output = Result<IgnoredMatch, Self::Error>> + Send + '_;

  fn ignored_matches(
    &self,
  ) -> impl Future<Output = Result<Vec<IgnoredMatch>, Self::Error>> + Send + '_;

  // ── Composite operations ──────────────────────────────────────────────

  /// Absorb `source` into `target`: tag every item carrying `source` with
  /// `target`, append a [`TagMerge`], apply `policy` to aliases of `source`,
  /// and delete `source`. Returns `None`, changing nothing, if either
  /// `target` or `source` does not exist.
  ///
  /// The default implementation issues the primitive operations one by one
  /// and is **not atomic**: a failure part-way leaves the earlier steps
  /// applied (items may carry both tags, or a record may exist for a source
  /// that was not deleted). Backends with transactions should override it.
  fn absorb_tag(
    &self,
    target: TagId,
    source: TagId,
    merged_by: Option<String>,
    policy: AliasPolicy,
  ) -> impl Future<Output = Result<Option<TagMerge>, Self::Error>> + Send + '_ {
    async move {
      if self.get_tag(target).await?.is_none() {
        return Ok(None);
      }
      let Some(source_tag) = self.get_tag(source).await? else {
        return Ok(None);
      };

      for item_id in self.get_items_with_tag(source).await? {
        self.add_tag_to_item(&item_id, target).await?;
      }

      let record = TagMerge {
        merge_id: Uuid::new_v4(),
        target_tag_id: target,
        source_tag_id: source,
        source_tag_name: Some(source_tag.name),
        merged_at: Utc::now(),
        merged_by,
      };
      self.append_merge(record.clone()).await?;

      if policy == AliasPolicy::Redirect {
        self.redirect_aliases(source, target).await?;
      }

      self.delete_tag(source).await?;
      Ok(Some(record))
    }
  }

  /// Replace every association of `item_id` with the given `(name, kind)`
  /// tags, creating tags as needed.
  ///
  /// The default implementation is **not atomic**: a failure part-way leaves
  /// the item with a partial tag set.
  fn replace_item_tags<'a>(
    &'a self,
    item_id: &'a str,
    tags: Vec<(String, TagKind)>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a {
    async move {
      self.clear_tags_for_item(item_id).await?;
      for (name, kind) in &tags {
        let tag_id = self.get_or_create_tag(name, *kind, None).await?;
        self.add_tag_to_item(item_id, tag_id).await?;
      }
      Ok(())
    }
  }
}

// ─── Legacy metadata ─────────────────────────────────────────────────────────

/// A per-item tag record from the pre-relational metadata layout.
///
/// Both lists are JSON-encoded string arrays and may be missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyMetadata {
  pub item_id:     ItemId,
  pub ai_tags:     Option<String>,
  pub manual_tags: Option<String>,
}

/// A source of [`LegacyMetadata`] records.
pub trait MetadataSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn legacy_metadata(
    &self,
  ) -> impl Future<Output = Result<Vec<LegacyMetadata>, Self::Error>> + Send + '_;
}
