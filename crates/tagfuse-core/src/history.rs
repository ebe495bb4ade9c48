//! Merge audit records and aliases.
//!
//! Merge records are append-only: one per absorbed source tag, never updated
//! or deleted. Aliases are created by users and only ever re-pointed by a
//! merge under [`AliasPolicy::Redirect`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tag::TagId;

// ─── Merge history ───────────────────────────────────────────────────────────

/// Records that `source_tag_id` was absorbed into `target_tag_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMerge {
  pub merge_id:        Uuid,
  pub target_tag_id:   TagId,
  pub source_tag_id:   TagId,
  /// Display name of the source at merge time; the tag itself is gone.
  pub source_tag_name: Option<String>,
  pub merged_at:       DateTime<Utc>,
  /// Actor identity, if the caller supplied one.
  pub merged_by:       Option<String>,
}

// ─── Aliases ─────────────────────────────────────────────────────────────────

/// A user-defined alternate name resolving to a tag.
///
/// `alias_name` is normalized and unique across all aliases. The target is
/// not guaranteed to exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAlias {
  pub alias_id:      Uuid,
  pub alias_name:    String,
  pub target_tag_id: TagId,
  pub created_at:    DateTime<Utc>,
}

/// What happens to aliases pointing at a tag absorbed by a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasPolicy {
  /// Re-point them at the merge target.
  #[default]
  Redirect,
  /// Leave them pointing at the deleted tag; lookups then find nothing.
  Orphan,
}

// ─── Ignored matches ─────────────────────────────────────────────────────────

/// A reviewer's decision that two tags are not duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoredMatch {
  pub ignore_id:  Uuid,
  pub tag_id_a:   TagId,
  pub tag_id_b:   TagId,
  pub created_at: DateTime<Utc>,
}
