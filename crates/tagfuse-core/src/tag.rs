//! Tag types: the canonical vocabulary entries attached to library items.
//!
//! A tag's identity is the pair `(normalized_name, kind)`: at most one tag
//! exists per canonical text per kind. The display `name` keeps the casing of
//! whichever spelling created the tag first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::normalize;

/// Identifier of a [`Tag`].
pub type TagId = Uuid;

/// Identifier of a library item. Items are owned by the surrounding library;
/// the tag store only ever sees their opaque ids.
pub type ItemId = String;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Who produced a tag.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
  /// Short label from an AI tagger.
  Ai,
  /// Typed in by the user.
  Manual,
  /// AI label carrying a confidence score.
  AiDetailed,
}

impl TagKind {
  /// The discriminant string stored in the `kind` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Ai => "ai",
      Self::Manual => "manual",
      Self::AiDetailed => "ai_detailed",
    }
  }

  pub fn from_str_opt(s: &str) -> Option<Self> {
    match s {
      "ai" => Some(Self::Ai),
      "manual" => Some(Self::Manual),
      "ai_detailed" => Some(Self::AiDetailed),
      _ => None,
    }
  }

  /// Whether tags of this kind carry a confidence score.
  pub fn is_ai(self) -> bool { matches!(self, Self::Ai | Self::AiDetailed) }
}

impl std::fmt::Display for TagKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Tag ─────────────────────────────────────────────────────────────────────

/// A canonical tag record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
  pub tag_id:          TagId,
  /// Display form, as first spelled.
  pub name:            String,
  /// Lower-cased, trimmed form used for identity.
  pub normalized_name: String,
  pub kind:            TagKind,
  /// Only meaningful for AI kinds; always within `[0, 1]`.
  pub confidence:      Option<f64>,
  pub created_at:      DateTime<Utc>,
}

impl Tag {
  /// Build a fresh tag with a new id, stamped now. The confidence is passed
  /// through [`sanitize_confidence`].
  pub fn new(name: &str, kind: TagKind, confidence: Option<f64>) -> Self {
    Self {
      tag_id: Uuid::new_v4(),
      name: name.trim().to_owned(),
      normalized_name: normalize(name),
      kind,
      confidence: sanitize_confidence(kind, confidence),
      created_at: Utc::now(),
    }
  }
}

/// Drop confidence for non-AI kinds and for non-finite values; clamp the rest
/// into `[0, 1]`.
pub fn sanitize_confidence(kind: TagKind, confidence: Option<f64>) -> Option<f64> {
  confidence
    .filter(|_| kind.is_ai())
    .filter(|c| c.is_finite())
    .map(|c| c.clamp(0.0, 1.0))
}

/// Sort tags into the deterministic order the duplicate grouper expects:
/// ascending creation time, then id.
pub fn sort_for_grouping(tags: &mut [Tag]) {
  tags.sort_by(|a, b| {
    a.created_at
      .cmp(&b.created_at)
      .then_with(|| a.tag_id.cmp(&b.tag_id))
  });
}
