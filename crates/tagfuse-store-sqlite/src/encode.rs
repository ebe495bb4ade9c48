//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings with fixed microsecond precision so that
//! text order matches time order. UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use tagfuse_core::{
  history::{IgnoredMatch, TagAlias, TagMerge},
  tag::{Tag, TagKind},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── TagKind ──────────────────────────────────────────────────────────────────

pub fn decode_kind(s: &str) -> Result<TagKind> {
  TagKind::from_str_opt(s).ok_or_else(|| Error::UnknownKind(s.to_owned()))
}

// ─── LIKE patterns ────────────────────────────────────────────────────────────

/// `%query%` with `\` escaping LIKE wildcards in `query`.
pub fn contains_pattern(query: &str) -> String {
  let mut out = String::with_capacity(query.len() + 2);
  out.push('%');
  for c in query.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const TAG_COLUMNS: &str =
  "tag_id, name, normalized_name, kind, confidence, created_at";

/// Raw values read directly from a `tags` row selected with [`TAG_COLUMNS`].
pub struct RawTag {
  pub tag_id:          String,
  pub name:            String,
  pub normalized_name: String,
  pub kind:            String,
  pub confidence:      Option<f64>,
  pub created_at:      String,
}

impl RawTag {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      tag_id:          row.get(0)?,
      name:            row.get(1)?,
      normalized_name: row.get(2)?,
      kind:            row.get(3)?,
      confidence:      row.get(4)?,
      created_at:      row.get(5)?,
    })
  }

  pub fn into_tag(self) -> Result<Tag> {
    Ok(Tag {
      tag_id:          decode_uuid(&self.tag_id)?,
      name:            self.name,
      normalized_name: self.normalized_name,
      kind:            decode_kind(&self.kind)?,
      confidence:      self.confidence,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

pub const MERGE_COLUMNS: &str =
  "merge_id, target_tag_id, source_tag_id, source_tag_name, merged_at, merged_by";

/// Raw values read directly from a `tag_merges` row.
pub struct RawMerge {
  pub merge_id:        String,
  pub target_tag_id:   String,
  pub source_tag_id:   String,
  pub source_tag_name: Option<String>,
  pub merged_at:       String,
  pub merged_by:       Option<String>,
}

impl RawMerge {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      merge_id:        row.get(0)?,
      target_tag_id:   row.get(1)?,
      source_tag_id:   row.get(2)?,
      source_tag_name: row.get(3)?,
      merged_at:       row.get(4)?,
      merged_by:       row.get(5)?,
    })
  }

  pub fn into_merge(self) -> Result<TagMerge> {
    Ok(TagMerge {
      merge_id:        decode_uuid(&self.merge_id)?,
      target_tag_id:   decode_uuid(&self.target_tag_id)?,
      source_tag_id:   decode_uuid(&self.source_tag_id)?,
      source_tag_name: self.source_tag_name,
      merged_at:       decode_dt(&self.merged_at)?,
      merged_by:       self.merged_by,
    })
  }
}

pub const ALIAS_COLUMNS: &str = "alias_id, alias_name, target_tag_id, created_at";

/// Raw values read directly from a `tag_aliases` row.
pub struct RawAlias {
  pub alias_id:      String,
  pub alias_name:    String,
  pub target_tag_id: String,
  pub created_at:    String,
}

impl RawAlias {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alias_id:      row.get(0)?,
      alias_name:    row.get(1)?,
      target_tag_id: row.get(2)?,
      created_at:    row.get(3)?,
    })
  }

  pub fn into_alias(self) -> Result<TagAlias> {
    Ok(TagAlias {
      alias_id:      decode_uuid(&self.alias_id)?,
      alias_name:    self.alias_name,
      target_tag_id: decode_uuid(&self.target_tag_id)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const IGNORE_COLUMNS: &str = "ignore_id, tag_id_a, tag_id_b, created_at";

/// Raw values read directly from a `tag_ignore_matches` row.
pub struct RawIgnore {
  pub ignore_id:  String,
  pub tag_id_a:   String,
  pub tag_id_b:   String,
  pub created_at: String,
}

impl RawIgnore {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      ignore_id:  row.get(0)?,
      tag_id_a:   row.get(1)?,
      tag_id_b:   row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_ignored(self) -> Result<IgnoredMatch> {
    Ok(IgnoredMatch {
      ignore_id:  decode_uuid(&self.ignore_id)?,
      tag_id_a:   decode_uuid(&self.tag_id_a)?,
      tag_id_b:   decode_uuid(&self.tag_id_b)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
