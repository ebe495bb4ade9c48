//! [`SqliteStore`], the SQLite implementation of [`TagStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use tagfuse_core::{
  history::{AliasPolicy, IgnoredMatch, TagAlias, TagMerge},
  store::{LegacyMetadata, MetadataSource, TagStore},
  tag::{ItemId, Tag, TagId, TagKind},
};

use crate::{
  encode::{
    ALIAS_COLUMNS, IGNORE_COLUMNS, MERGE_COLUMNS, RawAlias, RawIgnore, RawMerge,
    RawTag, TAG_COLUMNS, contains_pattern, decode_uuid, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A tag store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    debug!(path = %path.as_ref().display(), "opening tag store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert or replace the legacy tag lists of one item.
  pub async fn put_legacy_metadata(&self, record: LegacyMetadata) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO metadata (item_id, ai_tags, manual_tags)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![record.item_id, record.ai_tags, record.manual_tags],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_tags(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<Tag>> {
    let raws: Vec<RawTag> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawTag::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTag::into_tag).collect()
  }
}

/// Return the id of the tag matching `candidate`'s identity, inserting
/// `candidate` if there is none.
fn get_or_create_in(conn: &rusqlite::Connection, candidate: &Tag) -> rusqlite::Result<String> {
  let existing: Option<String> = conn
    .query_row(
      "SELECT tag_id FROM tags WHERE normalized_name = ?1 AND kind = ?2",
      rusqlite::params![candidate.normalized_name, candidate.kind.as_str()],
      |r| r.get(0),
    )
    .optional()?;

  if let Some(id) = existing {
    return Ok(id);
  }

  let id = encode_uuid(candidate.tag_id);
  conn.execute(
    "INSERT INTO tags (tag_id, name, normalized_name, kind, confidence, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      id,
      candidate.name,
      candidate.normalized_name,
      candidate.kind.as_str(),
      candidate.confidence,
      encode_dt(candidate.created_at),
    ],
  )?;
  Ok(id)
}

// ─── TagStore impl ───────────────────────────────────────────────────────────

impl TagStore for SqliteStore {
  type Error = Error;

  // ── Tags ──────────────────────────────────────────────────────────────────

  async fn get_or_create_tag(
    &self,
    name:       &str,
    kind:       TagKind,
    confidence: Option<f64>,
  ) -> Result<TagId> {
    let candidate = Tag::new(name, kind, confidence);

    let id_str = self
      .conn
      .call(move |conn| Ok(get_or_create_in(conn, &candidate)?))
      .await?;

    decode_uuid(&id_str)
  }

  async fn get_tag(&self, tag_id: TagId) -> Result<Option<Tag>> {
    let id_str = encode_uuid(tag_id);

    let raw: Option<RawTag> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {TAG_COLUMNS} FROM tags WHERE tag_id = ?1"),
            rusqlite::params![id_str],
            RawTag::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawTag::into_tag).transpose()
  }

  async fn list_tags(&self) -> Result<Vec<Tag>> {
    self
      .query_tags(
        format!("SELECT {TAG_COLUMNS} FROM tags ORDER BY created_at, tag_id"),
        vec![],
      )
      .await
  }

  async fn search_tags(&self, query: &str, limit: usize) -> Result<Vec<Tag>> {
    let pattern = contains_pattern(&tagfuse_core::normalize::normalize(query));
    self
      .query_tags(
        format!(
          "SELECT {TAG_COLUMNS} FROM tags
           WHERE normalized_name LIKE ?1 ESCAPE '\\'
           ORDER BY name LIMIT ?2"
        ),
        vec![pattern.into(), (limit as i64).into()],
      )
      .await
  }

  async fn find_tags_by_name(&self, name: &str) -> Result<Vec<Tag>> {
    self
      .query_tags(
        format!("SELECT {TAG_COLUMNS} FROM tags WHERE normalized_name = ?1 ORDER BY kind"),
        vec![tagfuse_core::normalize::normalize(name).into()],
      )
      .await
  }

  async fn delete_tag(&self, tag_id: TagId) -> Result<bool> {
    let id_str = encode_uuid(tag_id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM tags WHERE tag_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    Ok(removed > 0)
  }

  // ── Associations ──────────────────────────────────────────────────────────

  async fn add_tag_to_item(&self, item_id: &str, tag_id: TagId) -> Result<()> {
    let item_id = item_id.to_owned();
    let tag_str = encode_uuid(tag_id);
    let at_str  = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO item_tags (item_id, tag_id, added_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![item_id, tag_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove_tag_from_item(&self, item_id: &str, tag_id: TagId) -> Result<bool> {
    let item_id = item_id.to_owned();
    let tag_str = encode_uuid(tag_id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM item_tags WHERE item_id = ?1 AND tag_id = ?2",
          rusqlite::params![item_id, tag_str],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }

  async fn get_items_with_tag(&self, tag_id: TagId) -> Result<Vec<ItemId>> {
    let tag_str = encode_uuid(tag_id);

    let items = self
      .conn
      .call(move |conn| {
        let mut stmt = conn
          .prepare("SELECT item_id FROM item_tags WHERE tag_id = ?1 ORDER BY item_id")?;
        let rows = stmt
          .query_map(rusqlite::params![tag_str], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(items)
  }

  async fn get_tags_for_item(&self, item_id: &str) -> Result<Vec<Tag>> {
    self
      .query_tags(
        "SELECT t.tag_id, t.name, t.normalized_name, t.kind, t.confidence, t.created_at
         FROM tags t
         INNER JOIN item_tags it ON it.tag_id = t.tag_id
         WHERE it.item_id = ?1
         ORDER BY t.kind, t.name"
          .to_owned(),
        vec![item_id.to_owned().into()],
      )
      .await
  }

  async fn clear_tags_for_item(&self, item_id: &str) -> Result<()> {
    let item_id = item_id.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM item_tags WHERE item_id = ?1", rusqlite::params![item_id])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Merge history ─────────────────────────────────────────────────────────

  async fn append_merge(&self, record: TagMerge) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        insert_merge(conn, &record)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn merge_history(&self, target: Option<TagId>) -> Result<Vec<TagMerge>> {
    let target_str = target.map(encode_uuid);

    let raws: Vec<RawMerge> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MERGE_COLUMNS} FROM tag_merges
           WHERE (?1 IS NULL OR target_tag_id = ?1)
           ORDER BY merged_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![target_str], RawMerge::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMerge::into_merge).collect()
  }

  // ── Aliases ───────────────────────────────────────────────────────────────

  async fn insert_alias(&self, alias: TagAlias) -> Result<()> {
    let id_str     = encode_uuid(alias.alias_id);
    let target_str = encode_uuid(alias.target_tag_id);
    let at_str     = encode_dt(alias.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tag_aliases (alias_id, alias_name, target_tag_id, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, alias.alias_name, target_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_alias(&self, alias_name: &str) -> Result<Option<TagAlias>> {
    let name = alias_name.to_owned();

    let raw: Option<RawAlias> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ALIAS_COLUMNS} FROM tag_aliases WHERE alias_name = ?1"),
            rusqlite::params![name],
            RawAlias::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAlias::into_alias).transpose()
  }

  async fn list_aliases(&self, target: Option<TagId>) -> Result<Vec<TagAlias>> {
    let target_str = target.map(encode_uuid);

    let raws: Vec<RawAlias> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ALIAS_COLUMNS} FROM tag_aliases
           WHERE (?1 IS NULL OR target_tag_id = ?1)
           ORDER BY alias_name"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![target_str], RawAlias::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAlias::into_alias).collect()
  }

  async fn delete_alias(&self, alias_name: &str) -> Result<bool> {
    let name = alias_name.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM tag_aliases WHERE alias_name = ?1",
          rusqlite::params![name],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }

  async fn redirect_aliases(&self, from: TagId, to: TagId) -> Result<usize> {
    let from_str = encode_uuid(from);
    let to_str   = encode_uuid(to);

    let count = self
      .conn
      .call(move |conn| Ok(redirect_aliases_in(conn, &from_str, &to_str)?))
      .await?;

    Ok(count)
  }

  // ── Ignored matches ───────────────────────────────────────────────────────

  async fn ignore_match(&self, a: TagId, b: TagId) -> Result<IgnoredMatch> {
    let (a, b)  = if a <= b { (a, b) } else { (b, a) };
    let id_str  = encode_uuid(Uuid::new_v4());
    let a_str   = encode_uuid(a);
    let b_str   = encode_uuid(b);
    let at_str  = encode_dt(Utc::now());

    let raw: RawIgnore = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO tag_ignore_matches (ignore_id, tag_id_a, tag_id_b, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, a_str, b_str, at_str],
        )?;
        Ok(conn.query_row(
          &format!(
            "SELECT {IGNORE_COLUMNS} FROM tag_ignore_matches
             WHERE tag_id_a = ?1 AND tag_id_b = ?2"
          ),
          rusqlite::params![a_str, b_str],
          RawIgnore::from_row,
        )?)
      })
      .await?;

    raw.into_ignored()
  }

  async fn ignored_matches(&self) -> Result<Vec<IgnoredMatch>> {
    let raws: Vec<RawIgnore> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {IGNORE_COLUMNS} FROM tag_ignore_matches ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map([], RawIgnore::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIgnore::into_ignored).collect()
  }

  // ── Composite operations ──────────────────────────────────────────────────

  /// Runs every step in one transaction: the source is either fully absorbed
  /// or left untouched. Nothing changes unless both tags exist.
  async fn absorb_tag(
    &self,
    target:    TagId,
    source:    TagId,
    merged_by: Option<String>,
    policy:    AliasPolicy,
  ) -> Result<Option<TagMerge>> {
    let merge_id   = Uuid::new_v4();
    let merged_at  = Utc::now();
    let target_str = encode_uuid(target);
    let source_str = encode_uuid(source);
    let by         = merged_by.clone();

    let source_name: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let target_exists = tx
          .query_row(
            "SELECT 1 FROM tags WHERE tag_id = ?1",
            rusqlite::params![target_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !target_exists {
          return Ok(None);
        }

        let name: Option<String> = tx
          .query_row(
            "SELECT name FROM tags WHERE tag_id = ?1",
            rusqlite::params![source_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(name) = name else {
          return Ok(None);
        };

        tx.execute(
          "INSERT OR IGNORE INTO item_tags (item_id, tag_id, added_at)
           SELECT item_id, ?1, ?2 FROM item_tags WHERE tag_id = ?3",
          rusqlite::params![target_str, encode_dt(merged_at), source_str],
        )?;

        insert_merge(&tx, &TagMerge {
          merge_id,
          target_tag_id: target,
          source_tag_id: source,
          source_tag_name: Some(name.clone()),
          merged_at,
          merged_by: by,
        })?;

        if policy == AliasPolicy::Redirect {
          redirect_aliases_in(&tx, &source_str, &target_str)?;
        }

        tx.execute("DELETE FROM tags WHERE tag_id = ?1", rusqlite::params![source_str])?;
        tx.commit()?;
        Ok(Some(name))
      })
      .await?;

    Ok(source_name.map(|name| TagMerge {
      merge_id,
      target_tag_id: target,
      source_tag_id: source,
      source_tag_name: Some(name),
      merged_at,
      merged_by,
    }))
  }

  /// Clears and re-tags the item in one transaction.
  async fn replace_item_tags(
    &self,
    item_id: &str,
    tags:    Vec<(String, TagKind)>,
  ) -> Result<()> {
    let item_id    = item_id.to_owned();
    let at_str     = encode_dt(Utc::now());
    let candidates: Vec<Tag> = tags
      .iter()
      .map(|(name, kind)| Tag::new(name, *kind, None))
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM item_tags WHERE item_id = ?1", rusqlite::params![item_id])?;
        for candidate in &candidates {
          let tag_id = get_or_create_in(&tx, candidate)?;
          tx.execute(
            "INSERT OR IGNORE INTO item_tags (item_id, tag_id, added_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![item_id, tag_id, at_str],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn insert_merge(conn: &rusqlite::Connection, record: &TagMerge) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO tag_merges (
       merge_id, target_tag_id, source_tag_id, source_tag_name, merged_at, merged_by
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      encode_uuid(record.merge_id),
      encode_uuid(record.target_tag_id),
      encode_uuid(record.source_tag_id),
      record.source_tag_name,
      encode_dt(record.merged_at),
      record.merged_by,
    ],
  )?;
  Ok(())
}

fn redirect_aliases_in(
  conn: &rusqlite::Connection,
  from: &str,
  to:   &str,
) -> rusqlite::Result<usize> {
  conn.execute(
    "UPDATE tag_aliases SET target_tag_id = ?1 WHERE target_tag_id = ?2",
    rusqlite::params![to, from],
  )
}

// ─── MetadataSource impl ─────────────────────────────────────────────────────

impl MetadataSource for SqliteStore {
  type Error = Error;

  async fn legacy_metadata(&self) -> Result<Vec<LegacyMetadata>> {
    let rows = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare("SELECT item_id, ai_tags, manual_tags FROM metadata ORDER BY item_id")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(LegacyMetadata {
              item_id:     row.get(0)?,
              ai_tags:     row.get(1)?,
              manual_tags: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(rows)
  }
}
