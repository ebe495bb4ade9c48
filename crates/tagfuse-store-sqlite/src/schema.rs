//! SQL schema for the tagfuse SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- At most one tag per canonical text per kind.
CREATE TABLE IF NOT EXISTS tags (
    tag_id          TEXT PRIMARY KEY,
    name            TEXT NOT NULL,   -- display form
    normalized_name TEXT NOT NULL CHECK (normalized_name != ''),  -- lower-cased, trimmed
    kind            TEXT NOT NULL CHECK (kind IN ('ai', 'manual', 'ai_detailed')),
    confidence      REAL,            -- AI kinds only, within [0, 1]
    created_at      TEXT NOT NULL,
    UNIQUE (normalized_name, kind)
);

CREATE TABLE IF NOT EXISTS item_tags (
    item_id  TEXT NOT NULL,
    tag_id   TEXT NOT NULL REFERENCES tags(tag_id) ON DELETE CASCADE,
    added_at TEXT NOT NULL,
    PRIMARY KEY (item_id, tag_id)
);

-- Merge audit trail; strictly append-only.
-- No UPDATE or DELETE is ever issued against this table, and it carries no
-- foreign keys so records outlive both tags.
CREATE TABLE IF NOT EXISTS tag_merges (
    merge_id        TEXT PRIMARY KEY,
    target_tag_id   TEXT NOT NULL,
    source_tag_id   TEXT NOT NULL,
    source_tag_name TEXT,
    merged_at       TEXT NOT NULL,
    merged_by       TEXT,
    CHECK (target_tag_id != source_tag_id)
);

-- No foreign key: an alias may outlive its target.
CREATE TABLE IF NOT EXISTS tag_aliases (
    alias_id      TEXT PRIMARY KEY,
    alias_name    TEXT NOT NULL UNIQUE,   -- normalized
    target_tag_id TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

-- Pairs a reviewer declared not to be duplicates; tag_id_a < tag_id_b.
CREATE TABLE IF NOT EXISTS tag_ignore_matches (
    ignore_id  TEXT PRIMARY KEY,
    tag_id_a   TEXT NOT NULL REFERENCES tags(tag_id) ON DELETE CASCADE,
    tag_id_b   TEXT NOT NULL REFERENCES tags(tag_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (tag_id_a, tag_id_b)
);

-- Legacy per-item tag lists (JSON-encoded string arrays).
CREATE TABLE IF NOT EXISTS metadata (
    item_id     TEXT PRIMARY KEY,
    ai_tags     TEXT,
    manual_tags TEXT
);

CREATE INDEX IF NOT EXISTS tags_created_idx        ON tags(created_at, tag_id);
CREATE INDEX IF NOT EXISTS item_tags_tag_idx       ON item_tags(tag_id);
CREATE INDEX IF NOT EXISTS tag_merges_target_idx   ON tag_merges(target_tag_id);
CREATE INDEX IF NOT EXISTS tag_merges_merged_idx   ON tag_merges(merged_at);
CREATE INDEX IF NOT EXISTS tag_aliases_target_idx  ON tag_aliases(target_tag_id);

PRAGMA user_version = 1;
";
