//! Pairwise duplicate classification.
//!
//! Two tags are probable duplicates when their simple names are equal, close
//! in edit distance, or when their word sets mostly overlap. The relation is
//! not transitive, and the length rule looks only at the first argument.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
  normalize::{StopWords, simple_name, tokenize},
  tag::Tag,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Thresholds and stop words used by [`classify_pair`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
  /// Edits always tolerated.
  pub max_edits:         usize,
  /// Edits tolerated when the root's simple name is longer than
  /// `long_name_len` characters.
  pub max_edits_long:    usize,
  pub long_name_len:     usize,
  /// Minimum token Jaccard similarity for a word-set match.
  pub jaccard_threshold: f64,
  pub stop_words:        StopWords,
}

impl Default for MatchConfig {
  fn default() -> Self {
    Self {
      max_edits:         1,
      max_edits_long:    2,
      long_name_len:     5,
      jaccard_threshold: 0.8,
      stop_words:        StopWords::default(),
    }
  }
}

/// Named threshold bundles offered to reviewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
  Strict,
  #[default]
  Balanced,
  Aggressive,
}

impl Preset {
  pub fn config(self) -> MatchConfig {
    let base = MatchConfig::default();
    match self {
      Self::Strict => MatchConfig {
        max_edits_long: 1,
        jaccard_threshold: 0.9,
        ..base
      },
      Self::Balanced => base,
      Self::Aggressive => MatchConfig {
        max_edits_long: 3,
        jaccard_threshold: 0.6,
        ..base
      },
    }
  }
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

/// Levenshtein edit distance between `a` and `b`, counted in characters.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();

  // matrix[i][j] = distance between a[..i] and b[..j]
  let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];
  for (i, row) in matrix.iter_mut().enumerate() {
    row[0] = i;
  }
  for j in 0..=b.len() {
    matrix[0][j] = j;
  }

  for i in 1..=a.len() {
    for j in 1..=b.len() {
      matrix[i][j] = if a[i - 1] == b[j - 1] {
        matrix[i - 1][j - 1]
      } else {
        1 + matrix[i - 1][j - 1]
          .min(matrix[i][j - 1])
          .min(matrix[i - 1][j])
      };
    }
  }

  matrix[a.len()][b.len()]
}

/// `|A ∩ B| / |A ∪ B|`, or `0.0` when either set is empty.
pub fn token_jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
  if a.is_empty() || b.is_empty() {
    return 0.0;
  }
  let intersection = a.intersection(b).count();
  let union = a.len() + b.len() - intersection;
  intersection as f64 / union as f64
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Whether `candidate` looks like a duplicate of `root`, by display name.
pub fn names_match(root: &str, candidate: &str, config: &MatchConfig) -> bool {
  let simple_root = simple_name(root);
  let simple_candidate = simple_name(candidate);

  if simple_root == simple_candidate {
    return true;
  }

  let distance = levenshtein_distance(&simple_root, &simple_candidate);
  if distance <= config.max_edits {
    return true;
  }
  if distance <= config.max_edits_long
    && simple_root.chars().count() > config.long_name_len
  {
    return true;
  }

  let jaccard = token_jaccard(
    &tokenize(root, &config.stop_words),
    &tokenize(candidate, &config.stop_words),
  );
  jaccard >= config.jaccard_threshold
}

/// Whether two tags are probable duplicates. Kinds are not compared.
pub fn classify_pair(root: &Tag, candidate: &Tag, config: &MatchConfig) -> bool {
  names_match(&root.name, &candidate.name, config)
}
