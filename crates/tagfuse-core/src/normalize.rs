//! Canonical forms of tag text.
//!
//! [`normalize`] is the identity form. [`simple_name`] and [`tokenize`] are
//! comparison forms only and never decide identity.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

/// Lower-case and trim surrounding whitespace.
pub fn normalize(name: &str) -> String { name.trim().to_lowercase() }

/// [`normalize`], then strip one trailing `s`.
///
/// Used for edit-distance comparison so that simple plurals ("rouges") line
/// up with their singular ("rouge").
pub fn simple_name(name: &str) -> String {
  let mut s = normalize(name);
  if s.ends_with('s') {
    s.pop();
  }
  s
}

// ─── Stop words ──────────────────────────────────────────────────────────────

const DEFAULT_STOP_WORDS: &[&str] = &[
  "and", "&", "the", "a", "an", "of", "in", "le", "la", "les", "de", "en", "et",
];

/// Words dropped by [`tokenize`]. Stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopWords(BTreeSet<String>);

impl StopWords {
  pub fn new<I, S>(words: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    Self(words.into_iter().map(|w| normalize(w.as_ref())).collect())
  }

  pub fn none() -> Self { Self(BTreeSet::new()) }

  pub fn contains(&self, word: &str) -> bool { self.0.contains(word) }

  pub fn iter(&self) -> impl Iterator<Item = &str> { self.0.iter().map(String::as_str) }
}

impl Default for StopWords {
  fn default() -> Self { Self::new(DEFAULT_STOP_WORDS) }
}

/// Lower-case, strip punctuation, split on whitespace and drop stop words.
///
/// Punctuation characters are removed rather than replaced, so "b&w" becomes
/// the single token "bw". Letters and digits from any script are kept.
pub fn tokenize(name: &str, stop_words: &StopWords) -> HashSet<String> {
  let stripped: String = name
    .to_lowercase()
    .chars()
    .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
    .collect();

  stripped
    .split_whitespace()
    .filter(|w| !stop_words.contains(w))
    .map(str::to_owned)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tokens(name: &str) -> Vec<String> {
    let mut v: Vec<_> = tokenize(name, &StopWords::default()).into_iter().collect();
    v.sort();
    v
  }

  #[test]
  fn normalize_lowercases_and_trims() {
    assert_eq!(normalize("  Landscape  "), "landscape");
    assert_eq!(normalize("PORTRAIT"), "portrait");
    assert_eq!(normalize(""), "");
  }

  #[test]
  fn simple_name_strips_one_plural_s() {
    assert_eq!(simple_name("Landscapes"), "landscape");
    assert_eq!(simple_name("glass"), "glas");
    assert_eq!(simple_name(" rouge "), "rouge");
    assert_eq!(simple_name("s"), "");
  }

  #[test]
  fn simple_name_trims_before_stripping() {
    assert_eq!(simple_name("cats  "), "cat");
  }

  #[test]
  fn tokenize_drops_english_and_french_stop_words() {
    assert_eq!(tokens("the black and white"), ["black", "white"]);
    assert_eq!(tokens("noir et blanc"), ["blanc", "noir"]);
  }

  #[test]
  fn tokenize_strips_punctuation() {
    assert_eq!(tokens("black & white"), ["black", "white"]);
    assert_eq!(tokens("b&w"), ["bw"]);
    assert_eq!(tokens("café @ paris!!!"), ["café", "paris"]);
  }

  #[test]
  fn tokenize_collapses_duplicates_and_case() {
    assert_eq!(tokens("Sky SKY sky"), ["sky"]);
    assert_eq!(tokens("photo 2024"), ["2024", "photo"]);
  }

  #[test]
  fn tokenize_empty_is_empty() {
    assert!(tokens("").is_empty());
    assert!(tokens("  the  ").is_empty());
  }

  #[test]
  fn custom_stop_words_are_normalized() {
    let stop = StopWords::new([" Von "]);
    let toks = tokenize("haus von berg", &stop);
    assert!(!toks.contains("von"));
    assert_eq!(toks.len(), 2);
  }
}
