use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use crate::Err;
use crate::category::{Category, CategoryServices, Semantics};
use crate::read::read_lexicon;

/// Origin tag of entries created by [`WordSkippingGenerator`]
pub const SKIPPING_ORIGIN: &str = "skipping";

/// Pairs a token sequence with a category. `origin` records where the
/// entry came from and takes no part in equality or hashing.
#[derive(Debug, Clone)]
pub struct LexicalEntry<MR> {
  pub tokens: Vec<String>,
  pub category: Category<MR>,
  pub origin: Arc<str>,
}

impl<MR> LexicalEntry<MR> {
  pub fn new(tokens: Vec<String>, category: Category<MR>, origin: &str) -> Self {
    Self {
      tokens,
      category,
      origin: origin.into(),
    }
  }
}

impl<MR: PartialEq> PartialEq for LexicalEntry<MR> {
  fn eq(&self, other: &Self) -> bool {
    self.tokens == other.tokens && self.category == other.category
  }
}

impl<MR: Eq> Eq for LexicalEntry<MR> {}

impl<MR: Hash> Hash for LexicalEntry<MR> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.tokens.hash(state);
    self.category.hash(state);
  }
}

impl<MR: fmt::Display> fmt::Display for LexicalEntry<MR> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} :- {}", self.tokens.join(" "), self.category)
  }
}

/// Source of lexical entries for a token sequence. Shared by all parser
/// workers during a parse and never mutated by the parser.
pub trait Lexicon<MR: Semantics>: Send + Sync {
  fn get_lex_entries(&self, tokens: &[String]) -> Vec<Arc<LexicalEntry<MR>>>;
}

/// Lexicon backed by a map from token sequences to their entries
#[derive(Debug, Clone)]
pub struct SimpleLexicon<MR> {
  entries: HashMap<Vec<String>, Vec<Arc<LexicalEntry<MR>>>>,
  len: usize,
}

impl<MR> Default for SimpleLexicon<MR> {
  fn default() -> Self {
    Self {
      entries: HashMap::new(),
      len: 0,
    }
  }
}

impl<MR: Semantics> SimpleLexicon<MR> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds an entry, returning false if an equal entry is already present
  pub fn add(&mut self, entry: Arc<LexicalEntry<MR>>) -> bool {
    let bucket = self.entries.entry(entry.tokens.clone()).or_default();
    if bucket.iter().any(|e| **e == *entry) {
      return false;
    }
    bucket.push(entry);
    self.len += 1;
    true
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn iter(&self) -> impl Iterator<Item = &Arc<LexicalEntry<MR>>> {
    self.entries.values().flatten()
  }

  /// Reads `tokens :- Category` lines. See [`crate::read::read_lexicon`].
  pub fn read<S>(text: &str, services: &S, origin: &str) -> Result<Self, Err>
  where
    S: CategoryServices<MR> + ?Sized,
  {
    Ok(read_lexicon(text, services, origin)?.into_iter().collect())
  }

  pub fn read_from_file<S>(path: impl AsRef<Path>, services: &S) -> Result<Self, Err>
  where
    S: CategoryServices<MR> + ?Sized,
  {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| -> Err { format!("{}: {}", path.display(), e).into() })?;
    Self::read(&text, services, &path.display().to_string())
  }
}

impl<MR: Semantics> FromIterator<Arc<LexicalEntry<MR>>> for SimpleLexicon<MR> {
  fn from_iter<I: IntoIterator<Item = Arc<LexicalEntry<MR>>>>(iter: I) -> Self {
    let mut lexicon = Self::new();
    for entry in iter {
      lexicon.add(entry);
    }
    lexicon
  }
}

impl<MR: Semantics> Lexicon<MR> for SimpleLexicon<MR> {
  fn get_lex_entries(&self, tokens: &[String]) -> Vec<Arc<LexicalEntry<MR>>> {
    self.entries.get(tokens).cloned().unwrap_or_default()
  }
}

/// Several lexicons queried as one. Duplicate entries across members are
/// returned once.
pub struct CompositeLexicon<'a, MR> {
  lexicons: Vec<&'a dyn Lexicon<MR>>,
}

impl<'a, MR: Semantics> CompositeLexicon<'a, MR> {
  pub fn new(lexicons: Vec<&'a dyn Lexicon<MR>>) -> Self {
    Self { lexicons }
  }
}

impl<MR: Semantics> Lexicon<MR> for CompositeLexicon<'_, MR> {
  fn get_lex_entries(&self, tokens: &[String]) -> Vec<Arc<LexicalEntry<MR>>> {
    let mut out: Vec<Arc<LexicalEntry<MR>>> = Vec::new();
    for lexicon in self.lexicons.iter() {
      for entry in lexicon.get_lex_entries(tokens) {
        if !out.iter().any(|e| **e == *entry) {
          out.push(entry);
        }
      }
    }
    out
  }
}

/// Builds entries specific to one sentence, added to the lexicon for the
/// duration of that parse only.
pub trait SentenceLexiconGenerator<MR: Semantics>: Send + Sync {
  fn generate(&self, tokens: &[String]) -> Vec<LexicalEntry<MR>>;

  fn generate_lexicon(&self, tokens: &[String]) -> SimpleLexicon<MR> {
    self.generate(tokens).into_iter().map(Arc::new).collect()
  }
}

/// Lets every single word be skipped, by giving it the `EMPTY` category.
/// Paired with the skipping rules this allows sloppy parses that ignore
/// unknown words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordSkippingGenerator;

impl<MR: Semantics> SentenceLexiconGenerator<MR> for WordSkippingGenerator {
  fn generate(&self, tokens: &[String]) -> Vec<LexicalEntry<MR>> {
    tokens
      .iter()
      .map(|token| LexicalEntry::new(vec![token.clone()], Category::empty(), SKIPPING_ORIGIN))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::semantics::{Term, TermServices};

  fn tokens(s: &str) -> Vec<String> {
    s.split(' ').map(str::to_string).collect()
  }

  #[test]
  fn test_origin_excluded_from_equality() {
    let category: Category<Term> = TermServices.read("N : cat").unwrap();
    let a = LexicalEntry::new(tokens("cat"), category.clone(), "a");
    let b = LexicalEntry::new(tokens("cat"), category, "b");
    assert_eq!(a, b);

    let mut lexicon = SimpleLexicon::new();
    assert!(lexicon.add(Arc::new(a)));
    assert!(!lexicon.add(Arc::new(b)));
    assert_eq!(lexicon.len(), 1);
  }

  #[test]
  fn test_composite_lexicon() {
    let first = SimpleLexicon::<Term>::read("cat :- N : cat\nthe :- NP/N : the", &TermServices, "first").unwrap();
    let second = SimpleLexicon::<Term>::read("cat :- N : cat\ncat :- NP : cat", &TermServices, "second").unwrap();
    let members: Vec<&dyn Lexicon<Term>> = vec![&first, &second];
    let composite = CompositeLexicon::new(members);

    assert_eq!(composite.get_lex_entries(&tokens("cat")).len(), 2);
    assert_eq!(composite.get_lex_entries(&tokens("the")).len(), 1);
    assert!(composite.get_lex_entries(&tokens("the cat")).is_empty());
  }

  #[test]
  fn test_word_skipping_generator() {
    let lexicon: SimpleLexicon<Term> = WordSkippingGenerator.generate_lexicon(&tokens("the big cat"));
    assert_eq!(lexicon.len(), 3);
    let entries = lexicon.get_lex_entries(&tokens("big"));
    assert_eq!(entries[0].category, Category::empty());
    assert_eq!(&*entries[0].origin, SKIPPING_ORIGIN);
  }
}
