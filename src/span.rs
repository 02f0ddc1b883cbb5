use std::fmt;

/// Half-open token span `begin..end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
  pub begin: usize,
  pub end: usize,
}

impl Span {
  pub fn new(begin: usize, end: usize) -> Self {
    debug_assert!(begin < end, "empty span {}..{}", begin, end);
    Self { begin, end }
  }

  pub fn len(&self) -> usize {
    self.end - self.begin
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Split points strictly inside the span, each one dividing it into
  /// `begin..mid` and `mid..end`
  pub fn splits(&self) -> std::ops::Range<usize> {
    (self.begin + 1)..self.end
  }
}

impl fmt::Display for Span {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}", self.begin, self.end)
  }
}

/// A span together with the length of the sentence it is in, so rules can
/// tell whether it touches either sentence boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SentenceSpan {
  pub span: Span,
  pub sentence_length: usize,
}

impl SentenceSpan {
  pub fn new(begin: usize, end: usize, sentence_length: usize) -> Self {
    Self {
      span: Span::new(begin, end),
      sentence_length,
    }
  }

  pub fn is_start(&self) -> bool {
    self.span.begin == 0
  }

  pub fn is_end(&self) -> bool {
    self.span.end == self.sentence_length
  }

  /// Covers the whole sentence
  pub fn is_complete(&self) -> bool {
    self.is_start() && self.is_end()
  }
}

impl fmt::Display for SentenceSpan {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.span, self.sentence_length)
  }
}

#[test]
fn test_splits() {
  assert_eq!(Span::new(2, 5).splits().collect::<Vec<_>>(), vec![3, 4]);
  assert_eq!(Span::new(0, 1).splits().count(), 0);
  assert!(SentenceSpan::new(0, 3, 3).is_complete());
  assert!(!SentenceSpan::new(0, 2, 3).is_complete());
  assert!(SentenceSpan::new(1, 3, 3).is_end());
}
