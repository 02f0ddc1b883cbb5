use std::fmt;
use std::sync::Arc;

mod unify;

pub use unify::Unification;

/// Label of the category assigned to skipped words
pub const EMPTY_LABEL: &str = "EMPTY";
/// Label of punctuation tokens
pub const PUNCT_LABEL: &str = "PUNCT";
/// Written attribute that marks an attribute variable: `N[x]`
pub const VARIABLE_ATTRIBUTE: &str = "x";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slash {
  /// `/`, argument on the right
  Forward,
  /// `\`, argument on the left
  Backward,
  /// `|`, either side
  Vertical,
}

impl Slash {
  pub fn from_char(c: char) -> Option<Self> {
    match c {
      '/' => Some(Self::Forward),
      '\\' => Some(Self::Backward),
      '|' => Some(Self::Vertical),
      _ => None,
    }
  }

  pub fn as_char(self) -> char {
    match self {
      Self::Forward => '/',
      Self::Backward => '\\',
      Self::Vertical => '|',
    }
  }
}

impl fmt::Display for Slash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_char())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
  Unset,
  Variable,
  Value(Arc<str>),
}

impl Attribute {
  pub fn is_set(&self) -> bool {
    !matches!(self, Self::Unset)
  }

  /// Reads the text between the brackets of `N[...]`
  pub fn from_text(s: &str) -> Self {
    if s == VARIABLE_ATTRIBUTE {
      Self::Variable
    } else {
      Self::Value(s.into())
    }
  }
}

impl fmt::Display for Attribute {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Unset => Ok(()),
      Self::Variable => write!(f, "{}", VARIABLE_ATTRIBUTE),
      Self::Value(v) => write!(f, "{}", v),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleSyntax {
  pub label: Arc<str>,
  pub attribute: Attribute,
}

impl SimpleSyntax {
  pub fn new(label: &str, attribute: Attribute) -> Self {
    Self {
      label: label.into(),
      attribute,
    }
  }

  fn with_attribute(&self, attribute: Attribute) -> Self {
    Self {
      label: self.label.clone(),
      attribute,
    }
  }
}

impl fmt::Display for SimpleSyntax {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.attribute.is_set() {
      write!(f, "{}[{}]", self.label, self.attribute)
    } else {
      write!(f, "{}", self.label)
    }
  }
}

/// A functor `left slash right`, e.g. `S\NP`: takes an NP on the left and yields an S.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ComplexSyntax {
  pub left: Syntax,
  pub right: Syntax,
  pub slash: Slash,
  num_slashes: usize,
}

impl ComplexSyntax {
  pub fn num_slashes(&self) -> usize {
    self.num_slashes
  }
}

/// Syntactic type of a category. Complex syntax is reference counted, so
/// clones are cheap and sub-syntax is shared between derived categories.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Syntax {
  Simple(SimpleSyntax),
  Complex(Arc<ComplexSyntax>),
}

impl Syntax {
  pub fn atom(label: &str) -> Self {
    Self::Simple(SimpleSyntax::new(label, Attribute::Unset))
  }

  pub fn atom_with(label: &str, attribute: Attribute) -> Self {
    Self::Simple(SimpleSyntax::new(label, attribute))
  }

  pub fn complex(left: Syntax, right: Syntax, slash: Slash) -> Self {
    let num_slashes = left.num_slashes() + right.num_slashes() + 1;
    Self::Complex(Arc::new(ComplexSyntax {
      left,
      right,
      slash,
      num_slashes,
    }))
  }

  pub fn empty() -> Self {
    Self::atom(EMPTY_LABEL)
  }

  pub fn punct() -> Self {
    Self::atom(PUNCT_LABEL)
  }

  pub fn as_complex(&self) -> Option<&ComplexSyntax> {
    match self {
      Self::Complex(c) => Some(c),
      Self::Simple(_) => None,
    }
  }

  pub fn as_simple(&self) -> Option<&SimpleSyntax> {
    match self {
      Self::Simple(s) => Some(s),
      Self::Complex(_) => None,
    }
  }

  pub fn is_complex(&self) -> bool {
    matches!(self, Self::Complex(_))
  }

  pub fn num_slashes(&self) -> usize {
    match self {
      Self::Simple(_) => 0,
      Self::Complex(c) => c.num_slashes,
    }
  }

  /// Number of arguments the functor takes before yielding its result
  pub fn num_arguments(&self) -> usize {
    match self {
      Self::Simple(_) => 0,
      Self::Complex(c) => c.left.num_arguments() + 1,
    }
  }

  pub fn has_attribute_variable(&self) -> bool {
    match self {
      Self::Simple(s) => s.attribute == Attribute::Variable,
      Self::Complex(c) => c.left.has_attribute_variable() || c.right.has_attribute_variable(),
    }
  }

  /// Replaces every attribute variable with `assignment`. Assigning
  /// `Variable` is a no-op and assigning `Unset` removes the variables.
  pub fn set_variable(&self, assignment: &Attribute) -> Syntax {
    if *assignment == Attribute::Variable || !self.has_attribute_variable() {
      return self.clone();
    }
    match self {
      Self::Simple(s) => Self::Simple(s.with_attribute(assignment.clone())),
      Self::Complex(c) => Self::complex(
        c.left.set_variable(assignment),
        c.right.set_variable(assignment),
        c.slash,
      ),
    }
  }

  pub fn strip_variables(&self) -> Syntax {
    self.set_variable(&Attribute::Unset)
  }

  pub fn strip_attributes(&self) -> Syntax {
    match self {
      Self::Simple(s) if s.attribute.is_set() => Self::Simple(s.with_attribute(Attribute::Unset)),
      Self::Simple(_) => self.clone(),
      Self::Complex(c) => Self::complex(c.left.strip_attributes(), c.right.strip_attributes(), c.slash),
    }
  }

  /// All concrete attribute values mentioned anywhere in the syntax
  pub fn attributes(&self) -> Vec<Arc<str>> {
    let mut out = Vec::new();
    self.collect_attributes(&mut out);
    out
  }

  fn collect_attributes(&self, out: &mut Vec<Arc<str>>) {
    match self {
      Self::Simple(SimpleSyntax {
        attribute: Attribute::Value(v),
        ..
      }) => {
        if !out.contains(v) {
          out.push(v.clone());
        }
      }
      Self::Simple(_) => {}
      Self::Complex(c) => {
        c.left.collect_attributes(out);
        c.right.collect_attributes(out);
      }
    }
  }

  /// True if `other` equals this syntax or any syntax nested in it
  pub fn contains_sub_syntax(&self, other: &Syntax) -> bool {
    if self == other {
      return true;
    }
    match self {
      Self::Simple(_) => false,
      Self::Complex(c) => c.left.contains_sub_syntax(other) || c.right.contains_sub_syntax(other),
    }
  }

  /// Replaces every occurrence of `current` with `replacement`
  pub fn replace(&self, current: &Syntax, replacement: &Syntax) -> Syntax {
    if self == current {
      return replacement.clone();
    }
    match self {
      Self::Simple(_) => self.clone(),
      Self::Complex(c) => Self::complex(
        c.left.replace(current, replacement),
        c.right.replace(current, replacement),
        c.slash,
      ),
    }
  }
}

impl From<SimpleSyntax> for Syntax {
  fn from(s: SimpleSyntax) -> Self {
    Self::Simple(s)
  }
}

impl fmt::Display for Syntax {
  /// Slashes associate to the left, so only complex arguments need brackets
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Simple(s) => write!(f, "{}", s),
      Self::Complex(c) => {
        write!(f, "{}{}", c.left, c.slash)?;
        if c.right.is_complex() {
          write!(f, "({})", c.right)
        } else {
          write!(f, "{}", c.right)
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn s_np() -> Syntax {
    Syntax::complex(Syntax::atom("S"), Syntax::atom("NP"), Slash::Backward)
  }

  #[test]
  fn test_num_slashes() {
    let tv = Syntax::complex(s_np(), Syntax::atom("NP"), Slash::Forward);
    assert_eq!(tv.num_slashes(), 2);
    assert_eq!(tv.num_arguments(), 2);

    let modifier = Syntax::complex(s_np(), s_np(), Slash::Backward);
    assert_eq!(modifier.num_slashes(), 3);
    assert_eq!(modifier.num_arguments(), 2);
    assert_eq!(Syntax::atom("N").num_slashes(), 0);
  }

  #[test]
  fn test_display() {
    let tv = Syntax::complex(s_np(), Syntax::atom("NP"), Slash::Forward);
    assert_eq!(tv.to_string(), "S\\NP/NP");
    let raised = Syntax::complex(Syntax::atom("S"), s_np(), Slash::Forward);
    assert_eq!(raised.to_string(), "S/(S\\NP)");
    let n = Syntax::atom_with("N", Attribute::Variable);
    assert_eq!(Syntax::complex(n.clone(), n, Slash::Vertical).to_string(), "N[x]|N[x]");
  }

  #[test]
  fn test_set_and_strip_variables() {
    let n_x = Syntax::atom_with("N", Attribute::Variable);
    let adj = Syntax::complex(n_x.clone(), n_x, Slash::Forward);
    assert!(adj.has_attribute_variable());

    let pl = adj.set_variable(&Attribute::Value("pl".into()));
    assert_eq!(pl.to_string(), "N[pl]/N[pl]");
    assert!(!pl.has_attribute_variable());
    assert_eq!(pl.attributes(), vec![Arc::<str>::from("pl")]);

    assert_eq!(adj.strip_variables().to_string(), "N/N");
    assert_eq!(pl.strip_attributes().to_string(), "N/N");
    assert_eq!(adj.set_variable(&Attribute::Variable), adj);
  }

  #[test]
  fn test_sub_syntax_and_replace() {
    let tv = Syntax::complex(s_np(), Syntax::atom("NP"), Slash::Forward);
    assert!(tv.contains_sub_syntax(&s_np()));
    assert!(tv.contains_sub_syntax(&Syntax::atom("S")));
    assert!(!tv.contains_sub_syntax(&Syntax::atom("N")));

    let replaced = tv.replace(&Syntax::atom("NP"), &Syntax::atom("N"));
    assert_eq!(replaced.to_string(), "S\\N/N");
  }
}
