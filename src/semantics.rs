//! A small symbolic semantics: application and composition just build
//! terms, so derivations can be read back from the result. Enough for
//! grammars whose meanings aren't evaluated, and for testing the parser.

use std::fmt;
use std::sync::Arc;

use crate::Err;
use crate::category::CategoryServices;
use crate::read::{ParseResult, needed_char, needed_re, optional_char, regex_static, skip_whitespace};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
  Atom(Arc<str>),
  /// `(head arg...)`, always with at least one argument
  App(Arc<str>, Vec<Term>),
}

impl Term {
  pub fn atom(name: &str) -> Self {
    Self::Atom(name.into())
  }

  /// `(head args...)`, collapsing to an atom when there are no arguments
  pub fn app(head: &str, args: Vec<Term>) -> Self {
    if args.is_empty() {
      Self::atom(head)
    } else {
      Self::App(head.into(), args)
    }
  }

  pub fn head(&self) -> &str {
    match self {
      Self::Atom(name) => name,
      Self::App(head, _) => head,
    }
  }

  /// Appends `argument` to this term's argument list
  pub fn apply(&self, argument: Term) -> Term {
    match self {
      Self::Atom(name) => Self::App(name.clone(), vec![argument]),
      Self::App(head, args) => {
        let mut args = args.clone();
        args.push(argument);
        Self::App(head.clone(), args)
      }
    }
  }
}

impl fmt::Display for Term {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Atom(name) => write!(f, "{}", name),
      Self::App(head, args) => {
        write!(f, "({}", head)?;
        for arg in args {
          write!(f, " {}", arg)?;
        }
        write!(f, ")")
      }
    }
  }
}

fn parse_name(s: &str) -> ParseResult<'_, &str> {
  regex_static!(NAME, r"[A-Za-z0-9_\-\.'\+]+");
  needed_re(&*NAME, s).map_err(|e| format!("term name: {}", e).into())
}

fn parse_term(s: &str) -> ParseResult<'_, Term> {
  let s = skip_whitespace(s);
  let (paren, s) = optional_char('(', s);
  if paren.is_none() {
    let (name, s) = parse_name(s)?;
    return Ok((Term::atom(name), s));
  }

  let (head, mut s) = parse_name(skip_whitespace(s))?;
  let mut args = Vec::new();
  loop {
    s = skip_whitespace(s);
    if s.starts_with(')') || s.is_empty() {
      break;
    }
    let (arg, rest) = parse_term(s)?;
    args.push(arg);
    s = rest;
  }
  let (_, s) = needed_char(')', s)?;
  Ok((Term::app(head, args), s))
}

impl std::str::FromStr for Term {
  type Err = Err;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (term, rest) = parse_term(s)?;
    if !skip_whitespace(rest).is_empty() {
      return Err(format!("trailing input after term {}: {:?}", term, rest).into());
    }
    Ok(term)
  }
}

/// Category services over [`Term`]. Application appends the argument,
/// composition builds `(compN primary secondary)`. Neither ever fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermServices;

impl CategoryServices<Term> for TermServices {
  fn apply_semantics(&self, function: &Term, argument: &Term) -> Option<Term> {
    Some(function.apply(argument.clone()))
  }

  fn compose_semantics(&self, primary: &Term, secondary: &Term, order: usize) -> Option<Term> {
    Some(Term::app(&format!("comp{}", order), vec![primary.clone(), secondary.clone()]))
  }

  fn read_semantics(&self, text: &str) -> Result<Term, Err> {
    text.parse()
  }
}

#[test]
fn test_read_terms() {
  let t: Term = "(likes he (the cat))".parse().unwrap();
  assert_eq!(t.head(), "likes");
  assert_eq!(t.to_string(), "(likes he (the cat))");
  assert_eq!("(f)".parse::<Term>().unwrap(), Term::atom("f"));
  assert!("(f a".parse::<Term>().is_err());
  assert!("f a".parse::<Term>().is_err());
}

#[test]
fn test_term_application() {
  let f = Term::atom("give");
  let applied = f.apply(Term::atom("a")).apply(Term::atom("b"));
  assert_eq!(applied.to_string(), "(give a b)");
}
