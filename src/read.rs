/// Simple recursive-descent parsing of categories and lexicon files
use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;

use crate::Err;
use crate::category::{Category, CategoryServices, Semantics};
use crate::lexicon::LexicalEntry;
use crate::syntax::{Attribute, Slash, Syntax};

pub(crate) type Infallible<'a, T> = (T, &'a str);
pub(crate) type ParseResult<'a, T> = Result<(T, &'a str), Err>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: regex::Regex = regex::Regex::new($pattern).unwrap();
    }
  };
}

pub(crate) use regex_static;

/// Try to consume a regex, returning None if it doesn't match
pub(crate) fn optional_re<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<&'a str>> {
  match re.find(s) {
    Some(m) if m.start() == 0 => {
      let (_, rest) = s.split_at(m.end());
      (Some(m.as_str()), rest)
    }
    _ => (None, s),
  }
}

/// Try to consume a regex, failing if it doesn't match
pub(crate) fn needed_re<'a>(re: &'static Regex, s: &'a str) -> ParseResult<'a, &'a str> {
  if let (Some(c), rest) = optional_re(re, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {:?}", re, s).into())
  }
}

/// Try to consume a char, returning None if it doesn't match
pub(crate) fn optional_char(c: char, s: &str) -> Infallible<'_, Option<char>> {
  match s.strip_prefix(c) {
    Some(rest) => (Some(c), rest),
    None => (None, s),
  }
}

/// Try to consume a char, failing if it doesn't match
pub(crate) fn needed_char(c: char, s: &str) -> ParseResult<'_, char> {
  if let (Some(c), rest) = optional_char(c, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {:?}", c, s).into())
  }
}

/// Tries to skip 1 or more \s characters
pub(crate) fn skip_whitespace(s: &str) -> &str {
  s.trim_start()
}

/// Parses a syntax label: S, NP, PUNCT...
fn parse_label(s: &str) -> ParseResult<'_, &str> {
  regex_static!(LABEL, r"[A-Za-z][A-Za-z0-9_\-]*");
  needed_re(&*LABEL, s).map_err(|e| format!("syntax label: {}", e).into())
}

/// Parses an optional [attribute] following a label
fn parse_attribute(s: &str) -> ParseResult<'_, Attribute> {
  regex_static!(ATTRIBUTE, r"[A-Za-z0-9_\-]+");
  let (open, s) = optional_char('[', s);
  if open.is_none() {
    return Ok((Attribute::Unset, s));
  }
  let (value, s) = needed_re(&*ATTRIBUTE, s).map_err(|e| -> Err { format!("attribute: {}", e).into() })?;
  let (_, s) = needed_char(']', s)?;
  Ok((Attribute::from_text(value), s))
}

/// atom := '(' syntax ')' | LABEL ('[' ATTR ']')?
fn parse_atom(s: &str) -> ParseResult<'_, Syntax> {
  let s = skip_whitespace(s);
  let (paren, s) = optional_char('(', s);
  if paren.is_some() {
    let (syntax, s) = parse_syntax(s)?;
    let s = skip_whitespace(s);
    let (_, s) = needed_char(')', s)?;
    return Ok((syntax, s));
  }

  let (label, s) = parse_label(s)?;
  let (attribute, s) = parse_attribute(s)?;
  Ok((Syntax::atom_with(label, attribute), s))
}

/// syntax := atom (slash atom)*, folding to the left: `S\NP/NP` is `(S\NP)/NP`
fn parse_syntax(s: &str) -> ParseResult<'_, Syntax> {
  let (mut syntax, mut s) = parse_atom(s)?;
  loop {
    let rest = skip_whitespace(s);
    let slash = rest.chars().next().and_then(Slash::from_char);
    match slash {
      Some(slash) => {
        let (right, rest) = parse_atom(&rest[1..])?;
        syntax = Syntax::complex(syntax, right, slash);
        s = rest;
      }
      None => return Ok((syntax, s)),
    }
  }
}

impl FromStr for Syntax {
  type Err = Err;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (syntax, rest) = parse_syntax(s)?;
    let rest = skip_whitespace(rest);
    if rest.is_empty() {
      Ok(syntax)
    } else {
      Err(format!("trailing input after syntax {}: {:?}", syntax, rest).into())
    }
  }
}

/// Reads `"Syntax : Semantics"`, or a bare syntax for a category with no
/// semantics. The semantics text is handed to the services' reader.
pub fn read_category<MR, S>(s: &str, services: &S) -> Result<Category<MR>, Err>
where
  MR: Semantics,
  S: CategoryServices<MR> + ?Sized,
{
  let (syntax_text, semantics_text) = match s.split_once(':') {
    Some((syntax, semantics)) => (syntax, Some(semantics.trim())),
    None => (s, None),
  };

  let syntax = syntax_text
    .parse::<Syntax>()
    .map_err(|e| -> Err { format!("category {:?}: {}", s, e).into() })?;
  let semantics = match semantics_text {
    Some(text) if !text.is_empty() => Some(
      services
        .read_semantics(text)
        .map_err(|e| -> Err { format!("category {:?}: semantics: {}", s, e).into() })?,
    ),
    Some(_) => return Err(format!("category {:?}: empty semantics after ':'", s).into()),
    None => None,
  };

  Ok(Category::new(syntax, semantics))
}

/// Reads a lexicon line, `tokens :- Category`
pub fn read_lexical_entry<MR, S>(line: &str, services: &S, origin: &str) -> Result<LexicalEntry<MR>, Err>
where
  MR: Semantics,
  S: CategoryServices<MR> + ?Sized,
{
  let Some((tokens, category)) = line.split_once(":-") else {
    return Err(format!("lexical entry {:?}: missing ':-'", line).into());
  };

  let tokens = tokens.split_whitespace().map(str::to_string).collect::<Vec<_>>();
  if tokens.is_empty() {
    return Err(format!("lexical entry {:?}: no tokens", line).into());
  }
  let category = read_category(category.trim(), services)?;

  Ok(LexicalEntry::new(tokens, category, origin))
}

/// Reads a whole lexicon file. Blank lines and `//` comments are skipped;
/// errors carry the line number.
pub fn read_lexicon<MR, S>(text: &str, services: &S, origin: &str) -> Result<Vec<Arc<LexicalEntry<MR>>>, Err>
where
  MR: Semantics,
  S: CategoryServices<MR> + ?Sized,
{
  let mut entries = Vec::new();
  for (idx, line) in text.lines().enumerate() {
    let line = match line.find("//") {
      Some(comment) => &line[..comment],
      None => line,
    }
    .trim();
    if line.is_empty() {
      continue;
    }

    let entry = read_lexical_entry(line, services, origin).map_err(|e| -> Err { format!("line {}: {}", idx + 1, e).into() })?;
    entries.push(Arc::new(entry));
  }
  Ok(entries)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::semantics::{Term, TermServices};

  #[test]
  fn test_read_syntax() {
    let tv: Syntax = "(S\\NP)/NP".parse().unwrap();
    assert_eq!(tv, "S\\NP/NP".parse().unwrap());
    assert_eq!(tv.num_slashes(), 2);
    assert_eq!(tv.as_complex().unwrap().slash, Slash::Forward);

    let raised: Syntax = "S/(S\\NP)".parse().unwrap();
    assert_eq!(raised.to_string(), "S/(S\\NP)");
    assert_eq!(raised.as_complex().unwrap().right.num_slashes(), 1);

    let adj: Syntax = " N[x] | N[x] ".parse().unwrap();
    assert_eq!(adj.to_string(), "N[x]|N[x]");
    assert!(adj.has_attribute_variable());
  }

  #[test]
  fn test_read_syntax_errors() {
    assert!("".parse::<Syntax>().is_err());
    assert!("S/".parse::<Syntax>().is_err());
    assert!("(S\\NP".parse::<Syntax>().is_err());
    assert!("S NP".parse::<Syntax>().is_err());
    assert!("N[pl".parse::<Syntax>().is_err());
  }

  #[test]
  fn test_read_category() {
    let services = TermServices;
    let c: Category<Term> = read_category("S\\NP : sleep", &services).unwrap();
    assert_eq!(c.syntax.to_string(), "S\\NP");
    assert_eq!(c.semantics, Some(Term::atom("sleep")));

    let bare: Category<Term> = read_category("PUNCT", &services).unwrap();
    assert_eq!(bare.semantics, None);

    assert!(read_category::<Term, _>("S\\NP :", &services).is_err());
    assert!(read_category::<Term, _>("S\\ : f", &services).is_err());
  }

  #[test]
  fn test_read_lexicon() {
    let services = TermServices;
    let text = r#"
      // determiners
      the :- NP/N : the
      new york :- NP : nyc   // multi-token entry
    "#;
    let entries = read_lexicon::<Term, _>(text, &services, "test").unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].tokens, vec!["new".to_string(), "york".to_string()]);
    assert_eq!(entries[1].category.syntax.to_string(), "NP");

    let err = read_lexicon::<Term, _>("the :- NP/N : the\ncat N : cat", &services, "test").unwrap_err();
    assert!(err.to_string().starts_with("line 2"), "{}", err);
  }
}
