use std::fmt;
use std::hash::Hash;

use crate::Err;
use crate::read::read_category;
use crate::syntax::{Slash, Syntax};

/// Requirements on a semantic representation. Blanket-implemented, so any
/// shareable value type with equality and hashing qualifies.
pub trait Semantics: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {}

impl<T> Semantics for T where T: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {}

/// A syntactic type paired with its meaning. Equality and hashing cover
/// both parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category<MR> {
  pub syntax: Syntax,
  pub semantics: Option<MR>,
}

impl<MR> Category<MR> {
  pub fn new(syntax: Syntax, semantics: Option<MR>) -> Self {
    Self { syntax, semantics }
  }

  pub fn with_semantics(syntax: Syntax, semantics: MR) -> Self {
    Self::new(syntax, Some(semantics))
  }

  /// The category of a skipped word, `EMPTY` with no semantics
  pub fn empty() -> Self {
    Self::new(Syntax::empty(), None)
  }

  pub fn is_complex(&self) -> bool {
    self.syntax.is_complex()
  }

  pub fn slash(&self) -> Option<Slash> {
    self.syntax.as_complex().map(|c| c.slash)
  }

  pub fn num_slashes(&self) -> usize {
    self.syntax.num_slashes()
  }
}

impl<MR: fmt::Display> fmt::Display for Category<MR> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.semantics {
      Some(semantics) => write!(f, "{} : {}", self.syntax, semantics),
      None => write!(f, "{}", self.syntax),
    }
  }
}

/// The two semantic combinators the parser needs, plus the text reader for
/// semantics. `apply` and `compose` pair them with the syntactic side of
/// the combinators and are not meant to be overridden.
///
/// Implementations are shared by every parser worker, so they must not
/// hold mutable state.
pub trait CategoryServices<MR: Semantics>: Send + Sync {
  /// Applies a function meaning to an argument meaning, `None` if the
  /// argument doesn't fit.
  fn apply_semantics(&self, function: &MR, argument: &MR) -> Option<MR>;

  /// Composes `primary` with `secondary` below `order` arguments
  fn compose_semantics(&self, primary: &MR, secondary: &MR, order: usize) -> Option<MR>;

  fn read_semantics(&self, text: &str) -> Result<MR, Err>;

  /// Functional application. Fails on a vertical slash, missing
  /// semantics, or when the argument doesn't unify with the function's
  /// argument type.
  fn apply(&self, function: &Category<MR>, argument: &Category<MR>) -> Option<Category<MR>> {
    let functor = function.syntax.as_complex()?;
    let function_semantics = function.semantics.as_ref()?;
    let argument_semantics = argument.semantics.as_ref()?;
    if functor.slash == Slash::Vertical {
      return None;
    }

    let unification = functor.right.unify(&argument.syntax)?;
    let syntax = match &unification.variable_assignment {
      Some(assignment) => functor.left.set_variable(assignment),
      None => functor.left.clone(),
    };
    let semantics = self.apply_semantics(function_semantics, argument_semantics)?;

    Some(Category::with_semantics(syntax, semantics))
  }

  /// Generalized composition: `order` argument layers are peeled off the
  /// secondary, the residual is unified with the primary's argument, and
  /// the layers are wrapped back around the primary's result. Crossed
  /// composition is only defined for order 1.
  fn compose(&self, primary: &Category<MR>, secondary: &Category<MR>, order: usize, cross: bool) -> Option<Category<MR>> {
    if order == 0 || (cross && order != 1) {
      return None;
    }
    let functor = primary.syntax.as_complex()?;
    if functor.slash == Slash::Vertical {
      return None;
    }
    let primary_semantics = primary.semantics.as_ref()?;
    let secondary_semantics = secondary.semantics.as_ref()?;

    // outermost layer first
    let mut layers = Vec::with_capacity(order);
    let mut residual = &secondary.syntax;
    for _ in 0..order {
      let complex = residual.as_complex()?;
      layers.push((&complex.right, complex.slash));
      residual = &complex.left;
    }

    if order == 1 {
      let secondary_slash = layers[0].1;
      if secondary_slash == Slash::Vertical {
        return None;
      }
      if cross == (functor.slash == secondary_slash) {
        return None;
      }
    }

    let unification = functor.right.unify(residual)?;
    let result = match &unification.variable_assignment {
      Some(assignment) => functor.left.set_variable(assignment),
      None => functor.left.clone(),
    };
    let semantics = self.compose_semantics(primary_semantics, secondary_semantics, order)?;

    let syntax = layers
      .into_iter()
      .rev()
      .fold(result, |inner, (argument, slash)| Syntax::complex(inner, argument.clone(), slash));

    Some(Category::with_semantics(syntax, semantics))
  }

  /// Reads `"Syntax : Semantics"`
  fn read(&self, text: &str) -> Result<Category<MR>, Err> {
    read_category(text.trim(), self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::semantics::{Term, TermServices};

  fn read(s: &str) -> Category<Term> {
    TermServices.read(s).unwrap()
  }

  #[test]
  fn test_apply() {
    let det = read("NP/N : the");
    let noun = read("N : cat");
    let np = TermServices.apply(&det, &noun).unwrap();
    assert_eq!(np.syntax.to_string(), "NP");
    assert_eq!(np.semantics.unwrap().to_string(), "(the cat)");

    // direction is the rule's concern, apply only checks the types
    let verb = read("S\\NP : sleep");
    let s = TermServices.apply(&verb, &read("NP : cat")).unwrap();
    assert_eq!(s.syntax.to_string(), "S");
  }

  #[test]
  fn test_apply_failures() {
    let noun = read("N : cat");
    // vertical slash
    assert!(TermServices.apply(&read("NP|N : the"), &noun).is_none());
    // missing semantics on either side
    assert!(TermServices.apply(&read("NP/N"), &noun).is_none());
    assert!(TermServices.apply(&read("NP/N : the"), &read("N")).is_none());
    // argument mismatch
    assert!(TermServices.apply(&read("NP/N : the"), &read("NP : cat")).is_none());
    // not a function
    assert!(TermServices.apply(&noun, &noun).is_none());
  }

  #[test]
  fn test_apply_sets_variable() {
    let adj = read("N[x]/N[x] : big");
    let cats = read("N[pl] : cats");
    let result = TermServices.apply(&adj, &cats).unwrap();
    assert_eq!(result.syntax.to_string(), "N[pl]");
  }

  #[test]
  fn test_compose_first_order() {
    // S/VP composed with VP/NP gives S/NP
    let primary = read("S/(S\\NP) : he");
    let secondary = read("S\\NP/NP : likes");
    let composed = TermServices.compose(&primary, &secondary, 1, false).unwrap();
    assert_eq!(composed.syntax.to_string(), "S/NP");
    assert_eq!(composed.semantics.unwrap().to_string(), "(comp1 he likes)");

    // crossing requires opposite slashes
    assert!(TermServices.compose(&primary, &secondary, 1, true).is_none());
  }

  #[test]
  fn test_compose_slash_checks() {
    let primary = read("S\\NP/NP : f");
    let backward = read("NP\\N : g");
    let forward = read("NP/N : g");
    let vertical = read("NP|N : g");

    assert!(TermServices.compose(&primary, &forward, 1, false).is_some());
    assert!(TermServices.compose(&primary, &backward, 1, false).is_none());
    assert!(TermServices.compose(&primary, &backward, 1, true).is_some());
    assert!(TermServices.compose(&primary, &forward, 1, true).is_none());
    assert!(TermServices.compose(&primary, &vertical, 1, true).is_none());
    assert!(TermServices.compose(&primary, &vertical, 1, false).is_none());

    assert!(TermServices.compose(&read("S|NP : f"), &forward, 1, false).is_none());
    assert!(TermServices.compose(&primary, &read("NP/N"), 1, false).is_none());
  }

  #[test]
  fn test_compose_higher_order() {
    let primary = read("S/(S\\NP) : he");
    let secondary = read("S\\NP/NP/PP : gives");
    let composed = TermServices.compose(&primary, &secondary, 2, false).unwrap();
    assert_eq!(composed.syntax.to_string(), "S/NP/PP");

    // peeling two layers then applying gives the same result type
    let residual = read("S\\NP : x");
    let applied = TermServices.apply(&primary, &residual).unwrap();
    let rewrapped = Syntax::complex(
      Syntax::complex(applied.syntax, Syntax::atom("NP"), Slash::Forward),
      Syntax::atom("PP"),
      Slash::Forward,
    );
    assert_eq!(composed.syntax, rewrapped);

    // not enough layers to peel
    assert!(TermServices.compose(&primary, &read("S\\NP/NP : likes"), 3, false).is_none());
    // crossing is first order only
    assert!(TermServices.compose(&primary, &secondary, 2, true).is_none());
    assert!(TermServices.compose(&primary, &secondary, 0, false).is_none());
  }
}
