use super::{Attribute, SimpleSyntax, Syntax};

/// Result of a successful unification: the unified syntax, and the value
/// the left-hand syntax's attribute variable was bound to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unification {
  pub syntax: Syntax,
  pub variable_assignment: Option<Attribute>,
}

/// Each side carries at most one variable, so at most one binding per side.
#[derive(Debug, Default)]
struct Bindings {
  this: Option<Attribute>,
  other: Option<Attribute>,
}

/// Binds the slot to `value`, or checks it agrees with an earlier binding
fn bind(slot: &mut Option<Attribute>, value: &Attribute) -> bool {
  match slot {
    Some(existing) => existing == value,
    None => {
      *slot = Some(value.clone());
      true
    }
  }
}

impl Syntax {
  /// Unifies `self` with `other`. Labels and slashes must match exactly;
  /// attributes match if equal, if either is unset, or through a variable.
  pub fn unify(&self, other: &Syntax) -> Option<Unification> {
    if self.num_slashes() != other.num_slashes() {
      return None;
    }

    let mut bindings = Bindings::default();
    let syntax = unify_with(self, other, &mut bindings)?;
    let variable_assignment = match bindings.this {
      None | Some(Attribute::Variable) => None,
      Some(a) => Some(a),
    };

    Some(Unification {
      syntax,
      variable_assignment,
    })
  }
}

fn unify_with(this: &Syntax, other: &Syntax, bindings: &mut Bindings) -> Option<Syntax> {
  match (this, other) {
    (Syntax::Simple(a), Syntax::Simple(b)) => unify_simple(a, b, bindings).map(Syntax::Simple),
    (Syntax::Complex(a), Syntax::Complex(b)) if a.slash == b.slash => {
      // argument first, its bindings constrain the result
      let right = unify_with(&a.right, &b.right, bindings)?;
      let left = unify_with(&a.left, &b.left, bindings)?;
      if left == a.left && right == a.right {
        Some(this.clone())
      } else {
        Some(Syntax::complex(left, right, a.slash))
      }
    }
    _ => None,
  }
}

fn unify_simple(this: &SimpleSyntax, other: &SimpleSyntax, bindings: &mut Bindings) -> Option<SimpleSyntax> {
  if this.label != other.label {
    return None;
  }

  match (&this.attribute, &other.attribute) {
    (Attribute::Unset, Attribute::Unset) => Some(this.clone()),
    (Attribute::Unset, Attribute::Variable) => bind(&mut bindings.other, &Attribute::Unset).then(|| this.clone()),
    (Attribute::Unset, Attribute::Value(_)) => Some(other.clone()),
    (Attribute::Variable, Attribute::Unset) => bind(&mut bindings.this, &Attribute::Unset).then(|| other.clone()),
    (Attribute::Value(_), Attribute::Unset) => Some(this.clone()),
    (Attribute::Variable, assigned) => bind(&mut bindings.this, assigned).then(|| other.clone()),
    (assigned, Attribute::Variable) => bind(&mut bindings.other, assigned).then(|| this.clone()),
    (Attribute::Value(a), Attribute::Value(b)) if a == b => Some(this.clone()),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use crate::syntax::{Attribute, Slash, Syntax};

  fn read(s: &str) -> Syntax {
    s.parse().unwrap()
  }

  #[test]
  fn test_unify_identity() {
    for s in ["S", "NP", "N[pl]", "N[x]", "S\\NP/NP", "(S\\NP)\\(S\\NP)", "N[x]/N[x]", "S|NP"] {
      let syntax = read(s);
      let u = syntax.unify(&syntax).unwrap();
      assert_eq!(u.syntax, syntax, "{}", s);
      assert_eq!(u.variable_assignment, None, "{}", s);
    }
  }

  #[test]
  fn test_unify_mismatch() {
    assert!(read("S").unify(&read("NP")).is_none());
    assert!(read("S/NP").unify(&read("S\\NP")).is_none());
    assert!(read("S/NP").unify(&read("S")).is_none());
    assert!(read("N[pl]").unify(&read("N[sg]")).is_none());
  }

  #[test]
  fn test_unify_attributes() {
    // unset unifies with anything of the same label
    let u = read("N").unify(&read("N[pl]")).unwrap();
    assert_eq!(u.syntax, read("N[pl]"));
    let u = read("N[pl]").unify(&read("N")).unwrap();
    assert_eq!(u.syntax, read("N[pl]"));

    let u = read("N[x]").unify(&read("N[pl]")).unwrap();
    assert_eq!(u.syntax, read("N[pl]"));
    assert_eq!(u.variable_assignment, Some(Attribute::Value("pl".into())));

    let u = read("N[pl]").unify(&read("N[x]")).unwrap();
    assert_eq!(u.syntax, read("N[pl]"));
    assert_eq!(u.variable_assignment, None);
  }

  #[test]
  fn test_unify_variable_binds_once() {
    // the same variable can't take two different values
    assert!(read("N[x]/N[x]").unify(&read("N[pl]/N[sg]")).is_none());

    let u = read("N[x]/N[x]").unify(&read("N[pl]/N[pl]")).unwrap();
    assert_eq!(u.syntax, read("N[pl]/N[pl]"));
    assert_eq!(u.variable_assignment, Some(Attribute::Value("pl".into())));

    // bound to "no attribute" by the argument, so pl conflicts
    assert!(read("N[x]/N[x]").unify(&read("N[pl]/N")).is_none());
  }

  #[test]
  fn test_unify_shares_unchanged() {
    let tv = read("S\\NP/NP");
    let u = tv.unify(&read("S\\NP/NP")).unwrap();
    match (&u.syntax, &tv) {
      (Syntax::Complex(a), Syntax::Complex(b)) => assert!(std::sync::Arc::ptr_eq(a, b)),
      _ => panic!("expected complex syntax"),
    }
    assert_eq!(u.syntax.as_complex().map(|c| c.slash), Some(Slash::Forward));
  }
}
