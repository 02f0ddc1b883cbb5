//! Normal-form constraints. They look only at the names of the rules that
//! derived each child, and reject combinations that would rebuild an
//! equivalent category through a different bracketing.

use std::collections::HashSet;

use super::{Direction, RuleName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
  /// The composition constraints of Hockenmaier and Bisk (2010):
  ///
  /// 1. the primary of an application or first-order composition may not
  ///    have been built by composition in the same direction
  /// 2. the primary of a composition may not have been built by
  ///    first-order composition in the same direction
  /// 3. the secondary of an order `n` composition may not have been built
  ///    by composition of order lower than `n` in the same direction
  HbComposed,
  /// Unary rules may not apply to anything built by one of these rules
  UnaryBan(HashSet<RuleName>),
}

impl Constraint {
  fn is_valid_binary(&self, left: &[RuleName], right: &[RuleName], rule: &RuleName) -> bool {
    match self {
      Self::HbComposed => hb_composed(left, right, rule),
      Self::UnaryBan(_) => true,
    }
  }

  fn is_valid_unary(&self, generating: &[RuleName], _rule: &RuleName) -> bool {
    match self {
      Self::HbComposed => true,
      Self::UnaryBan(banned) => !generating.iter().any(|name| banned.contains(name)),
    }
  }
}

fn hb_composed(left: &[RuleName], right: &[RuleName], rule: &RuleName) -> bool {
  let Some(direction) = rule.direction() else {
    return true;
  };
  let is_composition = rule.is_composition();
  let first_order_or_application = rule.is_application() || (is_composition && rule.order() == 1);
  if !is_composition && !first_order_or_application {
    return true;
  }

  let (primary, secondary) = match direction {
    Direction::Forward => (left, right),
    Direction::Backward => (right, left),
  };
  let same_direction = |name: &&RuleName| name.is_composition() && name.direction() == Some(direction);

  for generating in primary.iter().filter(same_direction) {
    if first_order_or_application {
      return false;
    }
    if is_composition && generating.order() == 1 {
      return false;
    }
  }

  if is_composition && secondary.iter().filter(same_direction).any(|generating| rule.order() > generating.order()) {
    return false;
  }

  true
}

/// A conjunction of [`Constraint`]s
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalFormValidator {
  constraints: Vec<Constraint>,
}

impl NormalFormValidator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Hockenmaier-Bisk constraints only
  pub fn hockenmaier_bisk() -> Self {
    Self::new().with(Constraint::HbComposed)
  }

  pub fn with(mut self, constraint: Constraint) -> Self {
    self.add(constraint);
    self
  }

  pub fn add(&mut self, constraint: Constraint) {
    // two ban lists act as their union
    if let Constraint::UnaryBan(more) = &constraint {
      for existing in self.constraints.iter_mut() {
        if let Constraint::UnaryBan(banned) = existing {
          banned.extend(more.iter().cloned());
          return;
        }
      }
    }
    self.constraints.push(constraint);
  }

  pub fn constraints(&self) -> &[Constraint] {
    &self.constraints
  }

  /// `left` and `right` are the rules that generated the child cells
  pub fn is_valid_binary(&self, left: &[RuleName], right: &[RuleName], rule: &RuleName) -> bool {
    self.constraints.iter().all(|c| c.is_valid_binary(left, right, rule))
  }

  pub fn is_valid_unary(&self, generating: &[RuleName], rule: &RuleName) -> bool {
    self.constraints.iter().all(|c| c.is_valid_unary(generating, rule))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rules::{BinaryRule, SKIPPING_LABEL};

  fn comp(direction: Direction, order: usize) -> RuleName {
    BinaryRule::composition(direction, order).name()
  }

  fn apply(direction: Direction) -> RuleName {
    BinaryRule::Application(direction).name()
  }

  #[test]
  fn test_hb_application_after_composition() {
    let nf = NormalFormValidator::hockenmaier_bisk();
    let fwd_comp = [comp(Direction::Forward, 1)];
    let lex = [RuleName::Lexical];

    // X/Y Y/Z => X/Z, then X/Z Z => X is spurious
    assert!(!nf.is_valid_binary(&fwd_comp, &lex, &apply(Direction::Forward)));
    // primary is on the right for backward rules
    assert!(nf.is_valid_binary(&fwd_comp, &lex, &apply(Direction::Backward)));
    assert!(!nf.is_valid_binary(&lex, &[comp(Direction::Backward, 2)], &apply(Direction::Backward)));
    // the secondary may be composed
    assert!(nf.is_valid_binary(&lex, &fwd_comp, &apply(Direction::Forward)));
  }

  #[test]
  fn test_hb_composition_chains() {
    let nf = NormalFormValidator::hockenmaier_bisk();
    let lex = [RuleName::Lexical];

    // constraint 2: no composition onto a first-order composed primary
    assert!(!nf.is_valid_binary(&[comp(Direction::Forward, 1)], &lex, &comp(Direction::Forward, 2)));
    // a second-order composed primary is fine for second-order composition
    assert!(nf.is_valid_binary(&[comp(Direction::Forward, 2)], &lex, &comp(Direction::Forward, 2)));
    // but not for first-order composition (constraint 1)
    assert!(!nf.is_valid_binary(&[comp(Direction::Forward, 2)], &lex, &comp(Direction::Forward, 1)));

    // constraint 3: no higher-order composition over a lower-order composed secondary
    assert!(!nf.is_valid_binary(&lex, &[comp(Direction::Forward, 1)], &comp(Direction::Forward, 2)));
    assert!(!nf.is_valid_binary(&[comp(Direction::Backward, 1)], &lex, &comp(Direction::Backward, 2)));
    assert!(nf.is_valid_binary(&lex, &[comp(Direction::Forward, 2)], &comp(Direction::Forward, 1)));
    assert!(nf.is_valid_binary(&lex, &[comp(Direction::Forward, 2)], &comp(Direction::Forward, 2)));
    assert!(nf.is_valid_binary(&lex, &[comp(Direction::Backward, 1)], &comp(Direction::Forward, 2)));

    // crossed composition counts as composition
    let crossed = [BinaryRule::crossed_composition(Direction::Forward).name()];
    assert!(!nf.is_valid_binary(&crossed, &lex, &apply(Direction::Forward)));
  }

  #[test]
  fn test_unary_ban() {
    let skip_forward = RuleName::directed(SKIPPING_LABEL, Direction::Forward);
    let banned = [skip_forward.clone()].into_iter().collect();
    let nf = NormalFormValidator::hockenmaier_bisk().with(Constraint::UnaryBan(banned));
    let shift = RuleName::unary("shift");

    assert!(!nf.is_valid_unary(&[RuleName::Lexical, skip_forward.clone()], &shift));
    assert!(nf.is_valid_unary(&[RuleName::Lexical], &shift));
    // bans don't touch binary rules
    assert!(nf.is_valid_binary(&[skip_forward], &[RuleName::Lexical], &apply(Direction::Forward)));

    let mut merged = nf.clone();
    merged.add(Constraint::UnaryBan([RuleName::Lexical].into_iter().collect()));
    assert_eq!(merged.constraints().len(), 2);
    assert!(!merged.is_valid_unary(&[RuleName::Lexical], &shift));
  }
}
