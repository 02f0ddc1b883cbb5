use std::fmt;
use std::sync::Arc;

use crate::Err;
use crate::category::{Category, CategoryServices, Semantics};
use crate::chart::Cell;
use crate::span::SentenceSpan;
use crate::syntax::{Slash, Syntax};

pub mod normal_form;

pub use normal_form::{Constraint, NormalFormValidator};

pub const APPLICATION_LABEL: &str = "apply";
pub const COMPOSITION_LABEL: &str = "comp";
pub const CROSS_COMPOSITION_LABEL: &str = "xcomp";
pub const PUNCTUATION_LABEL: &str = "punct";
pub const SKIPPING_LABEL: &str = "skip";
pub const LEXICAL_LABEL: &str = "lex";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
  Forward,
  Backward,
}

impl fmt::Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Forward => write!(f, ">"),
      Self::Backward => write!(f, "<"),
    }
  }
}

/// Names the operation that created a derivation step. Normal-form
/// constraints and models only ever look at these names, never at the
/// rules themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleName {
  /// Read directly from the lexicon
  Lexical,
  Rule {
    label: Arc<str>,
    direction: Option<Direction>,
    /// composition order, 0 for everything else
    order: usize,
  },
  /// A unary rule folded into the step that produced its input
  Overloaded { unary: Box<RuleName>, base: Box<RuleName> },
}

impl RuleName {
  pub fn new(label: &str, direction: Option<Direction>, order: usize) -> Self {
    Self::Rule {
      label: label.into(),
      direction,
      order,
    }
  }

  pub fn directed(label: &str, direction: Direction) -> Self {
    Self::new(label, Some(direction), 0)
  }

  pub fn unary(label: &str) -> Self {
    Self::new(label, None, 0)
  }

  pub fn overload(unary: RuleName, base: RuleName) -> Self {
    Self::Overloaded {
      unary: Box::new(unary),
      base: Box::new(base),
    }
  }

  /// Label of the outermost operation
  pub fn label(&self) -> &str {
    match self {
      Self::Lexical => LEXICAL_LABEL,
      Self::Rule { label, .. } => label,
      Self::Overloaded { unary, .. } => unary.label(),
    }
  }

  pub fn direction(&self) -> Option<Direction> {
    match self {
      Self::Lexical => None,
      Self::Rule { direction, .. } => *direction,
      Self::Overloaded { unary, .. } => unary.direction(),
    }
  }

  pub fn order(&self) -> usize {
    match self {
      Self::Lexical => 0,
      Self::Rule { order, .. } => *order,
      Self::Overloaded { unary, .. } => unary.order(),
    }
  }

  pub fn is_application(&self) -> bool {
    self.label() == APPLICATION_LABEL
  }

  pub fn is_composition(&self) -> bool {
    matches!(self.label(), COMPOSITION_LABEL | CROSS_COMPOSITION_LABEL)
  }
}

impl fmt::Display for RuleName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Lexical => write!(f, "{}", LEXICAL_LABEL),
      Self::Rule {
        label,
        direction,
        order,
      } => {
        if let Some(direction) = direction {
          write!(f, "{}", direction)?;
        }
        write!(f, "{}", label)?;
        if *order > 0 {
          write!(f, "{}", order)?;
        }
        Ok(())
      }
      Self::Overloaded { unary, base } => write!(f, "{}+{}", unary, base),
    }
  }
}

/// A category produced by a rule, and the name of the rule that made it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRuleResult<MR> {
  pub rule: RuleName,
  pub category: Category<MR>,
}

impl<MR> ParseRuleResult<MR> {
  pub fn new(rule: RuleName, category: Category<MR>) -> Self {
    Self { rule, category }
  }
}

impl<MR: fmt::Display> fmt::Display for ParseRuleResult<MR> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}->{}", self.rule, self.category)
  }
}

/// The binary combinators. Rules are plain values, so one set can be
/// shared by every worker without synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BinaryRule {
  /// `X/Y Y => X` forward, `Y X\Y => X` backward
  Application(Direction),
  /// `X/Y Y/Z => X/Z` forward, `Y\Z X\Y => X\Z` backward. Crossed
  /// composition (`X/Y Y\Z => X\Z`) is first order only.
  Composition {
    direction: Direction,
    order: usize,
    cross: bool,
  },
  /// `X PUNCT => X`
  Punctuation,
  /// `X EMPTY => X` forward, `EMPTY X => X` backward
  Skipping(Direction),
}

impl BinaryRule {
  pub fn composition(direction: Direction, order: usize) -> Self {
    Self::Composition {
      direction,
      order,
      cross: false,
    }
  }

  pub fn crossed_composition(direction: Direction) -> Self {
    Self::Composition {
      direction,
      order: 1,
      cross: true,
    }
  }

  /// Forward and backward application
  pub fn application_rules() -> Vec<Self> {
    vec![Self::Application(Direction::Forward), Self::Application(Direction::Backward)]
  }

  /// Forward and backward composition for orders `1..=max_order`, plus
  /// first-order crossed composition in both directions if `crossing`
  pub fn composition_rules(max_order: usize, crossing: bool) -> Vec<Self> {
    let mut rules = Vec::new();
    for order in 1..=max_order {
      rules.push(Self::composition(Direction::Forward, order));
      rules.push(Self::composition(Direction::Backward, order));
    }
    if crossing {
      rules.push(Self::crossed_composition(Direction::Forward));
      rules.push(Self::crossed_composition(Direction::Backward));
    }
    rules
  }

  pub fn name(&self) -> RuleName {
    match self {
      Self::Application(direction) => RuleName::directed(APPLICATION_LABEL, *direction),
      Self::Composition {
        direction,
        order,
        cross,
      } => {
        let label = if *cross { CROSS_COMPOSITION_LABEL } else { COMPOSITION_LABEL };
        RuleName::new(label, Some(*direction), *order)
      }
      Self::Punctuation => RuleName::directed(PUNCTUATION_LABEL, Direction::Forward),
      Self::Skipping(direction) => RuleName::directed(SKIPPING_LABEL, *direction),
    }
  }

  pub fn apply<MR, S>(&self, left: &Category<MR>, right: &Category<MR>, services: &S) -> Option<ParseRuleResult<MR>>
  where
    MR: Semantics,
    S: CategoryServices<MR> + ?Sized,
  {
    let category = match self {
      Self::Application(direction) => {
        let (function, argument, slash) = match direction {
          Direction::Forward => (left, right, Slash::Forward),
          Direction::Backward => (right, left, Slash::Backward),
        };
        if function.slash() != Some(slash) {
          return None;
        }
        services.apply(function, argument)?
      }
      Self::Composition {
        direction,
        order,
        cross,
      } => {
        let (primary, secondary, slash) = match direction {
          Direction::Forward => (left, right, Slash::Forward),
          Direction::Backward => (right, left, Slash::Backward),
        };
        if primary.slash() != Some(slash) || !secondary.is_complex() {
          return None;
        }
        services.compose(primary, secondary, *order, *cross)?
      }
      Self::Punctuation => {
        if right.syntax != Syntax::punct() {
          return None;
        }
        left.clone()
      }
      Self::Skipping(Direction::Forward) => {
        if *right != Category::empty() {
          return None;
        }
        left.clone()
      }
      Self::Skipping(Direction::Backward) => {
        if *left != Category::empty() {
          return None;
        }
        right.clone()
      }
    };
    Some(ParseRuleResult::new(self.name(), category))
  }
}

impl fmt::Display for BinaryRule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

/// Application type-shifting: a unary rule that applies a fixed function
/// category to its input, e.g. `N => NP` through `NP/N : a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeShifting<MR> {
  name: RuleName,
  function: Category<MR>,
  input: Syntax,
  pub start_only: bool,
  pub end_only: bool,
  /// require the input syntax to equal the function's argument, not just unify with it
  pub match_syntax: bool,
}

impl<MR: Semantics> TypeShifting<MR> {
  pub fn new(label: &str, function: Category<MR>) -> Result<Self, Err> {
    let input = match function.syntax.as_complex() {
      Some(functor) => functor.right.clone(),
      None => return Err(format!("type-shifting function {} is not a functor", function).into()),
    };
    if function.semantics.is_none() {
      return Err(format!("type-shifting function {} has no semantics", function).into());
    }
    Ok(Self {
      name: RuleName::unary(label),
      function,
      input,
      start_only: false,
      end_only: false,
      match_syntax: false,
    })
  }

  /// Only fire on spans that cover the whole sentence
  pub fn complete_only(mut self) -> Self {
    self.start_only = true;
    self.end_only = true;
    self
  }

  pub fn name(&self) -> &RuleName {
    &self.name
  }

  fn span_allowed(&self, span: SentenceSpan) -> bool {
    (!self.start_only || span.is_start()) && (!self.end_only || span.is_end())
  }

  pub fn is_valid_argument(&self, category: &Category<MR>, span: SentenceSpan) -> bool {
    if !self.span_allowed(span) {
      return false;
    }
    if self.match_syntax {
      self.input == category.syntax
    } else {
      self.input.unify(&category.syntax).is_some()
    }
  }

  pub fn apply<S>(&self, category: &Category<MR>, span: SentenceSpan, services: &S) -> Option<ParseRuleResult<MR>>
  where
    S: CategoryServices<MR> + ?Sized,
  {
    if !self.span_allowed(span) || (self.match_syntax && self.input != category.syntax) {
      return None;
    }
    let shifted = services.apply(&self.function, category)?;
    Some(ParseRuleResult::new(self.name.clone(), shifted))
  }
}

/// The unary rules. Unary results are folded into the steps of their input
/// cell, so they never depend on a cell of the span they are building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnaryRule<MR> {
  TypeShifting(TypeShifting<MR>),
}

impl<MR: Semantics> UnaryRule<MR> {
  pub fn name(&self) -> &RuleName {
    match self {
      Self::TypeShifting(rule) => rule.name(),
    }
  }

  pub fn is_valid_argument(&self, category: &Category<MR>, span: SentenceSpan) -> bool {
    match self {
      Self::TypeShifting(rule) => rule.is_valid_argument(category, span),
    }
  }

  pub fn apply<S>(&self, category: &Category<MR>, span: SentenceSpan, services: &S) -> Option<ParseRuleResult<MR>>
  where
    S: CategoryServices<MR> + ?Sized,
  {
    match self {
      Self::TypeShifting(rule) => rule.apply(category, span, services),
    }
  }
}

impl<MR: Semantics> fmt::Display for UnaryRule<MR> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

/// A binary rule as the chart parser runs it: over cells rather than
/// categories, behind an optional normal-form check on how the children
/// were derived.
#[derive(Debug, Clone)]
pub struct BinaryParsingRule {
  pub rule: BinaryRule,
  validator: Option<Arc<NormalFormValidator>>,
}

impl BinaryParsingRule {
  pub fn new(rule: BinaryRule) -> Self {
    Self { rule, validator: None }
  }

  pub fn with_validator(rule: BinaryRule, validator: Arc<NormalFormValidator>) -> Self {
    Self {
      rule,
      validator: Some(validator),
    }
  }

  pub fn name(&self) -> RuleName {
    self.rule.name()
  }

  pub fn apply<MR, S>(&self, left: &Cell<MR>, right: &Cell<MR>, services: &S) -> Option<ParseRuleResult<MR>>
  where
    MR: Semantics,
    S: CategoryServices<MR> + ?Sized,
  {
    if let Some(validator) = &self.validator {
      if !validator.is_valid_binary(left.generating_rules(), right.generating_rules(), &self.rule.name()) {
        return None;
      }
    }
    self.rule.apply(left.category(), right.category(), services)
  }
}

impl fmt::Display for BinaryParsingRule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.rule)
  }
}

/// Unary counterpart of [`BinaryParsingRule`]
#[derive(Debug, Clone)]
pub struct UnaryParsingRule<MR> {
  pub rule: UnaryRule<MR>,
  validator: Option<Arc<NormalFormValidator>>,
}

impl<MR: Semantics> UnaryParsingRule<MR> {
  pub fn new(rule: UnaryRule<MR>) -> Self {
    Self { rule, validator: None }
  }

  pub fn with_validator(rule: UnaryRule<MR>, validator: Arc<NormalFormValidator>) -> Self {
    Self {
      rule,
      validator: Some(validator),
    }
  }

  pub fn name(&self) -> &RuleName {
    self.rule.name()
  }

  pub fn is_valid_argument(&self, category: &Category<MR>, span: SentenceSpan) -> bool {
    self.rule.is_valid_argument(category, span)
  }

  pub fn apply<S>(&self, cell: &Cell<MR>, span: SentenceSpan, services: &S) -> Option<ParseRuleResult<MR>>
  where
    S: CategoryServices<MR> + ?Sized,
  {
    if let Some(validator) = &self.validator {
      if !validator.is_valid_unary(cell.generating_rules(), self.rule.name()) {
        return None;
      }
    }
    self.rule.apply(cell.category(), span, services)
  }
}

impl<MR: Semantics> fmt::Display for UnaryParsingRule<MR> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.rule)
  }
}
