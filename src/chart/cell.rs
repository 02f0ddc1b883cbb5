use std::fmt;
use std::sync::Arc;

use crate::category::{Category, Semantics};
use crate::lexicon::LexicalEntry;
use crate::rules::RuleName;
use crate::span::{SentenceSpan, Span};
use crate::utils::{log_sum_exp, log_sum_exp_all};

/// One way of deriving a cell: a rule over 0-2 child cells, or a lexical
/// entry. Scores are computed once from the children, which belong to
/// completed spans and never change afterwards.
#[derive(Debug, Clone)]
pub struct Step<MR> {
  pub rule: RuleName,
  pub children: Vec<Arc<Cell<MR>>>,
  pub lexical_entry: Option<Arc<LexicalEntry<MR>>>,
  pub local_score: f64,
  viterbi_score: f64,
  inside_score: f64,
  num_parses: u64,
  num_viterbi_parses: u64,
}

impl<MR: Semantics> Step<MR> {
  pub fn new(
    rule: RuleName,
    children: Vec<Arc<Cell<MR>>>,
    lexical_entry: Option<Arc<LexicalEntry<MR>>>,
    local_score: f64,
  ) -> Self {
    let viterbi_score = local_score + children.iter().map(|c| c.viterbi_score()).sum::<f64>();
    let inside_score = local_score + children.iter().map(|c| c.log_inside_score()).sum::<f64>();
    let num_parses = children.iter().fold(1u64, |n, c| n.saturating_mul(c.num_parses()));
    let num_viterbi_parses = children.iter().fold(1u64, |n, c| n.saturating_mul(c.num_viterbi_parses()));
    Self {
      rule,
      children,
      lexical_entry,
      local_score,
      viterbi_score,
      inside_score,
      num_parses,
      num_viterbi_parses,
    }
  }

  pub fn lexical(entry: Arc<LexicalEntry<MR>>, local_score: f64) -> Self {
    Self::new(RuleName::Lexical, Vec::new(), Some(entry), local_score)
  }

  pub fn binary(rule: RuleName, left: Arc<Cell<MR>>, right: Arc<Cell<MR>>, local_score: f64) -> Self {
    Self::new(rule, vec![left, right], None, local_score)
  }

  /// This step with `unary` folded on top: same children, combined name
  /// and score
  pub fn overload(&self, unary: RuleName, unary_score: f64) -> Self {
    Self::new(
      RuleName::overload(unary, self.rule.clone()),
      self.children.clone(),
      self.lexical_entry.clone(),
      self.local_score + unary_score,
    )
  }

  pub fn viterbi_score(&self) -> f64 {
    self.viterbi_score
  }

  pub fn inside_score(&self) -> f64 {
    self.inside_score
  }

  pub fn num_parses(&self) -> u64 {
    self.num_parses
  }

  pub fn is_lexical(&self) -> bool {
    self.lexical_entry.is_some()
  }

  /// Same rule over the same children. Children are compared by span and
  /// category, since a chart holds one cell per pair.
  fn same_derivation(&self, other: &Self) -> bool {
    self.rule == other.rule
      && self.lexical_entry == other.lexical_entry
      && self.children.len() == other.children.len()
      && self
        .children
        .iter()
        .zip(other.children.iter())
        .all(|(a, b)| a.span() == b.span() && a.category() == b.category())
  }
}

/// A packed chart entry: every known derivation of one category over one
/// span, with the scores summarized.
#[derive(Debug, Clone)]
pub struct Cell<MR> {
  span: SentenceSpan,
  category: Category<MR>,
  steps: Vec<Arc<Step<MR>>>,
  viterbi_steps: Vec<Arc<Step<MR>>>,
  viterbi_score: f64,
  log_inside_score: f64,
  num_parses: u64,
  num_viterbi_parses: u64,
  generating_rules: Vec<RuleName>,
  prune_bias: f64,
  is_full_parse: bool,
}

impl<MR: Semantics> Cell<MR> {
  pub(crate) fn new(span: SentenceSpan, category: Category<MR>, step: Step<MR>, prune_bias: f64, is_full_parse: bool) -> Self {
    let step = Arc::new(step);
    Self {
      span,
      category,
      viterbi_score: step.viterbi_score,
      log_inside_score: step.inside_score,
      num_parses: step.num_parses,
      num_viterbi_parses: step.num_viterbi_parses,
      generating_rules: vec![step.rule.clone()],
      viterbi_steps: vec![step.clone()],
      steps: vec![step],
      prune_bias,
      is_full_parse,
    }
  }

  /// Adds a derivation. Returns false if an identical one is already here.
  pub(crate) fn add_step(&mut self, step: Arc<Step<MR>>) -> bool {
    if self.steps.iter().any(|s| s.same_derivation(&step)) {
      return false;
    }

    self.log_inside_score = log_sum_exp(self.log_inside_score, step.inside_score);
    self.num_parses = self.num_parses.saturating_add(step.num_parses);
    if step.viterbi_score > self.viterbi_score {
      self.viterbi_score = step.viterbi_score;
      self.num_viterbi_parses = step.num_viterbi_parses;
      self.viterbi_steps = vec![step.clone()];
    } else if step.viterbi_score == self.viterbi_score {
      self.num_viterbi_parses = self.num_viterbi_parses.saturating_add(step.num_viterbi_parses);
      self.viterbi_steps.push(step.clone());
    }
    if !self.generating_rules.contains(&step.rule) {
      self.generating_rules.push(step.rule.clone());
    }
    self.steps.push(step);
    true
  }

  /// Folds the steps of another cell for the same span and category into
  /// this one. Returns true if any step was new.
  pub(crate) fn merge(&mut self, other: Cell<MR>) -> bool {
    debug_assert!(self.span == other.span && self.category == other.category);
    let mut changed = false;
    for step in other.steps {
      changed |= self.add_step(step);
    }
    changed
  }

  pub fn span(&self) -> Span {
    self.span.span
  }

  pub fn sentence_span(&self) -> SentenceSpan {
    self.span
  }

  pub fn category(&self) -> &Category<MR> {
    &self.category
  }

  pub fn steps(&self) -> &[Arc<Step<MR>>] {
    &self.steps
  }

  /// All steps tied for the best score
  pub fn viterbi_steps(&self) -> &[Arc<Step<MR>>] {
    &self.viterbi_steps
  }

  /// The first step that reached the best score
  pub fn max_step(&self) -> &Arc<Step<MR>> {
    &self.viterbi_steps[0]
  }

  pub fn viterbi_score(&self) -> f64 {
    self.viterbi_score
  }

  pub fn log_inside_score(&self) -> f64 {
    self.log_inside_score
  }

  pub fn num_parses(&self) -> u64 {
    self.num_parses
  }

  pub fn num_viterbi_parses(&self) -> u64 {
    self.num_viterbi_parses
  }

  /// Distinct names of the rules behind this cell's steps
  pub fn generating_rules(&self) -> &[RuleName] {
    &self.generating_rules
  }

  pub fn is_lexical(&self) -> bool {
    self.steps.iter().any(|s| s.is_lexical())
  }

  pub fn is_complete_span(&self) -> bool {
    self.span.is_complete()
  }

  /// Covers the sentence and passed the complete-parse filter
  pub fn is_full_parse(&self) -> bool {
    self.is_full_parse
  }

  /// Primary beam ranking: the viterbi score plus the pruning scorer's
  /// bias for this category
  pub fn prune_score(&self) -> f64 {
    self.viterbi_score + self.prune_bias
  }

  pub fn second_prune_score(&self) -> f64 {
    self.viterbi_score
  }

  /// log of the sum over steps, recomputed from scratch
  pub fn recompute_inside_score(&self) -> f64 {
    log_sum_exp_all(self.steps.iter().map(|s| s.inside_score))
  }
}

impl<MR: Semantics> fmt::Display for Cell<MR> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} {} [{:.3}] {} step{}",
      self.span.span,
      self.category,
      self.viterbi_score,
      self.steps.len(),
      if self.steps.len() == 1 { "" } else { "s" }
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::category::CategoryServices;
  use crate::rules::{BinaryRule, Direction};
  use crate::semantics::{Term, TermServices};

  fn lexical(text: &str, token: &str, begin: usize, score: f64) -> Arc<Cell<Term>> {
    let category = TermServices.read(text).unwrap();
    let entry = Arc::new(LexicalEntry::new(vec![token.to_string()], category.clone(), "test"));
    let span = SentenceSpan::new(begin, begin + 1, 3);
    Arc::new(Cell::new(span, category, Step::lexical(entry, score), 0.0, false))
  }

  #[test]
  fn test_step_scores() {
    let the = lexical("NP/N : the", "the", 0, -1.0);
    let cat = lexical("N : cat", "cat", 1, -2.0);
    let rule = BinaryRule::Application(Direction::Forward).name();
    let step = Step::binary(rule.clone(), the, cat, -0.5);
    assert_eq!(step.viterbi_score(), -3.5);
    assert_eq!(step.inside_score(), -3.5);
    assert_eq!(step.num_parses(), 1);

    let shifted = step.overload(RuleName::unary("shift"), -1.0);
    assert_eq!(shifted.viterbi_score(), -4.5);
    assert_eq!(shifted.children.len(), 2);
    assert_eq!(shifted.rule, RuleName::overload(RuleName::unary("shift"), rule));
  }

  #[test]
  fn test_add_step_tracks_viterbi() {
    let a = lexical("N : a", "a", 0, 0.0);
    let b = lexical("N : b", "b", 1, 0.0);
    let category: Category<Term> = TermServices.read("N : ab").unwrap();
    let span = SentenceSpan::new(0, 2, 3);
    let forward = RuleName::directed("f", Direction::Forward);
    let backward = RuleName::directed("b", Direction::Backward);

    let mut cell = Cell::new(span, category, Step::binary(forward.clone(), a.clone(), b.clone(), -2.0), 0.0, false);
    assert!(!cell.add_step(Arc::new(Step::binary(forward.clone(), a.clone(), b.clone(), -2.0))));
    assert_eq!(cell.steps().len(), 1);

    assert!(cell.add_step(Arc::new(Step::binary(backward.clone(), a.clone(), b.clone(), -1.0))));
    assert_eq!(cell.viterbi_score(), -1.0);
    assert_eq!(cell.max_step().rule, backward);
    assert_eq!(cell.num_parses(), 2);
    assert_eq!(cell.num_viterbi_parses(), 1);
    assert_eq!(cell.generating_rules(), &[forward, backward.clone()]);

    let tied = RuleName::directed("t", Direction::Backward);
    assert!(cell.add_step(Arc::new(Step::binary(tied, a, b, -1.0))));
    assert_eq!(cell.num_viterbi_parses(), 2);
    assert_eq!(cell.viterbi_steps().len(), 2);
    // the first step to reach the max keeps it on a tie
    assert_eq!(cell.max_step().rule, backward);

    let expected = log_sum_exp_all(vec![-2.0, -1.0, -1.0]);
    assert!((cell.log_inside_score() - expected).abs() < 1e-12);
    assert!((cell.recompute_inside_score() - expected).abs() < 1e-12);
  }
}
