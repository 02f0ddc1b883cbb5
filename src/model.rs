use std::collections::HashMap;
use std::sync::Arc;

use crate::category::Semantics;
use crate::lexicon::LexicalEntry;
use crate::rules::ParseRuleResult;
use crate::span::Span;

/// Local scores for derivation steps, in log space. A model is shared by
/// every parser worker.
pub trait Model<MR: Semantics>: Send + Sync {
  fn score_lexical(&self, _entry: &LexicalEntry<MR>, _span: Span) -> f64 {
    0.0
  }

  fn score_rule(&self, _result: &ParseRuleResult<MR>, _span: Span) -> f64 {
    0.0
  }
}

/// Scores every step 0, so each derivation is equally likely
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformModel;

impl<MR: Semantics> Model<MR> for UniformModel {}

/// Fixed weights per lexical entry and per rule label, 0 for anything not
/// listed
#[derive(Debug, Clone)]
pub struct WeightedModel<MR> {
  lexical: HashMap<LexicalEntry<MR>, f64>,
  rules: HashMap<Arc<str>, f64>,
}

impl<MR> Default for WeightedModel<MR> {
  fn default() -> Self {
    Self {
      lexical: HashMap::new(),
      rules: HashMap::new(),
    }
  }
}

impl<MR: Semantics> WeightedModel<MR> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_lexical(mut self, entry: LexicalEntry<MR>, weight: f64) -> Self {
    self.lexical.insert(entry, weight);
    self
  }

  /// Weight for every rule with this label, in any direction
  pub fn with_rule(mut self, label: &str, weight: f64) -> Self {
    self.rules.insert(label.into(), weight);
    self
  }
}

impl<MR: Semantics> Model<MR> for WeightedModel<MR> {
  fn score_lexical(&self, entry: &LexicalEntry<MR>, _span: Span) -> f64 {
    self.lexical.get(entry).copied().unwrap_or(0.0)
  }

  fn score_rule(&self, result: &ParseRuleResult<MR>, _span: Span) -> f64 {
    self.rules.get(result.rule.label()).copied().unwrap_or(0.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::category::{Category, CategoryServices};
  use crate::rules::{BinaryRule, Direction};
  use crate::semantics::{Term, TermServices};

  #[test]
  fn test_weighted_model() {
    let category: Category<Term> = TermServices.read("N : cat").unwrap();
    let entry = LexicalEntry::new(vec!["cat".to_string()], category.clone(), "test");
    let model = WeightedModel::new().with_lexical(entry.clone(), -1.5).with_rule("apply", -0.5);
    let span = Span::new(0, 1);

    // origin doesn't matter for lookup
    let elsewhere = LexicalEntry::new(entry.tokens.clone(), category.clone(), "elsewhere");
    assert_eq!(model.score_lexical(&elsewhere, span), -1.5);

    let applied = ParseRuleResult::new(BinaryRule::Application(Direction::Backward).name(), category.clone());
    assert_eq!(model.score_rule(&applied, span), -0.5);
    let composed = ParseRuleResult::new(BinaryRule::composition(Direction::Forward, 1).name(), category);
    assert_eq!(model.score_rule(&composed, span), 0.0);
    assert_eq!(Model::<Term>::score_lexical(&UniformModel, &entry, span), 0.0);
  }
}
