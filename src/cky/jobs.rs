use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::category::{Category, Semantics};
use crate::chart::{CellQueue, Chart, ParsingOp, Pruning, Step};
use crate::lexicon::Lexicon;
use crate::model::Model;
use crate::rules::RuleName;
use crate::span::{SentenceSpan, Span};
use crate::syntax::Syntax;

use super::Parser;

/// A unit of chart work. A span gets one lexical job and one split job per
/// split point; its unary job runs once all of those are done, and the
/// span is complete when the unary job finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Job {
  Lexical(Span),
  /// combine `begin..mid` with `mid..end`
  Split { span: Span, mid: usize },
  Unary(Span),
}

impl Job {
  pub fn span(&self) -> Span {
    match self {
      Self::Lexical(span) | Self::Split { span, .. } | Self::Unary(span) => *span,
    }
  }
}

impl fmt::Display for Job {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Lexical(span) => write!(f, "lexical {}", span),
      Self::Split { span, mid } => write!(f, "split {} at {}", span, mid),
      Self::Unary(span) => write!(f, "unary {}", span),
    }
  }
}

/// Outstanding obligations per span, and the index of completed spans by
/// their boundaries. Owned by a single coordinator, so completing a span
/// and discovering its neighbours is one step: every split job is issued
/// exactly once, by whichever of its two halves completes last, and held
/// back until the lexical job of its own span has finished.
#[derive(Debug)]
pub(crate) struct Schedule {
  outstanding: HashMap<Span, usize>,
  /// split jobs waiting on the lexical job of their span; a span leaves
  /// this map once its lexical job is done
  unseeded: HashMap<Span, Vec<Job>>,
  /// completed spans by end index
  ends_at: Vec<Vec<Span>>,
  /// completed spans by begin index
  starts_at: Vec<Vec<Span>>,
  incomplete: usize,
}

impl Schedule {
  pub fn new(sentence_length: usize) -> Self {
    let mut outstanding = HashMap::new();
    let mut unseeded = HashMap::new();
    for len in 1..=sentence_length {
      for begin in 0..=sentence_length - len {
        let span = Span::new(begin, begin + len);
        // the lexical job plus one per split point
        outstanding.insert(span, 1 + span.splits().len());
        unseeded.insert(span, Vec::new());
      }
    }
    Self {
      incomplete: outstanding.len(),
      outstanding,
      unseeded,
      ends_at: vec![Vec::new(); sentence_length + 1],
      starts_at: vec![Vec::new(); sentence_length + 1],
    }
  }

  /// Lexical jobs for every span, shortest spans first
  pub fn initial_jobs(&self) -> Vec<Job> {
    let mut spans = self.outstanding.keys().copied().collect::<Vec<_>>();
    spans.sort_by_key(|span| (span.len(), span.begin));
    spans.into_iter().map(Job::Lexical).collect()
  }

  pub fn is_finished(&self) -> bool {
    self.incomplete == 0
  }

  /// Records a finished job and returns the jobs it unblocks
  pub fn complete(&mut self, job: Job) -> Vec<Job> {
    match job {
      Job::Lexical(span) => {
        let mut next = self.unseeded.remove(&span).unwrap_or_default();
        next.extend(self.discharge(span));
        next
      }
      Job::Split { span, .. } => self.discharge(span).into_iter().collect(),
      Job::Unary(span) => self.complete_span(span),
    }
  }

  /// Counts off one lexical or split job, returning the unary job once
  /// none are left
  fn discharge(&mut self, span: Span) -> Option<Job> {
    let remaining = self.outstanding.get_mut(&span)?;
    *remaining -= 1;
    if *remaining > 0 {
      return None;
    }
    self.outstanding.remove(&span);
    Some(Job::Unary(span))
  }

  fn complete_span(&mut self, span: Span) -> Vec<Job> {
    self.incomplete -= 1;
    debug!(%span, remaining = self.incomplete, "span complete");

    let mut splits = Vec::new();
    for left in self.ends_at[span.begin].iter() {
      splits.push(Job::Split {
        span: Span::new(left.begin, span.end),
        mid: span.begin,
      });
    }
    for right in self.starts_at[span.end].iter() {
      splits.push(Job::Split {
        span: Span::new(span.begin, right.end),
        mid: span.end,
      });
    }
    self.ends_at[span.end].push(span);
    self.starts_at[span.begin].push(span);

    let mut next = Vec::new();
    for split in splits {
      match self.unseeded.get_mut(&split.span()) {
        Some(waiting) => waiting.push(split),
        None => next.push(split),
      }
    }
    next
  }
}

/// Everything a job reads while it runs. Shared by reference between
/// workers; the chart is the only thing jobs write to.
pub(crate) struct JobContext<'a, MR: Semantics> {
  pub parser: &'a Parser<MR>,
  pub chart: &'a Chart<MR>,
  pub lexicon: &'a dyn Lexicon<MR>,
  pub model: &'a dyn Model<MR>,
  pub pruning: Option<&'a Pruning<MR>>,
}

impl<MR: Semantics> JobContext<'_, MR> {
  pub fn run(&self, job: Job) {
    trace!(%job, "running job");
    match job {
      Job::Lexical(span) => self.lexical(span),
      Job::Split { span, mid } => self.split(span, mid),
      Job::Unary(span) => self.unary(span),
    }
  }

  fn lexical(&self, span: Span) {
    let factory = self.chart.cell_factory();
    let sentence_span = factory.sentence_span(span);
    let tokens = &self.chart.tokens()[span.begin..span.end];

    let mut pruned = false;
    let mut cells = Vec::new();
    for entry in self.lexicon.get_lex_entries(tokens) {
      if let Some(pruning) = self.pruning {
        let op = ParsingOp {
          category: entry.category.clone(),
          span: sentence_span,
          rule: RuleName::Lexical,
        };
        if pruning.prunes(&op) {
          pruned = true;
          continue;
        }
      }
      let score = self.model.score_lexical(&entry, span);
      cells.push(factory.create(entry.category.clone(), span, Step::lexical(entry, score)));
    }

    if pruned {
      self.chart.mark_pruned(span);
    }
    if !cells.is_empty() {
      let added = self.chart.add_all(span, cells);
      debug!(%span, added, "lexical cells");
    }
  }

  fn split(&self, span: Span, mid: usize) {
    let parser = self.parser;
    let factory = self.chart.cell_factory();
    let sentence_span = factory.sentence_span(span);
    let left = self.chart.span_iter(span.begin, mid).collect::<Vec<_>>();
    let right = self.chart.span_iter(mid, span.end).collect::<Vec<_>>();

    let mut pruned = false;
    let mut candidates = Vec::new();
    for l in left.iter() {
      for r in right.iter() {
        for rule in parser.binary_rules.iter() {
          let Some(result) = rule.apply(l.as_ref(), r.as_ref(), parser.services()) else {
            continue;
          };
          if self.prune(&result.category, sentence_span, &result.rule, false) {
            pruned = true;
            continue;
          }
          let score = self.model.score_rule(&result, span);
          let step = Step::binary(result.rule, l.clone(), r.clone(), score);
          candidates.push(factory.create(result.category, span, step));
        }
      }
    }

    if parser.pre_chart_pruning && !candidates.is_empty() {
      // rank locally first so the span lock is held for fewer inserts
      let mut queue = CellQueue::bounded(self.chart.beam().size * 2 + 1, true);
      for cell in candidates {
        queue.offer(cell);
      }
      pruned |= queue.is_pruned();
      candidates = queue.into_cells().map(Arc::unwrap_or_clone).collect();
    }

    if pruned {
      self.chart.mark_pruned(span);
    }
    if !candidates.is_empty() {
      let added = self.chart.add_all(span, candidates);
      debug!(%span, mid, added, "split cells");
    }
  }

  fn unary(&self, span: Span) {
    let parser = self.parser;
    let factory = self.chart.cell_factory();
    let sentence_span = factory.sentence_span(span);

    if !parser.unary_rules.is_empty() {
      let mut pruned = false;
      let mut shifted = Vec::new();
      for cell in self.chart.span_iter(span.begin, span.end) {
        for rule in parser.unary_rules.iter() {
          let Some(result) = rule.apply(cell.as_ref(), sentence_span, parser.services()) else {
            continue;
          };
          if self.prune(&result.category, sentence_span, &result.rule, true) {
            pruned = true;
            continue;
          }
          let score = self.model.score_rule(&result, span);
          // fold the unary rule into each derivation of its input
          let mut steps = cell.steps().iter().map(|step| step.overload(result.rule.clone(), score));
          let Some(first) = steps.next() else {
            continue;
          };
          let mut new_cell = factory.create(result.category, span, first);
          for step in steps {
            new_cell.add_step(Arc::new(step));
          }
          shifted.push(new_cell);
        }
      }
      if pruned {
        self.chart.mark_pruned(span);
      }
      if !shifted.is_empty() {
        let added = self.chart.add_all(span, shifted);
        debug!(%span, added, "unary cells");
      }
    }

    if sentence_span.is_complete() {
      // only kept around as unary inputs
      self.chart.retain(span, |cell| cell.is_full_parse());
    }
  }

  /// Whether a candidate from a rule should be dropped before it reaches
  /// the chart. On the complete span a candidate has to be a full parse,
  /// or before unary rules run, something a unary rule can turn into one.
  fn prune(&self, category: &Category<MR>, span: SentenceSpan, rule: &RuleName, after_unary: bool) -> bool {
    if category.semantics.is_none() && category.syntax.unify(&Syntax::empty()).is_none() {
      return true;
    }

    if let (Some(pruning), Some(_)) = (self.pruning, &category.semantics) {
      let op = ParsingOp {
        category: category.clone(),
        span,
        rule: rule.clone(),
      };
      if pruning.prunes(&op) {
        return true;
      }
    }

    if span.is_complete() {
      let full = self.chart.cell_factory().is_full_parse(category, span.span);
      if after_unary {
        return !full;
      }
      if !full && !self.parser.unary_rules.iter().any(|rule| rule.is_valid_argument(category, span)) {
        return true;
      }
    }

    false
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_schedule_issues_each_split_once() {
    let n = 5;
    let mut schedule = Schedule::new(n);
    let mut queue = schedule.initial_jobs();
    let mut splits = Vec::new();
    let mut completed = Vec::new();
    let mut seeded = Vec::new();

    // drain in reverse order to shake out ordering assumptions
    while let Some(job) = queue.pop() {
      if let Job::Lexical(span) = job {
        seeded.push(span);
      }
      if let Job::Split { span, mid } = job {
        assert!(seeded.contains(&span), "{} ran before its lexical job", job);
        assert!(completed.contains(&Span::new(span.begin, mid)), "{} ran early", job);
        assert!(completed.contains(&Span::new(mid, span.end)), "{} ran early", job);
        splits.push(job);
      }
      if let Job::Unary(span) = job {
        completed.push(span);
      }
      queue.extend(schedule.complete(job));
    }

    assert!(schedule.is_finished());
    assert_eq!(completed.len(), n * (n + 1) / 2);
    let expected: usize = (1..=n).map(|len| (n - len + 1) * (len - 1)).sum();
    assert_eq!(splits.len(), expected);
    splits.sort_by_key(|job| (job.span(), format!("{}", job)));
    splits.dedup();
    assert_eq!(splits.len(), expected);
  }

  #[test]
  fn test_span_waits_for_all_splits() {
    let mut schedule = Schedule::new(2);
    assert!(schedule.complete(Job::Lexical(Span::new(0, 2))).is_empty());
    assert_eq!(schedule.complete(Job::Lexical(Span::new(0, 1))), vec![Job::Unary(Span::new(0, 1))]);
    assert!(schedule.complete(Job::Unary(Span::new(0, 1))).is_empty());
    assert_eq!(schedule.complete(Job::Lexical(Span::new(1, 2))), vec![Job::Unary(Span::new(1, 2))]);
    let split = Job::Split {
      span: Span::new(0, 2),
      mid: 1,
    };
    assert_eq!(schedule.complete(Job::Unary(Span::new(1, 2))), vec![split]);
    assert_eq!(schedule.complete(split), vec![Job::Unary(Span::new(0, 2))]);
    assert!(!schedule.is_finished());
    assert!(schedule.complete(Job::Unary(Span::new(0, 2))).is_empty());
    assert!(schedule.is_finished());
  }

  #[test]
  fn test_split_waits_for_lexical_job() {
    let mut schedule = Schedule::new(2);
    let split = Job::Split {
      span: Span::new(0, 2),
      mid: 1,
    };
    assert_eq!(schedule.complete(Job::Lexical(Span::new(0, 1))), vec![Job::Unary(Span::new(0, 1))]);
    assert_eq!(schedule.complete(Job::Lexical(Span::new(1, 2))), vec![Job::Unary(Span::new(1, 2))]);
    assert!(schedule.complete(Job::Unary(Span::new(0, 1))).is_empty());
    // both halves are done, but 0..2 hasn't been seeded yet
    assert!(schedule.complete(Job::Unary(Span::new(1, 2))).is_empty());
    assert_eq!(schedule.complete(Job::Lexical(Span::new(0, 2))), vec![split]);
    assert_eq!(schedule.complete(split), vec![Job::Unary(Span::new(0, 2))]);
  }
}
