//! The packed parse chart: for every span, at most one cell per category,
//! each cell holding all the derivations found for it.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::category::{Category, Semantics};
use crate::rules::RuleName;
use crate::span::{SentenceSpan, Span};
use crate::utils::log_sum_exp_all;

mod cell;
mod queue;

pub use cell::{Cell, Step};
pub(crate) use queue::CellQueue;

/// Shared predicate
pub type Filter<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Beam bias for a category over a span, added to its viterbi score when
/// ranking
pub type Scorer<MR> = Arc<dyn Fn(&Category<MR>, Span) -> f64 + Send + Sync>;

/// A candidate the parser is about to add, as seen by the pruning filter
#[derive(Debug, Clone)]
pub struct ParsingOp<MR> {
  pub category: Category<MR>,
  pub span: SentenceSpan,
  pub rule: RuleName,
}

/// Per-parse pruning: a hard filter over parsing operations (false means
/// drop) and a soft bias for beam ranking
pub struct Pruning<MR> {
  pub filter: Option<Filter<ParsingOp<MR>>>,
  pub scorer: Option<Scorer<MR>>,
}

impl<MR> Default for Pruning<MR> {
  fn default() -> Self {
    Self {
      filter: None,
      scorer: None,
    }
  }
}

impl<MR> Clone for Pruning<MR> {
  fn clone(&self) -> Self {
    Self {
      filter: self.filter.clone(),
      scorer: self.scorer.clone(),
    }
  }
}

impl<MR: Semantics> Pruning<MR> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_filter(mut self, filter: impl Fn(&ParsingOp<MR>) -> bool + Send + Sync + 'static) -> Self {
    self.filter = Some(Arc::new(filter));
    self
  }

  pub fn with_scorer(mut self, scorer: impl Fn(&Category<MR>, Span) -> f64 + Send + Sync + 'static) -> Self {
    self.scorer = Some(Arc::new(scorer));
    self
  }

  /// True if the filter rejects the operation
  pub fn prunes(&self, op: &ParsingOp<MR>) -> bool {
    self.filter.as_ref().is_some_and(|filter| !filter(op))
  }
}

impl<MR> fmt::Debug for Pruning<MR> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Pruning")
      .field("filter", &self.filter.is_some())
      .field("scorer", &self.scorer.is_some())
      .finish()
  }
}

/// Builds every cell of a parse, so full-parse detection and beam bias are
/// applied the same way wherever a cell comes from
pub struct CellFactory<MR> {
  sentence_length: usize,
  complete_parse_filter: Option<Filter<Category<MR>>>,
  scorer: Option<Scorer<MR>>,
}

impl<MR: Semantics> CellFactory<MR> {
  pub fn new(sentence_length: usize, complete_parse_filter: Option<Filter<Category<MR>>>, scorer: Option<Scorer<MR>>) -> Self {
    Self {
      sentence_length,
      complete_parse_filter,
      scorer,
    }
  }

  pub fn sentence_length(&self) -> usize {
    self.sentence_length
  }

  pub fn sentence_span(&self, span: Span) -> SentenceSpan {
    SentenceSpan::new(span.begin, span.end, self.sentence_length)
  }

  pub fn is_full_parse(&self, category: &Category<MR>, span: Span) -> bool {
    self.sentence_span(span).is_complete() && self.complete_parse_filter.as_ref().is_none_or(|filter| filter(category))
  }

  pub fn create(&self, category: Category<MR>, span: Span, step: Step<MR>) -> Cell<MR> {
    let is_full_parse = self.is_full_parse(&category, span);
    let bias = self.scorer.as_ref().map_or(0.0, |scorer| scorer(&category, span));
    Cell::new(self.sentence_span(span), category, step, bias, is_full_parse)
  }
}

impl<MR> fmt::Debug for CellFactory<MR> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CellFactory")
      .field("sentence_length", &self.sentence_length)
      .field("complete_parse_filter", &self.complete_parse_filter.is_some())
      .field("scorer", &self.scorer.is_some())
      .finish()
  }
}

/// How many cells a span may hold, and how ties at the cutoff are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beam {
  pub size: usize,
  /// When false, lexical cells go to their own uncapped queue
  pub prune_lexical_cells: bool,
  /// Evict a single cell on overflow rather than all tied cells
  pub break_ties: bool,
}

impl Beam {
  pub fn new(size: usize) -> Self {
    Self {
      size,
      prune_lexical_cells: false,
      break_ties: false,
    }
  }

  pub(crate) fn queue<MR: Semantics>(&self) -> CellQueue<MR> {
    CellQueue::bounded(self.size, !self.break_ties)
  }
}

#[derive(Debug)]
struct SpanCells<MR> {
  cells: CellQueue<MR>,
  lexical: Option<CellQueue<MR>>,
  externally_pruned: bool,
}

impl<MR: Semantics> SpanCells<MR> {
  fn new(beam: &Beam) -> Self {
    Self {
      cells: beam.queue(),
      lexical: (!beam.prune_lexical_cells).then(CellQueue::unbounded),
      externally_pruned: false,
    }
  }

  fn offer(&mut self, cell: Cell<MR>) -> bool {
    if let Some(lexical) = self.lexical.as_mut() {
      if lexical.contains(cell.category()) || (cell.is_lexical() && !self.cells.contains(cell.category())) {
        return lexical.offer(cell);
      }
    }
    self.cells.offer(cell)
  }

  fn get(&self, category: &Category<MR>) -> Option<&Arc<Cell<MR>>> {
    self.cells.get(category).or_else(|| self.lexical.as_ref().and_then(|l| l.get(category)))
  }

  fn iter(&self) -> impl Iterator<Item = &Arc<Cell<MR>>> {
    self.cells.iter().chain(self.lexical.iter().flat_map(|l| l.iter()))
  }

  fn len(&self) -> usize {
    self.cells.len() + self.lexical.as_ref().map_or(0, |l| l.len())
  }

  fn is_pruned(&self) -> bool {
    self.externally_pruned || self.cells.is_pruned() || self.lexical.as_ref().is_some_and(|l| l.is_pruned())
  }
}

/// The chart for one sentence. Every span has its own lock, taken only
/// while its cells are read or inserted, so workers only contend when
/// they touch the same span.
pub struct Chart<MR> {
  tokens: Vec<String>,
  beam: Beam,
  factory: CellFactory<MR>,
  spans: Vec<Mutex<SpanCells<MR>>>,
}

impl<MR: Semantics> Chart<MR> {
  pub fn new(tokens: Vec<String>, beam: Beam, factory: CellFactory<MR>) -> Self {
    let n = tokens.len();
    let spans = (0..(n + 1) * (n + 1)).map(|_| Mutex::new(SpanCells::new(&beam))).collect();
    Self {
      tokens,
      beam,
      factory,
      spans,
    }
  }

  pub fn sentence_length(&self) -> usize {
    self.tokens.len()
  }

  pub fn tokens(&self) -> &[String] {
    &self.tokens
  }

  pub fn beam(&self) -> Beam {
    self.beam
  }

  pub fn cell_factory(&self) -> &CellFactory<MR> {
    &self.factory
  }

  fn slot(&self, begin: usize, end: usize) -> Option<MutexGuard<'_, SpanCells<MR>>> {
    if begin >= end || end > self.tokens.len() {
      return None;
    }
    let slot = &self.spans[begin * (self.tokens.len() + 1) + end];
    // a panicking worker aborts the whole parse, so a poisoned span is never read afterwards
    Some(slot.lock().unwrap_or_else(PoisonError::into_inner))
  }

  fn span_lock(&self, span: Span) -> MutexGuard<'_, SpanCells<MR>> {
    match self.slot(span.begin, span.end) {
      Some(guard) => guard,
      None => panic!("span {} outside sentence of length {}", span, self.tokens.len()),
    }
  }

  /// Adds a cell, merging it into an existing cell with the same category
  /// in its span. Returns true if the chart changed.
  pub fn add(&self, cell: Cell<MR>) -> bool {
    trace!(span = %cell.span(), category = %cell.category(), "adding cell");
    self.span_lock(cell.span()).offer(cell)
  }

  /// Adds several cells to one span under a single lock
  pub fn add_all(&self, span: Span, cells: impl IntoIterator<Item = Cell<MR>>) -> usize {
    let mut slot = self.span_lock(span);
    let mut added = 0;
    for cell in cells {
      debug_assert_eq!(cell.span(), span);
      trace!(span = %span, category = %cell.category(), "adding cell");
      if slot.offer(cell) {
        added += 1;
      }
    }
    added
  }

  /// Snapshot of the cells currently in a span
  pub fn span_iter(&self, begin: usize, end: usize) -> std::vec::IntoIter<Arc<Cell<MR>>> {
    let cells = match self.slot(begin, end) {
      Some(slot) => slot.iter().cloned().collect::<Vec<_>>(),
      None => Vec::new(),
    };
    cells.into_iter()
  }

  /// The cell for a category over a span, if there is one
  pub fn get_cell(&self, span: Span, category: &Category<MR>) -> Option<Arc<Cell<MR>>> {
    self.slot(span.begin, span.end)?.get(category).cloned()
  }

  pub fn span_size(&self, begin: usize, end: usize) -> usize {
    self.slot(begin, end).map_or(0, |slot| slot.len())
  }

  /// True if the beam or the pruning filter dropped anything in the span
  pub fn is_pruned(&self, begin: usize, end: usize) -> bool {
    self.slot(begin, end).is_some_and(|slot| slot.is_pruned())
  }

  pub(crate) fn mark_pruned(&self, span: Span) {
    self.span_lock(span).externally_pruned = true;
  }

  pub fn pruned_spans(&self) -> Vec<Span> {
    self
      .all_spans()
      .filter(|span| self.is_pruned(span.begin, span.end))
      .collect()
  }

  pub(crate) fn retain(&self, span: Span, mut keep: impl FnMut(&Cell<MR>) -> bool) {
    let mut slot = self.span_lock(span);
    slot.cells.retain(&mut keep);
    if let Some(lexical) = slot.lexical.as_mut() {
      lexical.retain(&mut keep);
    }
  }

  fn all_spans(&self) -> impl Iterator<Item = Span> + '_ {
    let n = self.tokens.len();
    (1..=n).flat_map(move |len| (0..=n - len).map(move |begin| Span::new(begin, begin + len)))
  }

  pub fn num_cells(&self) -> usize {
    self.all_spans().map(|span| self.span_size(span.begin, span.end)).sum()
  }

  /// Cells over the whole sentence that count as complete parses, best
  /// first
  pub fn full_parses(&self) -> Vec<Arc<Cell<MR>>> {
    let n = self.tokens.len();
    let mut parses = self.span_iter(0, n).filter(|cell| cell.is_full_parse()).collect::<Vec<_>>();
    sort_cells(&mut parses);
    parses
  }

  /// log of the summed inside scores of the full parses that pass `filter`
  pub fn log_norm(&self, filter: impl Fn(&Cell<MR>) -> bool) -> f64 {
    log_sum_exp_all(
      self
        .full_parses()
        .iter()
        .filter(|cell| filter(cell))
        .map(|cell| cell.log_inside_score()),
    )
  }
}

/// Best score first, then by category text so output is stable
fn sort_cells<MR: Semantics>(cells: &mut [Arc<Cell<MR>>]) {
  cells.sort_by(|a, b| {
    b.viterbi_score()
      .total_cmp(&a.viterbi_score())
      .then_with(|| a.category().to_string().cmp(&b.category().to_string()))
  });
}

impl<MR: Semantics> fmt::Display for Chart<MR> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for span in self.all_spans() {
      let mut cells = self.span_iter(span.begin, span.end).collect::<Vec<_>>();
      if cells.is_empty() {
        continue;
      }
      sort_cells(&mut cells);
      writeln!(
        f,
        "Span {} \"{}\"{}:",
        span,
        self.tokens[span.begin..span.end].join(" "),
        if self.is_pruned(span.begin, span.end) { " (pruned)" } else { "" }
      )?;
      for cell in cells {
        writeln!(f, "  {}", cell)?;
      }
    }
    Ok(())
  }
}

impl<MR> fmt::Debug for Chart<MR> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Chart")
      .field("tokens", &self.tokens)
      .field("beam", &self.beam)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::category::CategoryServices;
  use crate::lexicon::LexicalEntry;
  use crate::rules::{BinaryRule, Direction};
  use crate::semantics::{Term, TermServices};

  fn new_chart(tokens: &str, beam: Beam) -> Chart<Term> {
    let tokens = tokens.split(' ').map(str::to_string).collect::<Vec<_>>();
    let factory = CellFactory::new(tokens.len(), None, None);
    Chart::new(tokens, beam, factory)
  }

  fn lexical(chart: &Chart<Term>, text: &str, begin: usize, score: f64) -> Cell<Term> {
    let category = TermServices.read(text).unwrap();
    let token = chart.tokens()[begin].clone();
    let entry = Arc::new(LexicalEntry::new(vec![token], category.clone(), "test"));
    chart.cell_factory().create(category, Span::new(begin, begin + 1), Step::lexical(entry, score))
  }

  #[test]
  fn test_add_is_idempotent() {
    let chart = new_chart("the cat", Beam::new(10));
    assert!(chart.add(lexical(&chart, "N : cat", 1, -1.0)));
    assert!(!chart.add(lexical(&chart, "N : cat", 1, -1.0)));
    assert_eq!(chart.span_size(1, 2), 1);
    assert_eq!(chart.span_iter(1, 2).next().unwrap().steps().len(), 1);
  }

  #[test]
  fn test_add_raises_max_score() {
    let chart = new_chart("the cat", Beam::new(10));
    let the = Arc::new(lexical(&chart, "NP/N : the", 0, 0.0));
    let cat = Arc::new(lexical(&chart, "N : cat", 1, 0.0));
    let np: Category<Term> = TermServices.read("NP : (the cat)").unwrap();
    let span = Span::new(0, 2);
    let forward = BinaryRule::Application(Direction::Forward).name();
    let backward = BinaryRule::Application(Direction::Backward).name();

    let factory = chart.cell_factory();
    chart.add(factory.create(np.clone(), span, Step::binary(forward, the.clone(), cat.clone(), -2.0)));
    chart.add(factory.create(np.clone(), span, Step::binary(backward.clone(), the, cat, -0.5)));

    assert_eq!(chart.span_size(0, 2), 1);
    let cell = chart.get_cell(span, &np).unwrap();
    assert_eq!(cell.viterbi_score(), -0.5);
    assert_eq!(cell.max_step().rule, backward);
    assert!(cell.is_full_parse());
    assert_eq!(chart.full_parses().len(), 1);
    let expected = log_sum_exp_all(vec![-2.0, -0.5]);
    assert!((chart.log_norm(|_| true) - expected).abs() < 1e-12);
    assert_eq!(chart.log_norm(|_| false), f64::NEG_INFINITY);
  }

  #[test]
  fn test_lexical_cells_bypass_beam() {
    let mut beam = Beam::new(1);
    let chart = new_chart("bank", beam);
    chart.add(lexical(&chart, "N : bank", 0, -1.0));
    chart.add(lexical(&chart, "V : bank", 0, -2.0));
    assert_eq!(chart.span_size(0, 1), 2);
    assert!(!chart.is_pruned(0, 1));

    beam.prune_lexical_cells = true;
    let chart = new_chart("bank", beam);
    chart.add(lexical(&chart, "N : bank", 0, -1.0));
    chart.add(lexical(&chart, "V : bank", 0, -2.0));
    assert_eq!(chart.span_size(0, 1), 1);
    assert_eq!(chart.pruned_spans(), vec![Span::new(0, 1)]);
  }

  #[test]
  fn test_full_parse_filter() {
    let tokens = vec!["cats".to_string()];
    let filter: Filter<Category<Term>> = Arc::new(|c: &Category<Term>| c.syntax.to_string() == "S");
    let chart = Chart::new(tokens, Beam::new(10), CellFactory::new(1, Some(filter), None));
    chart.add(lexical(&chart, "NP : cats", 0, 0.0));
    chart.add(lexical(&chart, "S : cats", 0, 0.0));
    let parses = chart.full_parses();
    assert_eq!(parses.len(), 1);
    assert_eq!(parses[0].category().syntax.to_string(), "S");
    assert!(chart.to_string().contains("Span 0..1 \"cats\":"));
  }
}
