//! CKY chart parsing. Every span gets a lexical job, one split job per
//! split point, and a unary job; a split job only runs once both of its
//! halves are complete and its span's lexical job has finished.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{info, warn};

use crate::category::{Category, CategoryServices, Semantics};
use crate::chart::{Beam, CellFactory, Chart, Filter, Pruning};
use crate::error::ParseError;
use crate::lexicon::{CompositeLexicon, Lexicon, SentenceLexiconGenerator, SimpleLexicon, WordSkippingGenerator};
use crate::model::Model;
use crate::rules::{
  BinaryParsingRule, BinaryRule, Constraint, Direction, NormalFormValidator, UnaryParsingRule, UnaryRule,
};

mod jobs;
mod multi;
mod single;

/// Where jobs run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduling {
  /// A pool of `threads` workers for each parse
  Concurrent { threads: usize },
  /// Everything on the calling thread
  Sequential,
}

impl Scheduling {
  /// One worker per available core
  pub fn concurrent() -> Self {
    let threads = thread::available_parallelism().map_or(1, |n| n.get());
    Self::Concurrent { threads }
  }
}

impl Default for Scheduling {
  fn default() -> Self {
    Self::concurrent()
  }
}

/// Settings for a single call to [`Parser::parse`]
pub struct ParseOptions<MR> {
  pub pruning: Option<Pruning<MR>>,
  /// also seed the chart from the sloppy lexicon generators
  pub sloppy: bool,
  /// overrides the parser's beam size
  pub beam: Option<usize>,
}

impl<MR> Default for ParseOptions<MR> {
  fn default() -> Self {
    Self {
      pruning: None,
      sloppy: false,
      beam: None,
    }
  }
}

impl<MR> Clone for ParseOptions<MR> {
  fn clone(&self) -> Self {
    Self {
      pruning: self.pruning.clone(),
      sloppy: self.sloppy,
      beam: self.beam,
    }
  }
}

impl<MR> fmt::Debug for ParseOptions<MR> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ParseOptions")
      .field("pruning", &self.pruning)
      .field("sloppy", &self.sloppy)
      .field("beam", &self.beam)
      .finish()
  }
}

impl<MR: Semantics> ParseOptions<MR> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn sloppy() -> Self {
    Self {
      sloppy: true,
      ..Self::default()
    }
  }

  pub fn with_pruning(mut self, pruning: Pruning<MR>) -> Self {
    self.pruning = Some(pruning);
    self
  }

  pub fn with_beam(mut self, beam: usize) -> Self {
    self.beam = Some(beam);
    self
  }
}

pub struct ParserBuilder<MR: Semantics> {
  services: Arc<dyn CategoryServices<MR>>,
  binary_rules: Vec<BinaryRule>,
  unary_rules: Vec<UnaryRule<MR>>,
  normal_form: Option<NormalFormValidator>,
  beam: Beam,
  pre_chart_pruning: bool,
  complete_parse_filter: Option<Filter<Category<MR>>>,
  generators: Vec<Arc<dyn SentenceLexiconGenerator<MR>>>,
  sloppy_generators: Vec<Arc<dyn SentenceLexiconGenerator<MR>>>,
  word_skipping: bool,
  scheduling: Scheduling,
  thread_name: String,
}

impl<MR: Semantics> ParserBuilder<MR> {
  pub fn new(services: impl CategoryServices<MR> + 'static) -> Self {
    Self {
      services: Arc::new(services),
      binary_rules: Vec::new(),
      unary_rules: Vec::new(),
      normal_form: None,
      beam: Beam::new(50),
      pre_chart_pruning: false,
      complete_parse_filter: None,
      generators: Vec::new(),
      sloppy_generators: Vec::new(),
      word_skipping: false,
      scheduling: Scheduling::default(),
      thread_name: "CKY".to_string(),
    }
  }

  pub fn binary_rule(mut self, rule: BinaryRule) -> Self {
    self.binary_rules.push(rule);
    self
  }

  pub fn binary_rules(mut self, rules: impl IntoIterator<Item = BinaryRule>) -> Self {
    self.binary_rules.extend(rules);
    self
  }

  pub fn unary_rule(mut self, rule: UnaryRule<MR>) -> Self {
    self.unary_rules.push(rule);
    self
  }

  pub fn normal_form(mut self, validator: NormalFormValidator) -> Self {
    self.normal_form = Some(validator);
    self
  }

  pub fn beam(mut self, size: usize) -> Self {
    self.beam.size = size;
    self
  }

  pub fn prune_lexical_cells(mut self, prune: bool) -> Self {
    self.beam.prune_lexical_cells = prune;
    self
  }

  pub fn break_ties(mut self, break_ties: bool) -> Self {
    self.beam.break_ties = break_ties;
    self
  }

  /// Rank each split's results against the beam before taking the span
  /// lock. Cheaper under contention, but the beam becomes approximate.
  pub fn pre_chart_pruning(mut self, enabled: bool) -> Self {
    self.pre_chart_pruning = enabled;
    self
  }

  /// Restricts which categories over the whole sentence count as parses
  pub fn complete_parse_filter(mut self, filter: impl Fn(&Category<MR>) -> bool + Send + Sync + 'static) -> Self {
    self.complete_parse_filter = Some(Arc::new(filter));
    self
  }

  pub fn generator(mut self, generator: impl SentenceLexiconGenerator<MR> + 'static) -> Self {
    self.generators.push(Arc::new(generator));
    self
  }

  /// Only used for parses with [`ParseOptions::sloppy`] set
  pub fn sloppy_generator(mut self, generator: impl SentenceLexiconGenerator<MR> + 'static) -> Self {
    self.sloppy_generators.push(Arc::new(generator));
    self
  }

  /// Sloppy parses may skip words: each token can be read as `EMPTY`,
  /// which the skipping rules absorb into a neighbour
  pub fn word_skipping(mut self) -> Self {
    self.word_skipping = true;
    self
  }

  pub fn scheduling(mut self, scheduling: Scheduling) -> Self {
    self.scheduling = scheduling;
    self
  }

  pub fn threads(self, threads: usize) -> Self {
    self.scheduling(Scheduling::Concurrent { threads })
  }

  pub fn thread_name(mut self, prefix: &str) -> Self {
    self.thread_name = prefix.to_string();
    self
  }

  pub fn build(mut self) -> Parser<MR> {
    if self.word_skipping {
      let skipping = [BinaryRule::Skipping(Direction::Forward), BinaryRule::Skipping(Direction::Backward)];
      let banned = skipping.iter().map(|rule| rule.name()).collect();
      self.binary_rules.extend(skipping);
      self.sloppy_generators.push(Arc::new(WordSkippingGenerator));
      self.normal_form = Some(self.normal_form.unwrap_or_default().with(Constraint::UnaryBan(banned)));
    }

    let validator = self.normal_form.map(Arc::new);
    let binary_rules = self
      .binary_rules
      .into_iter()
      .map(|rule| match &validator {
        Some(validator) => BinaryParsingRule::with_validator(rule, validator.clone()),
        None => BinaryParsingRule::new(rule),
      })
      .collect::<Vec<_>>();
    let unary_rules = self
      .unary_rules
      .into_iter()
      .map(|rule| match &validator {
        Some(validator) => UnaryParsingRule::with_validator(rule, validator.clone()),
        None => UnaryParsingRule::new(rule),
      })
      .collect::<Vec<_>>();

    info!(
      binary_rules = binary_rules.len(),
      unary_rules = unary_rules.len(),
      beam = self.beam.size,
      normal_form = validator.is_some(),
      scheduling = ?self.scheduling,
      "built CKY parser"
    );
    if self.pre_chart_pruning {
      warn!("pre-chart pruning is on, beam results are approximate");
    }

    Parser {
      services: self.services,
      binary_rules,
      unary_rules,
      beam: self.beam,
      pre_chart_pruning: self.pre_chart_pruning,
      complete_parse_filter: self.complete_parse_filter,
      generators: self.generators,
      sloppy_generators: self.sloppy_generators,
      scheduling: self.scheduling,
      thread_name: self.thread_name,
    }
  }
}

/// A configured CKY parser. Holds no per-sentence state, so one parser
/// can serve any number of parses.
pub struct Parser<MR: Semantics> {
  services: Arc<dyn CategoryServices<MR>>,
  binary_rules: Vec<BinaryParsingRule>,
  unary_rules: Vec<UnaryParsingRule<MR>>,
  beam: Beam,
  pre_chart_pruning: bool,
  complete_parse_filter: Option<Filter<Category<MR>>>,
  generators: Vec<Arc<dyn SentenceLexiconGenerator<MR>>>,
  sloppy_generators: Vec<Arc<dyn SentenceLexiconGenerator<MR>>>,
  scheduling: Scheduling,
  thread_name: String,
}

impl<MR: Semantics> Parser<MR> {
  pub fn builder(services: impl CategoryServices<MR> + 'static) -> ParserBuilder<MR> {
    ParserBuilder::new(services)
  }

  pub fn services(&self) -> &dyn CategoryServices<MR> {
    &*self.services
  }

  pub fn binary_rules(&self) -> &[BinaryParsingRule] {
    &self.binary_rules
  }

  pub fn unary_rules(&self) -> &[UnaryParsingRule<MR>] {
    &self.unary_rules
  }

  pub fn scheduling(&self) -> Scheduling {
    self.scheduling
  }

  /// Fills a chart for `tokens`. Any job failure aborts the parse; there
  /// is no partial chart.
  pub fn parse(
    &self,
    tokens: &[String],
    lexicon: &dyn Lexicon<MR>,
    model: &dyn Model<MR>,
    options: &ParseOptions<MR>,
  ) -> Result<Chart<MR>, ParseError> {
    let start = Instant::now();
    let beam = match options.beam {
      Some(size) => Beam { size, ..self.beam },
      None => self.beam,
    };
    let scorer = options.pruning.as_ref().and_then(|pruning| pruning.scorer.clone());
    let factory = CellFactory::new(tokens.len(), self.complete_parse_filter.clone(), scorer);
    let chart = Chart::new(tokens.to_vec(), beam, factory);
    if tokens.is_empty() {
      return Ok(chart);
    }

    let generators = self.generators.iter().chain(options.sloppy.then_some(&self.sloppy_generators).into_iter().flatten());
    let sentence_lexicons: Vec<SimpleLexicon<MR>> = generators.map(|g| g.generate_lexicon(tokens)).collect();
    let mut members: Vec<&dyn Lexicon<MR>> = vec![lexicon];
    members.extend(sentence_lexicons.iter().map(|l| l as &dyn Lexicon<MR>));
    let lexicon = CompositeLexicon::new(members);

    let context = jobs::JobContext {
      parser: self,
      chart: &chart,
      lexicon: &lexicon,
      model,
      pruning: options.pruning.as_ref(),
    };
    match self.scheduling {
      Scheduling::Concurrent { threads } => multi::run(&context, threads, &self.thread_name)?,
      Scheduling::Sequential => single::run(&context)?,
    }

    info!(
      tokens = tokens.len(),
      cells = chart.num_cells(),
      full_parses = chart.full_parses().len(),
      pruned_spans = chart.pruned_spans().len(),
      elapsed_ms = start.elapsed().as_millis() as u64,
      "parsed sentence"
    );
    Ok(chart)
  }
}

impl<MR: Semantics> fmt::Debug for Parser<MR> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Parser")
      .field("binary_rules", &self.binary_rules)
      .field("unary_rules", &self.unary_rules)
      .field("beam", &self.beam)
      .field("scheduling", &self.scheduling)
      .finish_non_exhaustive()
  }
}
