#[macro_use]
extern crate lazy_static;

pub mod category;
pub mod chart;
pub mod cky;
pub mod error;
pub mod lexicon;
pub mod model;
pub mod read;
pub mod rules;
pub mod semantics;
pub mod span;
pub mod syntax;
pub mod utils;

pub use crate::category::{Category, CategoryServices, Semantics};
pub use crate::chart::{Cell, Chart, Pruning, Step};
pub use crate::cky::{ParseOptions, Parser, ParserBuilder, Scheduling};
pub use crate::error::ParseError;
pub use crate::lexicon::{LexicalEntry, Lexicon, SimpleLexicon};
pub use crate::model::{Model, UniformModel};
pub use crate::span::Span;
pub use crate::syntax::{Slash, Syntax};
pub use crate::utils::Err;

/// Splits a sentence on whitespace. Tokens are looked up in the lexicon
/// verbatim.
pub fn tokenize(sentence: &str) -> Vec<String> {
  sentence.split_whitespace().map(str::to_string).collect()
}
