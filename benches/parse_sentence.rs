use criterion::{Criterion, black_box, criterion_group, criterion_main};

use ccgparse::rules::{BinaryRule, NormalFormValidator};
use ccgparse::semantics::{Term, TermServices};
use ccgparse::{ParseOptions, Parser, Scheduling, SimpleLexicon, UniformModel, tokenize};

const LEXICON: &str = r#"
  the :- NP/N : the
  a :- NP/N : a
  big :- N/N : big
  old :- N/N : old
  cat :- N : cat
  dog :- N : dog
  park :- N : park
  saw :- S\NP/NP : saw
  in :- NP\NP/NP : in
  in :- S\NP\(S\NP)/NP : in_vp
  with :- NP\NP/NP : with
  with :- S\NP\(S\NP)/NP : with_vp
  he :- NP : he
  he :- S/(S\NP) : he_raised
"#;

fn parse(parser: &Parser<Term>, lexicon: &SimpleLexicon<Term>, tokens: &[String]) -> usize {
  match parser.parse(tokens, lexicon, &UniformModel, &ParseOptions::new()) {
    Ok(chart) => chart.num_cells(),
    Err(e) => panic!("parse failed: {}", e),
  }
}

fn criterion_benchmark(c: &mut Criterion) {
  let lexicon = SimpleLexicon::read(LEXICON, &TermServices, "bench").unwrap();
  let build = |scheduling| {
    Parser::builder(TermServices)
      .binary_rules(BinaryRule::application_rules())
      .binary_rules(BinaryRule::composition_rules(2, true))
      .normal_form(NormalFormValidator::hockenmaier_bisk())
      .scheduling(scheduling)
      .build()
  };
  let sequential = build(Scheduling::Sequential);
  let concurrent = build(Scheduling::concurrent());

  let simple_input = tokenize("he saw the cat");
  let complex_input = tokenize("he saw the big old dog with a cat in the park with the old dog");

  c.bench_function("parse simple sequential", |b| {
    b.iter(|| parse(black_box(&sequential), &lexicon, black_box(&simple_input)))
  });

  c.bench_function("parse complex sequential", |b| {
    b.iter(|| parse(black_box(&sequential), &lexicon, black_box(&complex_input)))
  });

  c.bench_function("parse complex concurrent", |b| {
    b.iter(|| parse(black_box(&concurrent), &lexicon, black_box(&complex_input)))
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
