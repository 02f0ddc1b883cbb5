use std::env;
use std::io;
use std::io::Write;
use std::process;

use ccgparse::rules::{BinaryRule, NormalFormValidator};
use ccgparse::semantics::{Term, TermServices};
use ccgparse::{Err, ParseOptions, Parser, Scheduling, SimpleLexicon, UniformModel, tokenize};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} FILE [options]

FILE holds one lexical entry per line, `tokens :- Syntax : semantics`.

Options:
  -h, --help         Print this message
  -c, --chart        Print the parse chart (defaults to not printing)
  -t, --threads N    Number of parser threads (defaults to one per core)
  -b, --beam N       Cells kept per span (defaults to 50)
  -s, --sequential   Parse on the main thread only
      --sloppy       Allow skipping words",
    prog_name
  )
}

fn parse(parser: &Parser<Term>, lexicon: &SimpleLexicon<Term>, sentence: &str, opts: &Args) -> Result<(), Err> {
  let tokens = tokenize(sentence);
  let options = if opts.sloppy { ParseOptions::sloppy() } else { ParseOptions::new() };

  let chart = parser.parse(&tokens, lexicon, &UniformModel, &options)?;

  if opts.print_chart {
    println!("chart:\n{}", chart);
  }

  let parses = chart.full_parses();
  println!("Parsed {} categor{}", parses.len(), if parses.len() == 1 { "y" } else { "ies" });
  for cell in parses {
    println!(
      "{} [{:.3}, {} parse{}]",
      cell.category(),
      cell.viterbi_score(),
      cell.num_parses(),
      if cell.num_parses() == 1 { "" } else { "s" }
    );
  }
  println!();

  Ok(())
}

struct Args {
  filename: String,
  print_chart: bool,
  scheduling: Scheduling,
  beam: usize,
  sloppy: bool,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    let mut iter = v.into_iter();
    let Some(prog_name) = iter.next() else {
      return Err(Self::make_error_message("bad argument vector", "ccgparse-cli"));
    };

    let mut filename: Option<String> = None;
    let mut print_chart = false;
    let mut scheduling = Scheduling::concurrent();
    let mut beam = 50;
    let mut sloppy = false;

    while let Some(o) = iter.next() {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-c" || o == "--chart" {
        print_chart = true;
      } else if o == "-s" || o == "--sequential" {
        scheduling = Scheduling::Sequential;
      } else if o == "--sloppy" {
        sloppy = true;
      } else if o == "-t" || o == "--threads" {
        let threads = Self::number(iter.next(), &o, &prog_name)?;
        scheduling = Scheduling::Concurrent { threads };
      } else if o == "-b" || o == "--beam" {
        beam = Self::number(iter.next(), &o, &prog_name)?;
      } else if filename.is_none() && !o.starts_with('-') {
        filename = Some(o);
      } else {
        return Err(Self::make_error_message("invalid arguments", prog_name));
      }
    }

    if let Some(filename) = filename {
      Ok(Self {
        filename,
        print_chart,
        scheduling,
        beam,
        sloppy,
      })
    } else {
      Err(Self::make_error_message("missing filename", prog_name))
    }
  }

  fn number(value: Option<String>, flag: &str, prog_name: &str) -> Result<usize, String> {
    match value.as_deref().map(str::parse::<usize>) {
      Some(Ok(n)) if n > 0 => Ok(n),
      _ => Err(Self::make_error_message(&format!("{} needs a positive number", flag), prog_name)),
    }
  }
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let opts = match Args::parse(env::args().collect()) {
    Ok(opts) => opts,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  let lexicon = SimpleLexicon::read_from_file(&opts.filename, &TermServices)?;
  info!(entries = lexicon.len(), file = %opts.filename, "loaded lexicon");

  let parser = Parser::builder(TermServices)
    .binary_rules(BinaryRule::application_rules())
    .binary_rules(BinaryRule::composition_rules(2, false))
    .binary_rule(BinaryRule::Punctuation)
    .normal_form(NormalFormValidator::hockenmaier_bisk())
    .word_skipping()
    .beam(opts.beam)
    .scheduling(opts.scheduling)
    .build();

  let mut input = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;

    match io::stdin().read_line(&mut input) {
      Ok(_) => {
        if input.is_empty() {
          // ctrl+d
          return Ok(());
        }
        input.make_ascii_lowercase();
        parse(&parser, &lexicon, input.trim(), &opts)?;
        input.clear();
      }
      Err(error) => return Err(error.into()),
    }
  }
}
