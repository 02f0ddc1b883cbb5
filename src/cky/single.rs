use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use crate::category::Semantics;
use crate::error::ParseError;

use super::jobs::{JobContext, Schedule};

/// Runs every job on the calling thread, in the order they become ready
pub(crate) fn run<MR: Semantics>(context: &JobContext<'_, MR>) -> Result<(), ParseError> {
  let mut schedule = Schedule::new(context.chart.sentence_length());
  let mut queue = VecDeque::from(schedule.initial_jobs());

  while let Some(job) = queue.pop_front() {
    panic::catch_unwind(AssertUnwindSafe(|| context.run(job))).map_err(|payload| ParseError::from_panic(job, payload))?;
    queue.extend(schedule.complete(job));
  }

  debug_assert!(schedule.is_finished());
  Ok(())
}
