//! Concurrent driver: a pool of scoped worker threads pulls jobs from a
//! channel and reports back on another. The calling thread is the only
//! one that touches the schedule.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, error};

use crate::category::Semantics;
use crate::error::ParseError;

use super::jobs::{Job, JobContext, Schedule};

enum Event {
  Done(Job),
  Failed(ParseError),
}

fn worker<MR: Semantics>(context: &JobContext<'_, MR>, jobs: Receiver<Job>, events: Sender<Event>, abort: &AtomicBool) {
  for job in jobs.iter() {
    // after a failure the queue is only drained
    if abort.load(Ordering::Acquire) {
      continue;
    }
    let event = match panic::catch_unwind(AssertUnwindSafe(|| context.run(job))) {
      Ok(()) => Event::Done(job),
      Err(payload) => {
        abort.store(true, Ordering::Release);
        Event::Failed(ParseError::from_panic(job, payload))
      }
    };
    if events.send(event).is_err() {
      break;
    }
  }
}

pub(crate) fn run<MR: Semantics>(context: &JobContext<'_, MR>, threads: usize, thread_name: &str) -> Result<(), ParseError> {
  let mut schedule = Schedule::new(context.chart.sentence_length());
  let abort = AtomicBool::new(false);

  thread::scope(|scope| {
    // created inside the scope so an early return closes the job channel
    // before the scope joins the workers
    let (job_tx, job_rx) = unbounded::<Job>();
    let (event_tx, event_rx) = unbounded::<Event>();

    for idx in 0..threads.max(1) {
      let jobs = job_rx.clone();
      let events = event_tx.clone();
      let abort = &abort;
      thread::Builder::new()
        .name(format!("{}-{}", thread_name, idx))
        .spawn_scoped(scope, move || worker(context, jobs, events, abort))?;
    }
    drop(job_rx);
    drop(event_tx);
    debug!(threads, "workers started");

    for job in schedule.initial_jobs() {
      job_tx.send(job).map_err(|_| ParseError::Disconnected)?;
    }

    while !schedule.is_finished() {
      match event_rx.recv() {
        Ok(Event::Done(job)) => {
          for next in schedule.complete(job) {
            job_tx.send(next).map_err(|_| ParseError::Disconnected)?;
          }
        }
        Ok(Event::Failed(err)) => {
          error!(%err, "aborting parse");
          abort.store(true, Ordering::Release);
          return Err(err);
        }
        Err(_) => return Err(ParseError::Disconnected),
      }
    }
    Ok(())
  })
}
