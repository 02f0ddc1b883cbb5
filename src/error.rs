use thiserror::Error;

/// Faults that abort a whole parse invocation. No partial chart is ever
/// returned alongside one of these.
#[derive(Debug, Error)]
pub enum ParseError {
  #[error("parse job {job} panicked: {message}")]
  JobPanicked { job: String, message: String },

  #[error("failed to spawn parser worker: {0}")]
  Spawn(#[from] std::io::Error),

  #[error("parser workers disconnected before all spans completed")]
  Disconnected,
}

impl ParseError {
  /// Builds a `JobPanicked` from the payload `catch_unwind` hands back.
  pub(crate) fn from_panic(job: impl ToString, payload: Box<dyn std::any::Any + Send>) -> Self {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
      s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
      s.clone()
    } else {
      "unknown panic payload".to_string()
    };
    Self::JobPanicked {
      job: job.to_string(),
      message,
    }
  }
}
