use std::error::Error;

/// Boxed static error type
pub type Err = Box<dyn Error + 'static>;

/// Numerically stable `ln(exp(a) + exp(b))`.
///
/// ```
/// let v = ccgparse::utils::log_sum_exp(0.0, 0.0);
/// assert!((v - 2f64.ln()).abs() < 1e-12);
///
/// assert_eq!(ccgparse::utils::log_sum_exp(f64::NEG_INFINITY, -1.5), -1.5);
/// ```
pub fn log_sum_exp(a: f64, b: f64) -> f64 {
  if a == f64::NEG_INFINITY {
    return b;
  }
  if b == f64::NEG_INFINITY {
    return a;
  }
  let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
  hi + (lo - hi).exp().ln_1p()
}

/// `log_sum_exp` folded over an iterator, `-inf` when empty
pub fn log_sum_exp_all(values: impl IntoIterator<Item = f64>) -> f64 {
  values.into_iter().fold(f64::NEG_INFINITY, log_sum_exp)
}

#[test]
fn test_log_sum_exp_all() {
  assert_eq!(log_sum_exp_all(Vec::new()), f64::NEG_INFINITY);
  let v = log_sum_exp_all(vec![1f64.ln(), 2f64.ln(), 3f64.ln()]);
  assert!((v - 6f64.ln()).abs() < 1e-12);
}
