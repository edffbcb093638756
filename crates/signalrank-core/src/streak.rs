/// Length of the unbroken run of strictly positive values at the head of
/// `series`, which must be ordered most recent first.
///
/// Counting stops at the first value that is zero, negative or NaN.
pub fn consecutive_positive_run(series: &[f64]) -> usize {
    series.iter().take_while(|value| **value > 0.0).count()
}
