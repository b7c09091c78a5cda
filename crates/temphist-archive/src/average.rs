//! Trailing moving average over a daily series with gaps.

/// Days in the trailing window, current day included.
pub const WINDOW_DAYS: usize = 7;

/// Compute the trailing 7-day mean at every position of `values`.
///
/// The window at position `i` is `[max(0, i - 6) ..= i]`; the mean is taken
/// over only the present values in that window, so a gap shrinks the
/// divisor rather than dragging the average down. A window with no present
/// values yields `None`. The output always has the same length as the input.
pub fn trailing_mean(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = i.saturating_sub(WINDOW_DAYS - 1);
            let window = &values[start..=i];

            let mut sum = 0.0;
            let mut present = 0usize;
            for value in window.iter().flatten() {
                sum += value;
                present += 1;
            }

            if present == 0 {
                None
            } else {
                Some(sum / present as f64)
            }
        })
        .collect()
}
