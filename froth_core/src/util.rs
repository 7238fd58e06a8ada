//! Common time/period helpers for froth_core.

use std::time::Duration;

/// Shortest period a task may run at.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Period for a rate in Hz.
/// - Non-finite or non-positive rates fall back to one second.
/// - Result is at least [`MIN_PERIOD`].
#[inline]
pub fn period_from_hz(hz: f64) -> Duration {
    if !(hz.is_finite() && hz > 0.0) {
        return Duration::from_secs(1);
    }
    Duration::from_secs_f64(1.0 / hz).max(MIN_PERIOD)
}

/// Mean and population standard deviation; `(0, 0)` for an empty input.
pub fn mean_std<I>(values: I) -> (f64, f64)
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: Clone,
{
    let it = values.into_iter();
    let (n, sum) = it.clone().fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let var = it.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    (mean, var.sqrt())
}
