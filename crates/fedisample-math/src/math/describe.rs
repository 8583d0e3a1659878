//! Descriptive statistics over dataset columns.

/// Number of percentile buckets used by the stratifier.
pub const DECILE_BUCKETS: usize = 10;

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance. Returns 0.0 for fewer than two samples.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Decile bucket index per input position: `floor(10 * rank / n)`.
///
/// Rank comes from a stable sort on value, so equal values keep their
/// relative input order. Every returned index is in `0..10`.
pub fn decile_indices(values: &[f64]) -> Vec<usize> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..n).collect();
    // sort_by is stable; ties retain input order.
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut buckets = vec![0usize; n];
    for (rank, &idx) in order.iter().enumerate() {
        buckets[idx] = (DECILE_BUCKETS * rank) / n;
    }
    buckets
}
