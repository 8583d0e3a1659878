//! Correlation analysis: which statistics make good stratification axes.

use serde::Serialize;

use fedisample_common::{Dataset, Error, Result, StatKey};
use fedisample_math::{correlation_matrix, least_correlated_pair};

/// Pearson correlation over all columns plus the recommended pair of
/// stratification statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationReport {
    /// Column order of the matrix.
    pub stats: Vec<StatKey>,
    /// Symmetric k×k Pearson matrix with a 1.0 diagonal.
    pub matrix: Vec<Vec<f64>>,
    /// The fixed primary statistic.
    pub primary: StatKey,
    /// The two statistics least correlated with each other and with the
    /// primary one.
    pub chosen: (StatKey, StatKey),
    /// The minimized sum of absolute correlations.
    pub correlation_sum: f64,
}

/// Compute the correlation matrix and pick stratification axes.
///
/// Scans candidate pairs in row-major order (stat2 ascending, stat3 below
/// it); ties keep the first pair found. Read-only: the dataset is not
/// modified.
pub fn correlate(dataset: &Dataset, primary: StatKey) -> Result<CorrelationReport> {
    if dataset.len() < 2 {
        return Err(Error::NotEnoughData {
            n: dataset.len(),
            min: 2,
        });
    }
    let stats: Vec<StatKey> = StatKey::ALL.to_vec();
    let columns: Vec<Vec<f64>> = stats.iter().map(|&k| dataset.column(k)).collect();
    let matrix = correlation_matrix(&columns);
    let primary_index = stats
        .iter()
        .position(|&k| k == primary)
        .expect("primary key is always one of StatKey::ALL");
    let (i, j) = least_correlated_pair(&matrix, primary_index)
        .ok_or_else(|| Error::Analysis("fewer than two candidate statistics".into()))?;
    let correlation_sum =
        matrix[i][j].abs() + matrix[primary_index][i].abs() + matrix[primary_index][j].abs();
    Ok(CorrelationReport {
        chosen: (stats[i], stats[j]),
        stats,
        matrix,
        primary,
        correlation_sum,
    })
}
