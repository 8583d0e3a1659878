//! Pearson correlation over dataset columns.

use crate::math::describe::{mean, std_dev};

/// Pearson correlation coefficient of two equal-length columns.
///
/// A column with zero variance carries no linear signal; its correlation
/// with anything is defined as 0.0 here so downstream scans stay total.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    if x.len() < 2 {
        return 0.0;
    }
    let sx = std_dev(x);
    let sy = std_dev(y);
    if sx == 0.0 || sy == 0.0 {
        return 0.0;
    }
    let mx = mean(x);
    let my = mean(y);
    let cov = x
        .iter()
        .zip(y)
        .map(|(a, b)| (a - mx) * (b - my))
        .sum::<f64>()
        / x.len() as f64;
    (cov / (sx * sy)).clamp(-1.0, 1.0)
}

/// Full k×k correlation matrix. Symmetric with a 1.0 diagonal.
pub fn correlation_matrix(columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let k = columns.len();
    let mut matrix = vec![vec![0.0; k]; k];
    for i in 0..k {
        matrix[i][i] = 1.0;
        for j in 0..i {
            let c = pearson(&columns[i], &columns[j]);
            matrix[i][j] = c;
            matrix[j][i] = c;
        }
    }
    matrix
}

/// Find the pair of non-primary columns least correlated with each other and
/// with the primary column.
///
/// Minimizes `|c(i,j)| + |c(primary,i)| + |c(primary,j)|`, scanning stat2 in
/// `1..k` and stat3 in `0..stat2`; the strict `<` keeps the first minimal
/// pair in scan order on ties. Returns `None` when fewer than two candidate
/// columns exist.
pub fn least_correlated_pair(matrix: &[Vec<f64>], primary: usize) -> Option<(usize, usize)> {
    let k = matrix.len();
    let mut best_sum = f64::INFINITY;
    let mut best: Option<(usize, usize)> = None;
    for stat2 in 1..k {
        if stat2 == primary {
            continue;
        }
        for stat3 in 0..stat2 {
            if stat3 == primary {
                continue;
            }
            let sum = matrix[stat2][stat3].abs()
                + matrix[primary][stat2].abs()
                + matrix[primary][stat3].abs();
            if sum < best_sum {
                best_sum = sum;
                best = Some((stat2, stat3));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pearson_perfectly_correlated() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_anti_correlated() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [4.0, 3.0, 2.0, 1.0];
        assert!((pearson(&x, &y) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_zero_variance_is_zero() {
        let x = [3.0, 3.0, 3.0];
        let y = [1.0, 2.0, 3.0];
        assert_eq!(pearson(&x, &y), 0.0);
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let cols = vec![
            vec![1.0, 2.0, 3.0, 5.0],
            vec![2.0, 1.0, 4.0, 3.0],
            vec![0.5, 8.0, 1.0, 2.0],
        ];
        let m = correlation_matrix(&cols);
        for i in 0..3 {
            assert!((m[i][i] - 1.0).abs() < 1e-12);
            for j in 0..3 {
                assert!((m[i][j] - m[j][i]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn least_correlated_pair_picks_independent_columns() {
        // Column 1 duplicates the primary ramp. Columns 2 and 3 follow the
        // symmetric and antisymmetric Legendre-like patterns on six points,
        // so they are exactly uncorrelated with the ramp and each other:
        // the (3, 2) pair scores 0 and every pair involving column 1
        // scores 1.
        let cols = vec![
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0],
            vec![15.0, 9.0, 6.0, 6.0, 9.0, 15.0],
            vec![5.0, 17.0, 14.0, 6.0, 3.0, 15.0],
        ];
        let m = correlation_matrix(&cols);
        let (a, b) = least_correlated_pair(&m, 0).unwrap();
        assert_eq!((a, b), (3, 2));
    }

    #[test]
    fn least_correlated_pair_tie_breaks_in_scan_order() {
        // Identity matrix: every candidate pair scores 0; the first pair in
        // scan order (stat2=2, stat3=1) must win.
        let m = vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 0.0, 1.0],
        ];
        assert_eq!(least_correlated_pair(&m, 0), Some((2, 1)));
    }

    #[test]
    fn least_correlated_pair_needs_two_candidates() {
        let m = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert_eq!(least_correlated_pair(&m, 0), None);
    }
}
