//! Likelihood weighting: fit a log-normal per statistic, combine into a
//! joint log-probability per instance, and derive sampling weights.
//!
//! The joint probability assumes independence between the chosen statistics.
//! That is a documented simplification: the goal is diversity of coverage
//! for downstream crawling, not unbiased population estimation, so
//! statistically unusual instances deliberately get larger weights.

use serde::Serialize;
use tracing::{info, warn};

use fedisample_common::{Dataset, Error, Result, StatKey};
use fedisample_math::{
    clamp_joint_log_prob, clamp_log_density, fit_lognormal, inverse_likelihood_weight, LogNormal,
};

/// One fitted statistic.
#[derive(Debug, Clone, Serialize)]
pub struct FittedStat {
    pub stat: StatKey,
    pub fit: LogNormal,
}

/// Fit the chosen statistics and append `log_probability` and `weight`
/// columns to every record.
///
/// Degenerate columns (zero variance) fall back to a uniform density and
/// are reported at warn level. Per-stat log-densities and the joint sum are
/// clamped so every weight is finite and positive.
pub fn assign_weights(dataset: &mut Dataset, stats: &[StatKey]) -> Result<Vec<FittedStat>> {
    if dataset.is_empty() {
        return Err(Error::EmptyDataset);
    }
    let mut fitted = Vec::with_capacity(stats.len());
    for &stat in stats {
        let column = dataset.column(stat);
        let fit = fit_lognormal(&column)
            .map_err(|e| Error::Analysis(format!("fitting {}: {}", stat, e)))?;
        if fit.degenerate {
            warn!(stat = %stat, "degenerate column, falling back to uniform density");
        } else {
            info!(
                stat = %stat,
                shape = fit.shape,
                location = fit.location,
                scale = fit.scale,
                "fitted log-normal"
            );
        }
        fitted.push(FittedStat { stat, fit });
    }

    for record in dataset.records_mut() {
        let mut joint = 0.0;
        for FittedStat { stat, fit } in &fitted {
            joint += clamp_log_density(fit.logpdf(record.stat(*stat)));
        }
        let joint = clamp_joint_log_prob(joint);
        record.log_probability = Some(joint);
        record.weight = Some(inverse_likelihood_weight(joint));
    }
    Ok(fitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedisample_common::InstanceRecord;

    fn record(instance: &str, users: u64) -> InstanceRecord {
        InstanceRecord {
            instance: instance.to_string(),
            total_users: users,
            monthly_active_users: users / 2,
            total_statuses: users * 7,
            mean_weekly_statuses: users as f64 / 3.0,
            mean_weekly_logins: users as f64 / 5.0,
            mean_weekly_registrations: users as f64 / 50.0,
            weekly_statuses_per_user: 1.0 / 3.0,
            weekly_logins_per_user: 0.2,
            weekly_registrations_per_user: 0.02,
            log_probability: None,
            weight: None,
        }
    }

    fn dataset_with_users(users: &[u64]) -> Dataset {
        let mut ds = Dataset::new();
        for (i, &u) in users.iter().enumerate() {
            ds.push(record(&format!("i{i}.example"), u));
        }
        ds
    }

    #[test]
    fn every_record_gets_a_finite_positive_weight() {
        let mut ds = dataset_with_users(&[1, 3, 10, 30, 100, 300, 1000]);
        assign_weights(&mut ds, &[StatKey::TotalUsers, StatKey::TotalStatuses]).unwrap();
        for r in ds.records() {
            let w = r.weight.unwrap();
            assert!(w.is_finite() && w > 0.0, "{}: weight {w}", r.instance);
            assert!(r.log_probability.unwrap().is_finite());
        }
    }

    #[test]
    fn outliers_weigh_more_than_typical_instances() {
        // One extreme instance among a tight cluster.
        let mut ds = dataset_with_users(&[10, 11, 12, 13, 14, 15, 16, 1_000_000]);
        assign_weights(&mut ds, &[StatKey::TotalUsers]).unwrap();
        let outlier = ds.get("i7.example").unwrap().weight.unwrap();
        let typical = ds.get("i3.example").unwrap().weight.unwrap();
        assert!(
            outlier > typical,
            "outlier weight {outlier} <= typical {typical}"
        );
    }

    #[test]
    fn degenerate_column_yields_uniform_weights() {
        let mut ds = dataset_with_users(&[5, 5, 5, 5, 5]);
        assign_weights(&mut ds, &[StatKey::TotalUsers]).unwrap();
        for r in ds.records() {
            assert_eq!(r.log_probability.unwrap(), 0.0);
            assert_eq!(r.weight.unwrap(), 1.0);
        }
    }

    #[test]
    fn empty_dataset_is_an_error() {
        let mut ds = Dataset::new();
        assert!(matches!(
            assign_weights(&mut ds, &[StatKey::TotalUsers]),
            Err(Error::EmptyDataset)
        ));
    }
}
