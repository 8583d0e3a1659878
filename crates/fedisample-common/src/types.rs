//! The tabular instance dataset and its statistic keys.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A named per-instance statistic column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKey {
    TotalUsers,
    MonthlyActiveUsers,
    TotalStatuses,
    WeeklyStatuses,
    WeeklyLogins,
    WeeklyRegistrations,
    WeeklyStatusesPerUser,
    WeeklyLoginsPerUser,
    WeeklyRegistrationsPerUser,
}

impl StatKey {
    /// All columns, in canonical order. `TotalUsers` comes first; the
    /// correlation analyzer uses it as the default primary statistic.
    pub const ALL: [StatKey; 9] = [
        StatKey::TotalUsers,
        StatKey::MonthlyActiveUsers,
        StatKey::TotalStatuses,
        StatKey::WeeklyStatuses,
        StatKey::WeeklyLogins,
        StatKey::WeeklyRegistrations,
        StatKey::WeeklyStatusesPerUser,
        StatKey::WeeklyLoginsPerUser,
        StatKey::WeeklyRegistrationsPerUser,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StatKey::TotalUsers => "total_users",
            StatKey::MonthlyActiveUsers => "monthly_active_users",
            StatKey::TotalStatuses => "total_statuses",
            StatKey::WeeklyStatuses => "weekly_statuses",
            StatKey::WeeklyLogins => "weekly_logins",
            StatKey::WeeklyRegistrations => "weekly_registrations",
            StatKey::WeeklyStatusesPerUser => "weekly_statuses_per_user",
            StatKey::WeeklyLoginsPerUser => "weekly_logins_per_user",
            StatKey::WeeklyRegistrationsPerUser => "weekly_registrations_per_user",
        }
    }
}

impl std::fmt::Display for StatKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for StatKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatKey::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown statistic: {}", s))
    }
}

/// One admitted fediverse instance with its statistics.
///
/// Constructed once by the loader; the fitter appends `log_probability` and
/// `weight` later, everything else is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Normalized hostname (trailing dots stripped); unique key.
    pub instance: String,
    pub total_users: u64,
    pub monthly_active_users: u64,
    pub total_statuses: u64,
    /// Mean over the N most recent complete weeks.
    pub mean_weekly_statuses: f64,
    pub mean_weekly_logins: f64,
    pub mean_weekly_registrations: f64,
    /// Weekly means divided by total users; 0.0 on zero-user instances.
    pub weekly_statuses_per_user: f64,
    pub weekly_logins_per_user: f64,
    pub weekly_registrations_per_user: f64,
    /// Joint log-probability under the fitted per-stat distributions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_probability: Option<f64>,
    /// Sampling weight `exp(-log_probability)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl InstanceRecord {
    /// Column value for a statistic key.
    pub fn stat(&self, key: StatKey) -> f64 {
        match key {
            StatKey::TotalUsers => self.total_users as f64,
            StatKey::MonthlyActiveUsers => self.monthly_active_users as f64,
            StatKey::TotalStatuses => self.total_statuses as f64,
            StatKey::WeeklyStatuses => self.mean_weekly_statuses,
            StatKey::WeeklyLogins => self.mean_weekly_logins,
            StatKey::WeeklyRegistrations => self.mean_weekly_registrations,
            StatKey::WeeklyStatusesPerUser => self.weekly_statuses_per_user,
            StatKey::WeeklyLoginsPerUser => self.weekly_logins_per_user,
            StatKey::WeeklyRegistrationsPerUser => self.weekly_registrations_per_user,
        }
    }
}

/// Ordered collection of instance records keyed by normalized hostname.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<InstanceRecord>,
    index: HashMap<String, usize>,
}

impl Dataset {
    pub fn new() -> Self {
        Dataset::default()
    }

    /// Insert a record. Returns false (and drops the record) when the
    /// instance id is already present: first-seen wins.
    pub fn push(&mut self, record: InstanceRecord) -> bool {
        if self.index.contains_key(&record.instance) {
            return false;
        }
        self.index
            .insert(record.instance.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[InstanceRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [InstanceRecord] {
        &mut self.records
    }

    pub fn get(&self, instance: &str) -> Option<&InstanceRecord> {
        self.index.get(instance).map(|&i| &self.records[i])
    }

    /// Column-wise numeric access by statistic name.
    pub fn column(&self, key: StatKey) -> Vec<f64> {
        self.records.iter().map(|r| r.stat(key)).collect()
    }
}

/// Diagnostic counters from one load pass. Advisory output, not part of the
/// loader's return contract.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LoadStats {
    /// Raw records seen in the input.
    pub total: usize,
    /// Dropped for missing node-info/activity.
    pub empty: usize,
    /// Dropped for denylisted ids or impossible values.
    pub invalid: usize,
    /// Dropped as duplicate of an already admitted id.
    pub duplicates: usize,
}

impl LoadStats {
    pub fn admitted(&self) -> usize {
        self.total - self.empty - self.invalid - self.duplicates
    }
}

/// Outcome of a weighted sampling run.
#[derive(Debug, Clone, Serialize)]
pub struct SampleResult {
    /// Kept instances, sorted by id for deterministic output files.
    pub kept: Vec<InstanceRecord>,
    /// All ids drawn but rejected by the availability probe, sorted.
    pub rejected: Vec<String>,
    /// The requested sample size.
    pub target: usize,
}

impl SampleResult {
    /// False when the candidate pool was exhausted before the target was
    /// reached (degraded but valid outcome).
    pub fn target_met(&self) -> bool {
        self.kept.len() >= self.target
    }
}
