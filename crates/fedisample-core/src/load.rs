//! Instance statistics loader.
//!
//! Parses raw per-instance JSONL (one object per line with `instance`,
//! `nodeinfo` and `activity` fields) into a typed [`Dataset`]. Incomplete
//! records are counted and skipped; a line that is not valid JSON aborts the
//! whole load, since there is no meaningful partial result without a valid
//! instance list.

use std::collections::HashSet;
use std::io::BufRead;

use serde::Deserialize;
use tracing::info;

use fedisample_common::{Config, Dataset, Error, InstanceRecord, LoadStats, Result};

/// Raw shape of one input line. Everything beyond the fields used here is
/// ignored; every used field is optional so that absence becomes a counted
/// rejection instead of a parse failure.
#[derive(Debug, Deserialize)]
struct RawRecord {
    instance: String,
    #[serde(default)]
    nodeinfo: Option<RawNodeInfo>,
    #[serde(default)]
    activity: Option<Vec<RawWeek>>,
}

#[derive(Debug, Deserialize)]
struct RawNodeInfo {
    #[serde(default)]
    usage: Option<RawUsage>,
}

#[derive(Debug, Deserialize)]
struct RawUsage {
    #[serde(default)]
    users: Option<RawUsers>,
    #[serde(default, rename = "localPosts")]
    local_posts: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawUsers {
    #[serde(default)]
    total: Option<i64>,
    #[serde(default, rename = "activeMonth")]
    active_month: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawWeek {
    #[serde(default)]
    statuses: Option<i64>,
    #[serde(default)]
    logins: Option<i64>,
    #[serde(default)]
    registrations: Option<i64>,
}

/// Why a raw record was not admitted.
enum Rejection {
    /// Missing node-info/activity, or activity too short to cover the
    /// averaging window.
    Empty,
    /// Denylisted id or impossible (negative) counter values.
    Invalid,
}

/// Load raw records into a dataset.
///
/// Returns the dataset and the diagnostic counters; the counters are also
/// reported at info level.
pub fn load(reader: impl BufRead, config: &Config) -> Result<(Dataset, LoadStats)> {
    let denylist: HashSet<&str> = config.denylist.iter().map(String::as_str).collect();
    let mut dataset = Dataset::new();
    let mut stats = LoadStats::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let raw: RawRecord = serde_json::from_str(&line).map_err(|e| Error::Parse {
            line: line_no + 1,
            message: e.to_string(),
        })?;
        stats.total += 1;
        match admit(raw, &denylist, config.num_weeks) {
            Ok(record) => {
                if !dataset.push(record) {
                    stats.duplicates += 1;
                }
            }
            Err(Rejection::Empty) => stats.empty += 1,
            Err(Rejection::Invalid) => stats.invalid += 1,
        }
    }

    info!(
        total = stats.total,
        empty = stats.empty,
        invalid = stats.invalid,
        duplicates = stats.duplicates,
        admitted = stats.admitted(),
        "loaded instance statistics"
    );
    Ok((dataset, stats))
}

/// Validate one raw record into a typed one, or classify the rejection.
fn admit(
    raw: RawRecord,
    denylist: &HashSet<&str>,
    num_weeks: usize,
) -> std::result::Result<InstanceRecord, Rejection> {
    let instance = raw.instance.trim_end_matches('.').to_string();
    if denylist.contains(instance.as_str()) {
        return Err(Rejection::Invalid);
    }

    let usage = raw
        .nodeinfo
        .and_then(|n| n.usage)
        .ok_or(Rejection::Empty)?;
    let users = usage.users.ok_or(Rejection::Empty)?;
    let total_users = users.total.ok_or(Rejection::Empty)?;
    let monthly_active_users = users.active_month.ok_or(Rejection::Empty)?;
    let total_statuses = usage.local_posts.ok_or(Rejection::Empty)?;
    if total_users < 0 || monthly_active_users < 0 || total_statuses < 0 {
        return Err(Rejection::Invalid);
    }

    let activity = raw.activity.ok_or(Rejection::Empty)?;
    // The first activity entry is the in-progress week; averaging it in
    // would bias the mean downward. Exactly num_weeks complete weeks are
    // required after it.
    if activity.len() < num_weeks + 1 {
        return Err(Rejection::Empty);
    }
    let mut statuses = 0i64;
    let mut logins = 0i64;
    let mut registrations = 0i64;
    for week in &activity[1..=num_weeks] {
        let s = week.statuses.ok_or(Rejection::Empty)?;
        let l = week.logins.ok_or(Rejection::Empty)?;
        let r = week.registrations.ok_or(Rejection::Empty)?;
        if s < 0 || l < 0 || r < 0 {
            return Err(Rejection::Invalid);
        }
        statuses += s;
        logins += l;
        registrations += r;
    }
    let weeks = num_weeks as f64;
    let mean_weekly_statuses = statuses as f64 / weeks;
    let mean_weekly_logins = logins as f64 / weeks;
    let mean_weekly_registrations = registrations as f64 / weeks;
    let per_user = |weekly: f64| {
        if total_users == 0 {
            0.0
        } else {
            weekly / total_users as f64
        }
    };

    Ok(InstanceRecord {
        weekly_statuses_per_user: per_user(mean_weekly_statuses),
        weekly_logins_per_user: per_user(mean_weekly_logins),
        weekly_registrations_per_user: per_user(mean_weekly_registrations),
        instance,
        total_users: total_users as u64,
        monthly_active_users: monthly_active_users as u64,
        total_statuses: total_statuses as u64,
        mean_weekly_statuses,
        mean_weekly_logins,
        mean_weekly_registrations,
        log_probability: None,
        weight: None,
    })
}
