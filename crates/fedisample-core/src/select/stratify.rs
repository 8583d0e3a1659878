//! Percentile-bucket stratification.
//!
//! Instances are partitioned into a nested grid of decile buckets: rank the
//! whole population on the first statistic, then re-rank within each bucket
//! on the second, then on the third. Every non-empty leaf cell contributes
//! at least one instance (coverage of every populated corner of the joint
//! distribution, including rare combinations); the rest of the target is
//! filled proportionally to cell population.

use std::collections::BTreeMap;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use fedisample_common::{Dataset, Error, InstanceRecord, Result, StatKey};
use fedisample_math::decile_indices;

/// Result of one stratified draw.
#[derive(Debug, Clone, Serialize)]
pub struct StratifiedSample {
    /// Chosen records, sorted by instance id.
    pub chosen: Vec<InstanceRecord>,
    /// Audit structure: leaf cell key (`b0/b1/b2` up to the stratification
    /// depth) to the instance ids it contains.
    pub buckets: BTreeMap<String, Vec<String>>,
}

/// Draw a stratified sample over up to three statistics.
///
/// Coverage wins over the target: when there are more non-empty cells than
/// `sample_size`, one instance per cell is still taken and no top-up fires.
pub fn sample_stratified<R: Rng + ?Sized>(
    dataset: &Dataset,
    stats: &[StatKey],
    sample_size: usize,
    rng: &mut R,
) -> Result<StratifiedSample> {
    if stats.is_empty() || stats.len() > 3 {
        return Err(Error::Sampling(
            "stratification takes between 1 and 3 statistics".into(),
        ));
    }
    let records = dataset.records();
    let mut cells: BTreeMap<[usize; 3], Vec<usize>> = BTreeMap::new();
    if !records.is_empty() {
        let all: Vec<usize> = (0..records.len()).collect();
        partition(dataset, stats, 0, [0; 3], &all, &mut cells);
    }

    // One uniform draw per non-empty cell, uninformed by weight.
    let mut chosen_rows: Vec<usize> = Vec::new();
    let mut remaining: BTreeMap<[usize; 3], Vec<usize>> = BTreeMap::new();
    for (key, members) in &cells {
        let &pick = members
            .choose(rng)
            .expect("cells are only created non-empty");
        chosen_rows.push(pick);
        remaining.insert(
            *key,
            members.iter().copied().filter(|&r| r != pick).collect(),
        );
    }
    let coverage = chosen_rows.len();

    // Proportional top-up from each cell's remaining population.
    let remaining_target = sample_size.saturating_sub(chosen_rows.len());
    let total_remaining: usize = remaining.values().map(Vec::len).sum();
    if remaining_target > 0 && total_remaining > 0 {
        let fraction = (remaining_target as f64 / total_remaining as f64).min(1.0);
        for members in remaining.values() {
            let take = (members.len() as f64 * fraction).round() as usize;
            chosen_rows.extend(members.choose_multiple(rng, take).copied());
        }
    }

    let mut chosen: Vec<InstanceRecord> =
        chosen_rows.iter().map(|&r| records[r].clone()).collect();
    chosen.sort_by(|a, b| a.instance.cmp(&b.instance));

    let buckets = cells
        .iter()
        .map(|(key, members)| {
            let name = key[..stats.len()]
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join("/");
            let ids = members
                .iter()
                .map(|&r| records[r].instance.clone())
                .collect();
            (name, ids)
        })
        .collect();

    info!(
        cells = cells.len(),
        coverage,
        chosen = chosen.len(),
        target = sample_size,
        "stratified sample drawn"
    );
    Ok(StratifiedSample { chosen, buckets })
}

/// Recursively split `members` into decile buckets of `stats[depth]`,
/// re-ranking within each bucket at the next depth.
fn partition(
    dataset: &Dataset,
    stats: &[StatKey],
    depth: usize,
    prefix: [usize; 3],
    members: &[usize],
    cells: &mut BTreeMap<[usize; 3], Vec<usize>>,
) {
    if depth == stats.len() {
        cells.insert(prefix, members.to_vec());
        return;
    }
    let values: Vec<f64> = members
        .iter()
        .map(|&r| dataset.records()[r].stat(stats[depth]))
        .collect();
    let buckets = decile_indices(&values);
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (pos, &row) in members.iter().enumerate() {
        groups.entry(buckets[pos]).or_default().push(row);
    }
    for (bucket, rows) in groups {
        let mut child = prefix;
        child[depth] = bucket;
        partition(dataset, stats, depth + 1, child, &rows, cells);
    }
}
