//! Weighted sampling without replacement, with probe-driven rejection
//! top-up.
//!
//! Each batch of drawn instances is probed for public API availability;
//! rejected instances leave the pool permanently, and the shortfall is
//! re-drawn from the remaining pool until the target is met or the pool is
//! exhausted. Exhaustion is a degraded but valid outcome.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{info, warn};

use fedisample_common::{Dataset, Error, InstanceRecord, ProbeConfig, Result, SampleResult};

use crate::probe::{probe_with_retries, TimelineProbe};

/// Draw `sample_size` probe-approved instances, weighted by the fitted
/// `weight` column.
///
/// The RNG is injected so callers can fix a seed; weighted sampling without
/// replacement is otherwise inherently randomized.
pub fn sample_weighted<R: Rng + ?Sized>(
    dataset: &Dataset,
    sample_size: usize,
    probe: &dyn TimelineProbe,
    config: &ProbeConfig,
    rng: &mut R,
) -> Result<SampleResult> {
    if dataset.records().iter().any(|r| r.weight.is_none()) {
        return Err(Error::Sampling(
            "dataset has no weight column; assign weights first".into(),
        ));
    }
    let mut pool: Vec<InstanceRecord> = dataset.records().to_vec();
    let mut kept: Vec<InstanceRecord> = Vec::new();
    let mut rejected: Vec<String> = Vec::new();

    while kept.len() < sample_size && !pool.is_empty() {
        let need = sample_size - kept.len();
        let batch = draw_batch(&mut pool, need, rng)?;
        let verdicts = probe_batch(&batch, probe, config);
        for (record, ok) in batch.into_iter().zip(verdicts) {
            if ok {
                kept.push(record);
            } else {
                rejected.push(record.instance);
            }
        }
        info!(
            kept = kept.len(),
            rejected = rejected.len(),
            pool = pool.len(),
            target = sample_size,
            "processed probe batch"
        );
    }

    if kept.len() < sample_size {
        warn!(
            kept = kept.len(),
            target = sample_size,
            "candidate pool exhausted before reaching the target sample size"
        );
    }
    kept.sort_by(|a, b| a.instance.cmp(&b.instance));
    rejected.sort();
    Ok(SampleResult {
        kept,
        rejected,
        target: sample_size,
    })
}

/// Draw up to `count` records weighted without replacement and remove them
/// from the pool.
fn draw_batch<R: Rng + ?Sized>(
    pool: &mut Vec<InstanceRecord>,
    count: usize,
    rng: &mut R,
) -> Result<Vec<InstanceRecord>> {
    let count = count.min(pool.len());
    let drawn: Vec<InstanceRecord> = pool
        .choose_multiple_weighted(rng, count, |r| r.weight.unwrap_or(0.0))
        .map_err(|e| Error::Sampling(e.to_string()))?
        .cloned()
        .collect();
    let drawn_ids: HashSet<&str> = drawn.iter().map(|r| r.instance.as_str()).collect();
    pool.retain(|r| !drawn_ids.contains(r.instance.as_str()));
    Ok(drawn)
}

/// Probe one batch across a bounded worker pool.
///
/// Workers pull indices from a shared counter, so every instance is probed
/// by exactly one worker; the batch boundary is a synchronization point —
/// all verdicts are in before the caller sizes the next draw.
fn probe_batch(
    batch: &[InstanceRecord],
    probe: &dyn TimelineProbe,
    config: &ProbeConfig,
) -> Vec<bool> {
    if batch.is_empty() {
        return Vec::new();
    }
    let workers = config.concurrency.clamp(1, batch.len());
    let next = AtomicUsize::new(0);
    let mut verdicts = vec![false; batch.len()];
    std::thread::scope(|scope| {
        let (tx, rx) = mpsc::channel();
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            scope.spawn(move || loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                if i >= batch.len() {
                    break;
                }
                let ok = probe_with_retries(probe, &batch[i].instance, config.retries);
                if tx.send((i, ok)).is_err() {
                    break;
                }
            });
        }
        drop(tx);
        for (i, ok) in rx {
            verdicts[i] = ok;
        }
    });
    verdicts
}
