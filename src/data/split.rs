//! Stratified train/test split

use super::dataset::LoanSample;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Fisher-Yates shuffle driven by a 64-bit LCG, so a seed gives the same
/// order on every platform
pub(crate) fn lcg_shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng_state = seed;
    for i in (1..items.len()).rev() {
        rng_state = rng_state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let j = (rng_state >> 33) as usize % (i + 1);
        items.swap(i, j);
    }
}

/// Number of test samples per label
///
/// The total is `ceil(n * test_size)` kept within `1..n`. Each class gets
/// the floor of its exact share; the rest goes to the largest remainders
/// (lower label first on ties).
fn test_counts(
    counts: &BTreeMap<usize, usize>,
    n: usize,
    test_size: f64,
) -> BTreeMap<usize, usize> {
    let total = ((n as f64 * test_size).ceil() as usize).clamp(1, n - 1);

    let mut alloc: BTreeMap<usize, usize> = BTreeMap::new();
    let mut remainders: Vec<(usize, f64)> = Vec::with_capacity(counts.len());
    for (&label, &count) in counts {
        let exact = count as f64 * test_size;
        alloc.insert(label, exact.floor() as usize);
        remainders.push((label, exact - exact.floor()));
    }
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut assigned: usize = alloc.values().sum();
    for (label, _) in remainders.iter().cycle() {
        if assigned >= total {
            break;
        }
        if let Some(slot) = alloc.get_mut(label) {
            if *slot < counts[label] {
                *slot += 1;
                assigned += 1;
            }
        }
    }
    alloc
}

/// Split `samples` into `(train, test)`, keeping label proportions
///
/// `test_size` is the test fraction, strictly between 0 and 1. Both sides
/// are non-empty; the result depends only on the input order and `seed`.
pub fn split_dataset(
    samples: &[LoanSample],
    test_size: f64,
    seed: u64,
) -> Result<(Vec<LoanSample>, Vec<LoanSample>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::ConfigError(format!(
            "test_size must be between 0 and 1 (exclusive), got {test_size}"
        )));
    }
    let n = samples.len();
    if n < 2 {
        return Err(Error::ConfigError(format!("need at least 2 samples to split, got {n}")));
    }

    let mut by_label: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, sample) in samples.iter().enumerate() {
        by_label.entry(sample.label).or_default().push(i);
    }
    let counts = by_label.iter().map(|(&l, idx)| (l, idx.len())).collect();
    let test_counts = test_counts(&counts, n, test_size);

    let mut train_idx = Vec::with_capacity(n);
    let mut test_idx = Vec::new();
    for (k, (label, mut indices)) in by_label.into_iter().enumerate() {
        lcg_shuffle(&mut indices, seed.wrapping_add(k as u64));
        let take = test_counts.get(&label).copied().unwrap_or(0);
        test_idx.extend_from_slice(&indices[..take]);
        train_idx.extend_from_slice(&indices[take..]);
    }
    lcg_shuffle(&mut train_idx, seed ^ 0x7472_6169_6e);
    lcg_shuffle(&mut test_idx, seed ^ 0x7465_7374);

    let pick = |idx: &[usize]| -> Vec<LoanSample> {
        idx.iter().map(|&i| samples[i].clone()).collect()
    };
    Ok((pick(&train_idx), pick(&test_idx)))
}
