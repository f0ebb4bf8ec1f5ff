// Reservoir samplers shared by the seeders.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::driver::CancelFlag;
use crate::error::{Error, Result};
use crate::seeding::SampleSpace;
use crate::storage::FeatureBlock;

/// Rows handled per parallel chunk when building weighted keys.
const CHUNK_ROWS: usize = 4096;

/// Uniform reservoir sample of up to `count` rows, without replacement.
///
/// Standard one-pass algorithm; the sample size is capped by the population.
/// The pass is cancellable between blocks.
pub fn uniform(
    space: &SampleSpace<'_>,
    count: usize,
    rng: &mut StdRng,
    cancel: &CancelFlag,
) -> Result<Vec<Vec<f32>>> {
    let mut sample: Vec<Vec<f32>> = Vec::with_capacity(count);
    let mut seen = 0u64;
    for block in space.blocks()? {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let block = block?;
        for row in block.iter_rows() {
            seen += 1;
            if sample.len() < count {
                sample.push(row.to_vec());
            } else {
                let j = rng.gen_range(0..seen);
                if (j as usize) < count {
                    sample[j as usize] = row.to_vec();
                }
            }
        }
    }
    Ok(sample)
}

/// Uniform sample of exactly `count` rows with replacement, in draw order.
///
/// Draws row indices against the exact population size, then gathers them in
/// one pass; the result preserves the order the indices were drawn in.
pub fn sample_with_replacement(
    space: &SampleSpace<'_>,
    count: usize,
    rng: &mut StdRng,
    cancel: &CancelFlag,
) -> Result<Vec<Vec<f32>>> {
    let n = space.row_count()?;
    if n == 0 {
        return Err(Error::Invariant("cannot sample from an empty dataset".into()));
    }
    let draws: Vec<u64> = (0..count).map(|_| rng.gen_range(0..n)).collect();
    let mut order: Vec<usize> = (0..count).collect();
    order.sort_by_key(|&slot| draws[slot]);

    let mut out: Vec<Option<Vec<f32>>> = vec![None; count];
    let mut cursor = 0usize;
    let mut offset = 0u64;
    for block in space.blocks()? {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let block = block?;
        let end = offset + block.rows() as u64;
        while cursor < count {
            let slot = order[cursor];
            let target = draws[slot];
            if target >= end {
                break;
            }
            out[slot] = Some(block.row((target - offset) as usize).to_vec());
            cursor += 1;
        }
        offset = end;
        if cursor == count {
            break;
        }
    }

    out.into_iter()
        .map(|row| row.ok_or_else(|| Error::Invariant("sampled row index past end of data".into())))
        .collect()
}

/// One surviving row of a weighted reservoir.
#[derive(Debug, Clone)]
pub struct WeightedItem {
    pub key: f64,
    pub row: Vec<f32>,
    pub weight: f32,
}

impl PartialEq for WeightedItem {
    fn eq(&self, other: &Self) -> bool {
        self.key.total_cmp(&other.key) == Ordering::Equal
    }
}

impl Eq for WeightedItem {}

impl PartialOrd for WeightedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WeightedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.total_cmp(&other.key)
    }
}

/// Weighted reservoir (Efraimidis–Spirakis): keeps the `capacity` rows with
/// the largest keys u^(1/w).
///
/// Per-shard candidate heaps are built in parallel chunks seeded from a
/// caller-supplied value, then merged in chunk order, so a fixed master seed
/// reproduces the sample exactly.
pub struct WeightedReservoir {
    capacity: usize,
    heap: BinaryHeap<std::cmp::Reverse<WeightedItem>>,
}

impl WeightedReservoir {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity + 1),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Feeds one block with row-aligned weights. Zero-weight rows never enter
    /// the reservoir.
    pub fn observe_block(&mut self, block: &FeatureBlock, weights: &[f32], seed: u64) {
        debug_assert_eq!(block.rows(), weights.len());
        let capacity = self.capacity;
        let chunks: Vec<BinaryHeap<std::cmp::Reverse<WeightedItem>>> = (0..block.rows())
            .collect::<Vec<_>>()
            .par_chunks(CHUNK_ROWS)
            .enumerate()
            .map(|(ci, rows)| {
                let mut rng =
                    StdRng::seed_from_u64(seed.wrapping_add((ci as u64).wrapping_mul(0x9e3779b97f4a7c15)));
                let mut heap = BinaryHeap::with_capacity(capacity + 1);
                for &i in rows {
                    let w = weights[i];
                    if w <= 0.0 {
                        continue;
                    }
                    let u: f64 = rng.gen();
                    let key = u.powf(1.0 / f64::from(w));
                    push_bounded(
                        &mut heap,
                        capacity,
                        WeightedItem {
                            key,
                            row: block.row(i).to_vec(),
                            weight: w,
                        },
                    );
                }
                heap
            })
            .collect();
        for heap in chunks {
            for item in heap.into_vec() {
                push_bounded(&mut self.heap, capacity, item.0);
            }
        }
    }

    /// Drains the reservoir, largest key first. The order is deterministic
    /// given the observed data and seeds.
    pub fn into_sorted(self) -> Vec<WeightedItem> {
        let mut items: Vec<WeightedItem> = self.heap.into_vec().into_iter().map(|r| r.0).collect();
        items.sort_by(|a, b| b.key.total_cmp(&a.key));
        items
    }
}

fn push_bounded(
    heap: &mut BinaryHeap<std::cmp::Reverse<WeightedItem>>,
    capacity: usize,
    item: WeightedItem,
) {
    if capacity == 0 {
        return;
    }
    heap.push(std::cmp::Reverse(item));
    if heap.len() > capacity {
        heap.pop();
    }
}
