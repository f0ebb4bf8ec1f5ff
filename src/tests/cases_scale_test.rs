//! Multi-shard and out-of-core discipline scenarios.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::driver::write_assignments;
use crate::paths::derived_path;
use crate::seeding::SeederKind;
use crate::storage::{self, Shard, StorageFormat, SHARD_ROWS};
use crate::tests::support::euclidean_config;
use crate::{cluster_file, cluster_rows, Configuration};

fn random_rows(n: usize, seed: u64) -> impl Iterator<Item = Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(move |_| {
        vec![
            rng.gen_range(0..=1000) as f32,
            rng.gen_range(0..=1000) as f32,
            rng.gen_range(0..=1000) as f32,
        ]
    })
}

/// Batches a row iterator into multiple shards for writing.
fn sharded(
    columns: Vec<String>,
    mut rows: impl Iterator<Item = Vec<f32>>,
) -> impl Iterator<Item = crate::Result<Shard>> {
    std::iter::from_fn(move || {
        let batch: Vec<Vec<f32>> = rows.by_ref().take(SHARD_ROWS).collect();
        if batch.is_empty() {
            None
        } else {
            Some(Shard::from_feature_rows(&columns, &batch))
        }
    })
}

/// Test a run that spans several shards end to end, with row-aligned
/// assignments across the whole file.
#[test]
fn test_multi_shard_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bulk.parquet");
    let columns: Vec<String> = vec!["wins".into(), "losses".into(), "draws".into()];
    let n = SHARD_ROWS * 2 + 5000;

    let written = StorageFormat::Parquet
        .write(&input, sharded(columns, random_rows(n, 21)))
        .unwrap();
    assert_eq!(written as usize, n);

    let shards: Vec<usize> = storage::open(&input)
        .unwrap()
        .map(|s| s.unwrap().num_rows())
        .collect();
    assert!(shards.len() > 1);
    assert_eq!(shards.iter().sum::<usize>(), n);

    let mut config = euclidean_config(&input, 3, SeederKind::KMeansPlusPlus);
    config.max_iterations = 3;
    let result = cluster_file(config).unwrap();

    assert_eq!(result.centroids.len(), 3);
    assert!(result.cost.is_finite() && result.cost > 0.0);

    let out = derived_path(&input, "assignments", StorageFormat::Parquet);
    assert_eq!(write_assignments(&result, &input, &out).unwrap() as usize, n);
}

/// Test the large-n memory bound: one million rows flow through seeding, one
/// refinement pass and the objective without ever materializing the dataset.
///
/// Slow; run with `cargo test -- --ignored`.
#[test]
#[ignore]
fn test_large_n_out_of_core() {
    let dir = tempfile::tempdir().unwrap();
    let columns: Vec<String> = vec!["wins".into(), "losses".into(), "draws".into()];
    let n = 1_000_000;

    let mut config = Configuration::new(dir.path().join("big.parquet"), 3)
        .with_distance(crate::distance::DistanceKind::Euclidean);
    config.seeder = SeederKind::Naive;
    config.use_accelerator = false;
    config.rng_seed = Some(3);
    config.max_iterations = 1;

    let result = cluster_rows(config, &columns, random_rows(n, 77)).unwrap();
    assert_eq!(result.centroids.len(), 3);
    assert!(result.cost.is_finite());
}
