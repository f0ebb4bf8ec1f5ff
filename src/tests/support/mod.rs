//! Shared helpers for the integration cases.

use std::path::{Path, PathBuf};

use crate::config::Configuration;
use crate::distance::DistanceKind;
use crate::seeding::SeederKind;
use crate::storage::{Shard, StorageFormat};

/// Writes `rows` under `columns` into `dir/<name>` in the format implied by
/// the file extension.
pub fn write_points(dir: &Path, name: &str, columns: &[&str], rows: &[Vec<f32>]) -> PathBuf {
    let path = dir.join(name);
    let columns: Vec<String> = columns.iter().map(|s| s.to_string()).collect();
    let shard = Shard::from_feature_rows(&columns, rows).expect("build shard");
    let format = StorageFormat::from_extension(&path).expect("format");
    format
        .write(&path, std::iter::once(Ok(shard)))
        .expect("write points");
    path
}

/// The three duplicated, well-separated rows from the csv scenario.
pub fn separated_rows() -> Vec<Vec<f32>> {
    let mut rows = Vec::new();
    rows.extend(std::iter::repeat(vec![1.0, 2.0, 3.0]).take(4));
    rows.extend(std::iter::repeat(vec![4.0, 5.0, 6.0]).take(6));
    rows.extend(std::iter::repeat(vec![7.0, 8.0, 9.0]).take(3));
    rows
}

/// A deterministic euclidean configuration with a fixed seed.
pub fn euclidean_config(input: &Path, k: usize, seeder: SeederKind) -> Configuration {
    let mut config = Configuration::new(input, k).with_distance(DistanceKind::Euclidean);
    config.seeder = seeder;
    config.use_accelerator = false;
    config.rng_seed = Some(13);
    config
}
