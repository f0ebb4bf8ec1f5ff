// Derived-artifact naming conventions.

use std::path::{Path, PathBuf};

use crate::storage::StorageFormat;

/// `<dir>/<prefix>.<stem>.<format extension>` next to the input file.
///
/// For `data/points.csv` and prefix `centroids` under parquet this is
/// `data/centroids.points.parquet`.
pub fn derived_path(input: &Path, prefix: &str, format: StorageFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("points");
    let name = format!("{prefix}.{stem}.{}", format.extension());
    input.with_file_name(name)
}

/// The q(x) auxiliary stream, co-located with the input file.
pub fn qx_path(input: &Path, format: StorageFormat) -> PathBuf {
    input.with_file_name(format!("qx.{}", format.extension()))
}

/// The self-describing result dump: `result.<stem>.json`.
pub fn result_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("points");
    input.with_file_name(format!("result.{stem}.json"))
}
