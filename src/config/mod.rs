// Package config provides the immutable run descriptor for a clustering run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::distance::DistanceKind;
use crate::error::{Error, Result};
use crate::seeding::SeederKind;
use crate::storage::StorageFormat;


/// Column names that are never treated as feature columns.
pub const RESERVED_COLUMNS: [&str; 2] = ["assignments", "q(x)"];

/// Default Lloyd iteration cap.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Returns true when `name` is reserved for derived data.
pub fn is_reserved_column(name: &str) -> bool {
    RESERVED_COLUMNS.contains(&name)
}

/// Immutable description of a single clustering run.
///
/// Values are fixed at construction; the driver and seeders only read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Points file. Shards are streamed from here on every pass.
    pub input: PathBuf,
    /// Cluster count, k >= 2.
    pub k: usize,
    /// Working storage format; csv inputs are normalized into this format.
    pub format: StorageFormat,
    /// Seeding algorithm for the initial centroid table.
    pub seeder: SeederKind,
    /// Pointwise distance function key.
    pub distance: DistanceKind,
    /// Markov chain length m for the mc² seeders. `None` selects the default.
    pub chain_length: Option<usize>,
    /// Feature columns, in order. Empty selects every non-reserved column of
    /// the first shard in file order.
    pub columns: Vec<String>,
    /// Dataset size estimate n̂. `None` falls back to an exact counting pass.
    pub size_estimate: Option<u64>,
    /// Whether the accelerated distance path may be used.
    pub use_accelerator: bool,
    /// Lloyd iteration cap.
    pub max_iterations: usize,
    /// RNG seed; fixing it makes seeding reproducible.
    pub rng_seed: Option<u64>,
}

impl Configuration {
    /// Creates a configuration with the repository defaults: parquet working
    /// format, afk-mc² seeding, emd distance, accelerator on when the distance
    /// key carries a kernel.
    pub fn new(input: impl Into<PathBuf>, k: usize) -> Self {
        let distance = DistanceKind::Emd;
        Self {
            input: input.into(),
            k,
            format: StorageFormat::Parquet,
            seeder: SeederKind::AfkMc2,
            distance,
            chain_length: None,
            columns: Vec::new(),
            size_estimate: None,
            use_accelerator: distance.kernel_source().is_some(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            rng_seed: None,
        }
    }

    /// Replaces the distance function and re-derives the accelerator default.
    pub fn with_distance(mut self, distance: DistanceKind) -> Self {
        self.distance = distance;
        self.use_accelerator = distance.kernel_source().is_some();
        self
    }

    /// Checks the run descriptor before any pass starts.
    pub fn validate(&self) -> Result<()> {
        if self.k < 2 {
            return Err(Error::Config(format!("k must be at least 2, got {}", self.k)));
        }
        if self.max_iterations == 0 {
            return Err(Error::Config("max iterations must be positive".into()));
        }
        if let Some(m) = self.chain_length {
            if m == 0 {
                return Err(Error::Config("chain length must be positive".into()));
            }
        }
        if let Some(reserved) = self.columns.iter().find(|c| is_reserved_column(c)) {
            return Err(Error::Config(format!(
                "column {reserved:?} is reserved and cannot be selected as a feature"
            )));
        }
        Ok(())
    }

    /// Resolves the Markov chain length against the dataset size `n`.
    ///
    /// Defaults to ⌈k · log₂(n) · ln(k)⌉ clamped to n−1. Chains of length
    /// n or more degenerate into full passes, so a warning is emitted and the
    /// clamp applies.
    pub fn chain_length_for(&self, n: u64) -> usize {
        let n = n.max(2);
        let m = match self.chain_length {
            Some(m) => m,
            None => {
                let k = self.k as f64;
                (k * (n as f64).log2() * k.ln()).ceil() as usize
            }
        };
        let cap = (n - 1) as usize;
        if m >= n as usize {
            tracing::warn!(
                component = "config",
                event = "chain_length_clamped",
                chain_length = m,
                rows = n,
                "chain length reaches the dataset size; mc² sampling adds nothing over k-means++"
            );
        }
        m.clamp(1, cap)
    }
}
