// Package driver runs the out-of-core Lloyd refinement.
//
// States: seeding -> iterating -> stabilized | iteration-cap. Every pass is
// a fresh stream over the shard source with the centroid table installed on
// the engine for the duration of the pass and released on every exit path.

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::distance::DistanceKind;
use crate::engine::DistanceEngine;
use crate::error::{Error, Result};
use crate::model::{CentroidTable, ClusterResult};
use crate::progress::Progress;
use crate::seeding::{self, SeedContext};
use crate::storage::{self, DataSource, Shard, StorageFormat, SHARD_ROWS};

pub mod cancel;


pub use cancel::CancelFlag;

/// Relative stabilization tolerance: iteration stops once the largest
/// row-wise L2 movement drops below this fraction of the largest centroid
/// component. Bitwise table equality remains the backstop.
const STABILIZE_TOLERANCE: f32 = 1e-6;

/// How a run left the iterating state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Termination {
    Stabilized,
    IterationCap,
}

/// Clusters a points file with the given configuration.
pub fn cluster_file(config: Configuration) -> Result<ClusterResult> {
    Lloyd::from_path(config)?.run()
}

/// Clusters an in-memory row sequence by materializing it to a temp file in
/// the configured storage format and delegating to the file path.
pub fn cluster_rows<I>(config: Configuration, columns: &[String], rows: I) -> Result<ClusterResult>
where
    I: IntoIterator<Item = Vec<f32>>,
{
    Lloyd::from_rows(config, columns, rows)?.run()
}

/// The Lloyd driver for one run. Owns the device context, the RNG and the
/// normalized input for its whole lifetime.
pub struct Lloyd {
    config: Configuration,
    source: DataSource,
    engine: DistanceEngine,
    rng: StdRng,
    cancel: CancelFlag,
    progress: Progress,
    /// Keeps a normalized or materialized input alive for the run.
    _scratch: Option<NamedTempFile>,
}

impl Lloyd {
    /// Builds a driver over a points file.
    pub fn from_path(config: Configuration) -> Result<Self> {
        Self::build(config)
    }

    /// Builds a driver over an in-memory row sequence.
    pub fn from_rows<I>(mut config: Configuration, columns: &[String], rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vec<f32>>,
    {
        let tmp = tempfile::Builder::new()
            .prefix("oocmeans-rows-")
            .suffix(&format!(".{}", config.format.extension()))
            .tempfile()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;
        let shards = ChunkedRows {
            columns: columns.to_vec(),
            rows: rows.into_iter(),
        };
        config.format.write(tmp.path(), shards)?;
        config.input = tmp.path().to_path_buf();

        let mut driver = Self::build(config)?;
        driver._scratch = Some(tmp);
        Ok(driver)
    }

    fn build(config: Configuration) -> Result<Self> {
        config.validate()?;

        // Normalization pass: bring the input into the working format (csv in
        // particular never drives the iteration passes directly).
        let input_format = StorageFormat::from_extension(&config.input)?;
        let (work_path, scratch) = if input_format == config.format {
            (config.input.clone(), None)
        } else {
            info!(
                component = "driver",
                event = "normalize_input",
                from = input_format.extension(),
                to = config.format.extension(),
                "converting input into the working format"
            );
            let tmp = tempfile::Builder::new()
                .prefix("oocmeans-")
                .suffix(&format!(".{}", config.format.extension()))
                .tempfile()
                .map_err(|e| Error::io(std::env::temp_dir(), e))?;
            storage::convert(&config.input, tmp.path())?;
            (tmp.path().to_path_buf(), Some(tmp))
        };

        let mut source = DataSource::new(work_path, config.format);
        source.resolve_columns(&config.columns)?;

        if config.distance == DistanceKind::Emd {
            warn!(
                component = "driver",
                event = "emd_default",
                "emd is not a squared-Euclidean loss; Lloyd refinement may not converge"
            );
        }

        let engine = DistanceEngine::new(
            config.distance,
            config.k,
            source.dim(),
            config.use_accelerator,
        )?;
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            source,
            engine,
            rng,
            cancel: CancelFlag::new(),
            progress: Progress::hidden(),
            _scratch: scratch,
        })
    }

    /// The flag another thread can use to stop the run between shards.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Runs seeding and Lloyd refinement, returning the final result.
    pub fn run(mut self) -> Result<ClusterResult> {
        let mut table = {
            let mut ctx = SeedContext {
                config: &self.config,
                engine: &self.engine,
                source: &self.source,
                rng: &mut self.rng,
                cancel: &self.cancel,
            };
            seeding::seed(&mut ctx)?
        };
        info!(
            component = "driver",
            event = "seeded",
            k = table.k(),
            dim = table.dim(),
            accelerated = self.engine.is_accelerated(),
            "initial centroids installed"
        );

        let mut termination = Termination::IterationCap;
        let mut iterations = 0usize;
        for iteration in 1..=self.config.max_iterations {
            self.check_cancel()?;
            let next = self.assign_and_mean(&table)?;
            let shift = next.max_row_shift(&table);
            let stabilized =
                next.bitwise_eq(&table) || shift <= STABILIZE_TOLERANCE * table.max_abs();
            debug!(
                component = "driver",
                event = "iteration",
                iteration,
                max_row_shift = shift,
                "centroid table replaced"
            );
            table = next;
            iterations = iteration;
            if stabilized {
                termination = Termination::Stabilized;
                break;
            }
        }
        let event = match termination {
            Termination::Stabilized => "stabilized",
            Termination::IterationCap => "iteration_cap",
        };
        info!(component = "driver", event, iterations, "refinement finished");

        let cost = self.objective(&table)?;
        info!(component = "driver", event = "objective", cost, "total cost computed");
        Ok(ClusterResult::new(&table, cost, self.config.clone()))
    }

    /// One refinement pass: assign every shard, then replace each centroid
    /// with the mean of its assigned rows. Clusters that received no rows
    /// carry their previous centroid forward.
    fn assign_and_mean(&self, table: &CentroidTable) -> Result<CentroidTable> {
        let (k, d) = (table.k(), table.dim());
        let pass = self.engine.begin_pass(table)?;
        let bar = self.progress.pass("assigning");

        let mut sums = vec![0f64; k * d];
        let mut counts = vec![0u64; k];
        for block in self.source.blocks()? {
            self.check_cancel()?;
            let block = block?;
            let assignments = pass.nearest(&block)?;
            for (i, c) in assignments.iter().enumerate() {
                counts[c] += 1;
                for (j, v) in block.row(i).iter().enumerate() {
                    sums[c * d + j] += f64::from(*v);
                }
            }
            bar.inc(1);
        }
        bar.finish_and_clear();
        drop(pass);

        let mut rows: Vec<Vec<f32>> = Vec::with_capacity(k);
        for c in 0..k {
            if counts[c] == 0 {
                rows.push(table.row(c).iter().copied().collect());
            } else {
                rows.push(
                    (0..d)
                        .map(|j| (sums[c * d + j] / counts[c] as f64) as f32)
                        .collect(),
                );
            }
        }
        CentroidTable::from_rows(&rows, table.columns())
    }

    /// Sum of per-row minimum distances over the whole dataset. Reported once
    /// at termination.
    fn objective(&self, table: &CentroidTable) -> Result<f64> {
        let pass = self.engine.begin_pass(table)?;
        let bar = self.progress.pass("objective");
        let mut cost = 0f64;
        for block in self.source.blocks()? {
            self.check_cancel()?;
            let block = block?;
            for d in pass.min_distance(&block)? {
                cost += f64::from(d);
            }
            bar.inc(1);
        }
        bar.finish_and_clear();
        Ok(cost)
    }
}

/// Batches an owned row iterator into shards for materialization.
struct ChunkedRows<I> {
    columns: Vec<String>,
    rows: I,
}

impl<I> Iterator for ChunkedRows<I>
where
    I: Iterator<Item = Vec<f32>>,
{
    type Item = Result<Shard>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(SHARD_ROWS);
        for row in self.rows.by_ref() {
            batch.push(row);
            if batch.len() == SHARD_ROWS {
                break;
            }
        }
        if batch.is_empty() {
            return None;
        }
        Some(Shard::from_feature_rows(&self.columns, &batch))
    }
}

/// Writes the final centroid table as a single-shard artifact.
pub fn write_centroids(result: &ClusterResult, out: &Path) -> Result<()> {
    let table = result.table()?;
    storage::write(out, std::iter::once(table.to_shard()))?;
    Ok(())
}

/// Derives assignments for a points file against a stored result and writes
/// the row-aligned `{columns…, assignments}` shards to `out`.
///
/// Assignments are not retained in the result; this recomputes them on
/// demand. Column order in the points file may differ from the result's.
pub fn write_assignments(result: &ClusterResult, points: &Path, out: &Path) -> Result<u64> {
    let table = result.table()?;
    let engine = DistanceEngine::new(
        result.configuration.distance,
        table.k(),
        table.dim(),
        result.configuration.use_accelerator,
    )?;
    let pass = engine.begin_pass(&table)?;
    let columns = result.columns.clone();
    let stream = storage::open(points)?.map(move |shard| -> Result<Shard> {
        let shard = shard?;
        let block = shard.features(&columns)?;
        let assignments = pass.nearest(&block)?;
        shard.with_column("assignments", assignments.to_arrow())
    });
    storage::write(out, stream)
}
