// Uniform reservoir seeding: the baseline, and the k-means|| starting point.

use crate::error::{Error, Result};
use crate::model::CentroidTable;
use crate::seeding::{reservoir, SampleSpace, SeedContext};

/// One-pass uniform sample of k rows. No quality guarantees; duplicate rows
/// in the sample are reported as an invariant failure rather than resampled.
pub(crate) fn seed(ctx: &mut SeedContext<'_>) -> Result<CentroidTable> {
    let k = ctx.config.k;
    let rows = reservoir::uniform(&SampleSpace::Disk(ctx.source), k, ctx.rng, ctx.cancel)?;
    if rows.len() < k {
        return Err(Error::Invariant(format!(
            "dataset has {} rows, cannot seed {k} centroids",
            rows.len()
        )));
    }
    CentroidTable::from_rows(&rows, ctx.source.columns())
}
