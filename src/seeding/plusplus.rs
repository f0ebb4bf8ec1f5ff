// k-means++ (D² sampling) seeding: one full pass per new centroid.

use rand::rngs::StdRng;
use rand::Rng;

use crate::driver::CancelFlag;
use crate::engine::DistanceEngine;
use crate::error::{Error, Result};
use crate::model::CentroidTable;
use crate::seeding::reservoir::WeightedReservoir;
use crate::seeding::{reservoir, SampleSpace, SeedContext};

pub(crate) fn seed(ctx: &mut SeedContext<'_>) -> Result<CentroidTable> {
    seed_in(
        &SampleSpace::Disk(ctx.source),
        ctx.config.k,
        ctx.source.columns(),
        ctx.engine,
        ctx.rng,
        ctx.cancel,
    )
}

/// D² sampling over an arbitrary space. Also the reduction step of
/// k-means||, which runs it over the in-memory candidate block.
pub(crate) fn seed_in(
    space: &SampleSpace<'_>,
    k: usize,
    columns: &[String],
    engine: &DistanceEngine,
    rng: &mut StdRng,
    cancel: &CancelFlag,
) -> Result<CentroidTable> {
    let mut rows = reservoir::uniform(space, 1, rng, cancel)?;
    if rows.is_empty() {
        return Err(Error::Invariant("cannot seed from an empty dataset".into()));
    }

    while rows.len() < k {
        let interim = CentroidTable::from_rows(&rows, columns)?;
        let pass = engine.begin_pass(&interim)?;
        let mut pick = WeightedReservoir::new(1);
        for block in space.blocks()? {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let block = block?;
            let min = pass.min_distance(&block)?;
            let weights: Vec<f32> = min.iter().map(|d| d * d).collect();
            let seed = rng.gen::<u64>();
            pick.observe_block(&block, &weights, seed);
        }
        let item = pick.into_sorted().into_iter().next().ok_or_else(|| {
            Error::Invariant(
                "D² weights vanished: every remaining point coincides with a centroid".into(),
            )
        })?;
        rows.push(item.row);
    }

    CentroidTable::from_rows(&rows, columns)
}
