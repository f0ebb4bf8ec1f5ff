// k-means|| seeding: a few oversampled D² rounds, reduced in memory.

use rand::Rng;

use crate::error::Result;
use crate::model::CentroidTable;
use crate::seeding::reservoir::WeightedReservoir;
use crate::seeding::{plusplus, reservoir, SampleSpace, SeedContext};
use crate::storage::FeatureBlock;

/// Oversampling rounds.
const ROUNDS: usize = 5;

/// Oversampling factor per round, as a multiple of k.
const OVERSAMPLE: usize = 2;

/// Collects ≈ (1 + ROUNDS · OVERSAMPLE · k) candidates by repeated D²
/// oversampling, then clusters them down to k with an in-memory k-means++.
pub(crate) fn seed(ctx: &mut SeedContext<'_>) -> Result<CentroidTable> {
    let k = ctx.config.k;
    let space = SampleSpace::Disk(ctx.source);

    let mut candidates = reservoir::uniform(&space, 1, ctx.rng, ctx.cancel)?;
    for _ in 0..ROUNDS {
        let interim = CentroidTable::from_rows(&candidates, ctx.source.columns())?;
        let pass = ctx.engine.begin_pass(&interim)?;
        let mut round = WeightedReservoir::new(OVERSAMPLE * k);
        for block in space.blocks()? {
            ctx.check_cancel()?;
            let block = block?;
            let min = pass.min_distance(&block)?;
            let weights: Vec<f32> = min.iter().map(|d| d * d).collect();
            let seed = ctx.rng.gen::<u64>();
            round.observe_block(&block, &weights, seed);
        }
        drop(pass);
        candidates.extend(round.into_sorted().into_iter().map(|item| item.row));
    }

    let pool = FeatureBlock::from_rows(&candidates)?;
    plusplus::seed_in(
        &SampleSpace::Memory(&pool),
        k,
        ctx.source.columns(),
        ctx.engine,
        ctx.rng,
        ctx.cancel,
    )
}
