// k-mc² seeding: Markov-chain approximation of D² sampling with uniformly
// drawn candidate chains.

use rand::rngs::StdRng;
use rand::Rng;

use crate::error::Result;
use crate::model::CentroidTable;
use crate::seeding::{reservoir, SampleSpace, SeedContext};
use crate::storage::FeatureBlock;

pub(crate) fn seed(ctx: &mut SeedContext<'_>) -> Result<CentroidTable> {
    let k = ctx.config.k;
    let space = SampleSpace::Disk(ctx.source);
    let n = ctx.source.row_count()?;
    let n_hat = ctx.config.size_estimate.unwrap_or(n);
    let m = ctx.config.chain_length_for(n_hat);

    let mut rows = reservoir::uniform(&space, 1, ctx.rng, ctx.cancel)?;
    for _ in 1..k {
        ctx.check_cancel()?;
        // Candidates are drawn uniformly with replacement, in draw order.
        let candidates = reservoir::sample_with_replacement(&space, m, ctx.rng, ctx.cancel)?;
        let block = FeatureBlock::from_rows(&candidates)?;

        let interim = CentroidTable::from_rows(&rows, ctx.source.columns())?;
        let pass = ctx.engine.begin_pass(&interim)?;
        let min = pass.min_distance(&block)?;
        drop(pass);
        let weights: Vec<f32> = min.iter().map(|d| d * d).collect();

        let terminal = walk_chain(&weights, ctx.rng);
        rows.push(candidates[terminal].clone());
    }

    CentroidTable::from_rows(&rows, ctx.source.columns())
}

/// Metropolis-style acceptance walk over a candidate chain; returns the index
/// of the terminal state. A zero-weight current state accepts any candidate.
pub(crate) fn walk_chain(weights: &[f32], rng: &mut StdRng) -> usize {
    let mut current = 0usize;
    for next in 1..weights.len() {
        let u: f32 = rng.gen();
        if weights[current] == 0.0 || weights[next] / weights[current] > u {
            current = next;
        }
    }
    current
}
