// afk-mc² seeding.
//
// Phase 1 computes the proposal distribution q(x) against a uniformly chosen
// first centroid and persists it as an auxiliary shard stream. Phase 2 draws
// a candidate pool from q and runs one short acceptance chain per remaining
// centroid over its slice of the pool.

use rand::Rng;

use crate::error::{Error, Result};
use crate::model::CentroidTable;
use crate::paths::qx_path;
use crate::seeding::mc2::walk_chain;
use crate::seeding::reservoir::WeightedReservoir;
use crate::seeding::{reservoir, SampleSpace, SeedContext};
use crate::storage::{FeatureBlock, Shard};

pub(crate) fn seed(ctx: &mut SeedContext<'_>) -> Result<CentroidTable> {
    let k = ctx.config.k;
    let columns = ctx.source.columns();
    let space = SampleSpace::Disk(ctx.source);

    // The first centroid is drawn before q exists, so it cannot depend on it.
    let mut rows = reservoir::uniform(&space, 1, ctx.rng, ctx.cancel)?;
    if rows.is_empty() {
        return Err(Error::Invariant("cannot seed from an empty dataset".into()));
    }
    let first = CentroidTable::from_rows(&rows, columns)?;

    // Phase 1a: Z = Σ d(c₁, x)² and the exact row count.
    let pass = ctx.engine.begin_pass(&first)?;
    let mut z = 0f64;
    let mut n_exact = 0u64;
    for block in space.blocks()? {
        ctx.check_cancel()?;
        let block = block?;
        n_exact += block.rows() as u64;
        for d in pass.min_distance(&block)? {
            z += f64::from(d) * f64::from(d);
        }
    }
    drop(pass);
    if z == 0.0 {
        return Err(Error::Invariant(
            "every point coincides with the first centroid; q(x) is degenerate".into(),
        ));
    }

    let n_hat = ctx.config.size_estimate.unwrap_or(n_exact).max(1);
    let alpha = 1.0 / (2.0 * n_hat as f64);
    let m = ctx.config.chain_length_for(n_hat);
    let pool_target = (k - 1) * m;

    // Phase 1b: q(x) = d(c₁, x)²/(2Z) + α, persisted row-aligned with the
    // points; the same pass feeds the phase-2 candidate pool.
    let qx = qx_path(&ctx.config.input, ctx.config.format);
    let mut pool = WeightedReservoir::new(pool_target);
    {
        let pass = ctx.engine.begin_pass(&first)?;
        let rng = &mut *ctx.rng;
        let pool = &mut pool;
        let cancel = ctx.cancel;
        let stream = ctx.source.blocks()?.map(move |block| -> Result<Shard> {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let block = block?;
            let min = pass.min_distance(&block)?;
            let q: Vec<f32> = min
                .iter()
                .map(|d| ((f64::from(*d) * f64::from(*d)) / (2.0 * z) + alpha) as f32)
                .collect();
            let seed = rng.gen::<u64>();
            pool.observe_block(&block, &q, seed);
            Shard::single_column_f32("q(x)", q)
        });
        ctx.config.format.write(&qx, stream)?;
    }
    tracing::debug!(
        component = "seeding",
        event = "qx_written",
        path = %qx.display(),
        chain_length = m,
        "proposal distribution persisted"
    );

    // Slicing is deterministic given the pool: items are sorted by key.
    let pool = pool.into_sorted();
    if pool.len() < k - 1 {
        return Err(Error::Invariant(format!(
            "candidate pool of {} rows cannot drive {} acceptance chains",
            pool.len(),
            k - 1
        )));
    }
    let m_eff = (pool.len() / (k - 1)).min(m);
    if m_eff < m {
        tracing::warn!(
            component = "seeding",
            event = "pool_short",
            requested = pool_target,
            drawn = pool.len(),
            chain_length = m_eff,
            "dataset smaller than the candidate pool; chains shortened"
        );
    }

    // Phase 2: one acceptance chain per remaining centroid over its slice,
    // with w(x) = min_{c∈C} d(x, c)² · q(x).
    for j in 0..(k - 1) {
        ctx.check_cancel()?;
        let slice = &pool[j * m_eff..(j + 1) * m_eff];
        let block =
            FeatureBlock::from_rows(&slice.iter().map(|item| item.row.clone()).collect::<Vec<_>>())?;

        let interim = CentroidTable::from_rows(&rows, columns)?;
        let pass = ctx.engine.begin_pass(&interim)?;
        let min = pass.min_distance(&block)?;
        drop(pass);

        let weights: Vec<f32> = min
            .iter()
            .zip(slice)
            .map(|(d, item)| d * d * item.weight)
            .collect();
        let terminal = walk_chain(&weights, ctx.rng);
        rows.push(slice[terminal].row.clone());
    }

    CentroidTable::from_rows(&rows, columns)
}
