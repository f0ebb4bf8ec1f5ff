// Package seeding produces the initial centroid table.
//
// Five interchangeable algorithms; each streams passes over the shard source
// through the distance engine and returns k distinct rows. afk-mc² is the
// default and the only one that persists an auxiliary stream (q(x)).

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::Configuration;
use crate::driver::CancelFlag;
use crate::engine::DistanceEngine;
use crate::error::{Error, Result};
use crate::model::CentroidTable;
use crate::storage::source::BlockStream;
use crate::storage::{DataSource, FeatureBlock};

mod afk;
mod mc2;
mod naive;
mod parallel;
mod plusplus;
pub mod reservoir;

#[cfg(test)]
mod reservoir_test;
#[cfg(test)]
mod seeding_test;

/// Seeding algorithm keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeederKind {
    #[serde(rename = "naive")]
    Naive,
    #[serde(rename = "k-means++")]
    KMeansPlusPlus,
    #[serde(rename = "k-means||")]
    KMeansParallel,
    #[serde(rename = "k-mc2")]
    Kmc2,
    #[serde(rename = "afk-mc2")]
    AfkMc2,
}

impl SeederKind {
    /// Looks a seeder up by key.
    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "naive" => Ok(Self::Naive),
            "k-means++" => Ok(Self::KMeansPlusPlus),
            "k-means||" => Ok(Self::KMeansParallel),
            "k-mc2" => Ok(Self::Kmc2),
            "afk-mc2" => Ok(Self::AfkMc2),
            other => Err(Error::Config(format!("unknown seeder key {other:?}"))),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::KMeansPlusPlus => "k-means++",
            Self::KMeansParallel => "k-means||",
            Self::Kmc2 => "k-mc2",
            Self::AfkMc2 => "afk-mc2",
        }
    }
}

/// Everything a seeder needs for its passes.
pub struct SeedContext<'a> {
    pub config: &'a Configuration,
    pub engine: &'a DistanceEngine,
    pub source: &'a DataSource,
    pub rng: &'a mut StdRng,
    pub cancel: &'a CancelFlag,
}

impl SeedContext<'_> {
    /// Seeding passes are cancellable at shard boundaries, like every other
    /// pass of the pipeline.
    pub fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Runs the configured seeder and returns k distinct centroids.
pub fn seed(ctx: &mut SeedContext<'_>) -> Result<CentroidTable> {
    let kind = ctx.config.seeder;
    tracing::info!(
        component = "seeding",
        event = "seed_start",
        seeder = kind.key(),
        k = ctx.config.k,
        "seeding initial centroids"
    );
    let table = match kind {
        SeederKind::Naive => naive::seed(ctx),
        SeederKind::KMeansPlusPlus => plusplus::seed(ctx),
        SeederKind::KMeansParallel => parallel::seed(ctx),
        SeederKind::Kmc2 => mc2::seed(ctx),
        SeederKind::AfkMc2 => afk::seed(ctx),
    }?;
    table.ensure_distinct()?;
    Ok(table)
}

/// Where a seeder samples from: the on-disk source, or an in-memory
/// candidate block (the k-means|| reduction step).
pub enum SampleSpace<'a> {
    Disk(&'a DataSource),
    Memory(&'a FeatureBlock),
}

impl SampleSpace<'_> {
    /// A fresh stream of feature blocks over this space.
    pub fn blocks(&self) -> Result<BlockStream> {
        match self {
            Self::Disk(source) => source.blocks(),
            Self::Memory(block) => {
                let block = (*block).clone();
                Ok(Box::new(std::iter::once(Ok(block))))
            }
        }
    }

    /// Exact number of rows in the space.
    pub fn row_count(&self) -> Result<u64> {
        match self {
            Self::Disk(source) => source.row_count(),
            Self::Memory(block) => Ok(block.rows() as u64),
        }
    }
}
