// Package distance provides the catalog of pointwise distance functions.
//
// Each key carries a scalar implementation; keys with a regular per-component
// loop also carry an OpenCL kernel snippet for the accelerated engine.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[cfg(test)]
mod distance_test;

/// A scalar distance between two equal-length float32 vectors.
pub type ScalarFn = fn(&[f32], &[f32]) -> f32;

/// Distance function keys.
///
/// The default is `emd`; k-means is not guaranteed to converge under it, so
/// the driver warns when it is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceKind {
    Euclidean,
    Manhattan,
    Chebyshev,
    Emd,
}

impl DistanceKind {
    /// Looks a distance function up by key.
    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "euclidean" => Ok(Self::Euclidean),
            "manhattan" => Ok(Self::Manhattan),
            "chebyshev" => Ok(Self::Chebyshev),
            "emd" => Ok(Self::Emd),
            other => Err(Error::Config(format!("unknown distance key {other:?}"))),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
            Self::Chebyshev => "chebyshev",
            Self::Emd => "emd",
        }
    }

    /// The host-side scalar implementation.
    pub fn scalar(self) -> ScalarFn {
        match self {
            Self::Euclidean => euclidean,
            Self::Manhattan => manhattan,
            Self::Chebyshev => chebyshev,
            Self::Emd => emd,
        }
    }

    /// OpenCL source defining `point_distance` for this key, when the key is
    /// accelerated. The cumulative scan in emd serializes its inner loop, so
    /// emd (and chebyshev) stay on the scalar path.
    pub fn kernel_source(self) -> Option<&'static str> {
        match self {
            Self::Euclidean => Some(include_str!("kernels/euclidean.cl")),
            Self::Manhattan => Some(include_str!("kernels/manhattan.cl")),
            Self::Chebyshev | Self::Emd => None,
        }
    }
}

/// Euclidean (L2) distance.
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Manhattan (L1) distance.
pub fn manhattan(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

/// Chebyshev (L∞) distance.
pub fn chebyshev(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

/// Earth mover's distance over a vector treated as a histogram across its
/// coordinates: ∑_i |∑_{j≤i}(a_j − b_j)|.
pub fn emd(a: &[f32], b: &[f32]) -> f32 {
    let mut carry = 0f32;
    let mut total = 0f32;
    for (x, y) in a.iter().zip(b) {
        carry += x - y;
        total += carry.abs();
    }
    total
}
