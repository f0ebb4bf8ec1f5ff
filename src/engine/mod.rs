// Package engine computes distances between shards and the centroid table.
//
// Three host-facing operations: full distance matrices, per-row minimum
// distances, and nearest-centroid indices. When the configured distance key
// carries a kernel and the accelerator initialized, all three run on device;
// otherwise a data-parallel scalar loop serves them.

use ndarray::Array2;
use rayon::prelude::*;

use crate::distance::DistanceKind;
use crate::error::{Error, Result};
use crate::model::{Assignments, CentroidTable, IndexWidth};
use crate::storage::FeatureBlock;

#[cfg(feature = "accel")]
pub mod opencl;


/// The distance engine for one run. Built once; dimensionality and k are
/// fixed for the run, which lets the device program specialize on both.
pub struct DistanceEngine {
    kind: DistanceKind,
    k: usize,
    dim: usize,
    #[cfg(feature = "accel")]
    accel: Option<opencl::ClEngine>,
}

impl DistanceEngine {
    /// Builds the engine, initializing the accelerator when requested and a
    /// kernel exists for the distance key.
    ///
    /// Accelerator failures here are recoverable: the engine logs the build
    /// log and falls back to the scalar path. Once a run has begun, device
    /// errors propagate as [`Error::Accelerator`].
    pub fn new(kind: DistanceKind, k: usize, dim: usize, use_accelerator: bool) -> Result<Self> {
        if k == 0 || dim == 0 {
            return Err(Error::Invariant(format!(
                "distance engine needs k >= 1 and d >= 1, got k={k}, d={dim}"
            )));
        }

        #[cfg(feature = "accel")]
        {
            let accel = if use_accelerator && kind.kernel_source().is_some() {
                match opencl::ClEngine::new(kind, k, dim) {
                    Ok(engine) => {
                        tracing::info!(
                            component = "engine",
                            event = "accelerator_ready",
                            distance = kind.key(),
                            dim,
                            k,
                            "accelerated distance path initialized"
                        );
                        Some(engine)
                    }
                    Err(e) => {
                        tracing::warn!(
                            component = "engine",
                            event = "accelerator_fallback",
                            error = %e,
                            "accelerator unavailable, using the scalar path"
                        );
                        None
                    }
                }
            } else {
                None
            };
            Ok(Self { kind, k, dim, accel })
        }

        #[cfg(not(feature = "accel"))]
        {
            if use_accelerator && kind.kernel_source().is_some() {
                tracing::warn!(
                    component = "engine",
                    event = "accelerator_fallback",
                    "built without the accel feature, using the scalar path"
                );
            }
            Ok(Self { kind, k, dim })
        }
    }

    pub fn kind(&self) -> DistanceKind {
        self.kind
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Whether shard operations run on device.
    pub fn is_accelerated(&self) -> bool {
        #[cfg(feature = "accel")]
        {
            self.accel.is_some()
        }
        #[cfg(not(feature = "accel"))]
        {
            false
        }
    }

    /// Starts a multi-shard pass against `centroids`.
    ///
    /// On the accelerated path this uploads the table into a read-only device
    /// buffer; the buffer is released when the returned pass drops, on every
    /// exit path.
    pub fn begin_pass<'e>(&'e self, centroids: &'e CentroidTable) -> Result<Pass<'e>> {
        if centroids.dim() != self.dim {
            return Err(Error::Shape(format!(
                "centroid table is {}-dimensional, engine expects {}",
                centroids.dim(),
                self.dim
            )));
        }
        let flat = centroids.to_flat();

        #[cfg(feature = "accel")]
        let device = match &self.accel {
            Some(engine) => Some(engine.upload_centroids(&flat)?),
            None => None,
        };

        Ok(Pass {
            engine: self,
            centroids,
            flat,
            #[cfg(feature = "accel")]
            device,
        })
    }
}

/// A scoped pass over shards with the centroid table installed.
pub struct Pass<'e> {
    engine: &'e DistanceEngine,
    centroids: &'e CentroidTable,
    flat: Vec<f32>,
    #[cfg(feature = "accel")]
    device: Option<opencl::DeviceCentroids<'e>>,
}

impl std::fmt::Debug for Pass<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pass").finish_non_exhaustive()
    }
}

impl Pass<'_> {
    pub fn k(&self) -> usize {
        self.centroids.k()
    }

    fn check_block(&self, block: &FeatureBlock) -> Result<()> {
        if block.dim() != self.engine.dim {
            return Err(Error::Shape(format!(
                "shard is {}-dimensional, engine expects {}",
                block.dim(),
                self.engine.dim
            )));
        }
        Ok(())
    }

    /// Distances from every row to every centroid: an n x k matrix.
    pub fn distances(&self, block: &FeatureBlock) -> Result<Array2<f32>> {
        self.check_block(block)?;

        #[cfg(feature = "accel")]
        if let Some(device) = &self.device {
            return device.distances(block);
        }

        let dist = self.engine.kind.scalar();
        let (n, k, d) = (block.rows(), self.centroids.k(), self.engine.dim);
        let flat = &self.flat;
        let mut out = vec![0f32; n * k];
        out.par_chunks_mut(k).enumerate().for_each(|(i, row)| {
            let p = block.row(i);
            for (c, slot) in row.iter_mut().enumerate() {
                *slot = dist(p, &flat[c * d..(c + 1) * d]);
            }
        });
        Array2::from_shape_vec((n, k), out).map_err(|e| Error::Invariant(e.to_string()))
    }

    /// Distance from every row to its nearest centroid.
    pub fn min_distance(&self, block: &FeatureBlock) -> Result<Vec<f32>> {
        self.check_block(block)?;

        #[cfg(feature = "accel")]
        if let Some(device) = &self.device {
            return device.min_distance(block);
        }

        let dist = self.engine.kind.scalar();
        let (k, d) = (self.centroids.k(), self.engine.dim);
        let flat = &self.flat;
        Ok((0..block.rows())
            .into_par_iter()
            .map(|i| {
                let p = block.row(i);
                (0..k)
                    .map(|c| dist(p, &flat[c * d..(c + 1) * d]))
                    .fold(f32::INFINITY, f32::min)
            })
            .collect())
    }

    /// Index of the nearest centroid for every row, at the narrowest width
    /// covering k. Ties break toward the smallest index.
    pub fn nearest(&self, block: &FeatureBlock) -> Result<Assignments> {
        self.check_block(block)?;

        #[cfg(feature = "accel")]
        if let Some(device) = &self.device {
            return device.nearest(block);
        }

        let dist = self.engine.kind.scalar();
        let (k, d) = (self.centroids.k(), self.engine.dim);
        let flat = &self.flat;
        let indices: Vec<u32> = (0..block.rows())
            .into_par_iter()
            .map(|i| {
                let p = block.row(i);
                let mut best = 0u32;
                let mut best_d = dist(p, &flat[..d]);
                for c in 1..k {
                    let cd = dist(p, &flat[c * d..(c + 1) * d]);
                    if cd < best_d {
                        best_d = cd;
                        best = c as u32;
                    }
                }
                best
            })
            .collect();

        Ok(match IndexWidth::for_k(k) {
            IndexWidth::U8 => Assignments::U8(indices.into_iter().map(|x| x as u8).collect()),
            IndexWidth::U16 => Assignments::U16(indices.into_iter().map(|x| x as u16).collect()),
            IndexWidth::U32 => Assignments::U32(indices),
        })
    }
}
