// OpenCL backing for the distance engine.
//
// One platform/device pair is auto-discovered (first of each). The program
// is specialized at build time on the run's dimensionality, distance key and
// assignment width; it is rebuilt only if a new run changes one of those.

use ndarray::Array2;
use ocl::{flags, Buffer, Context, Device, Kernel, Platform, Program, Queue};

use crate::distance::DistanceKind;
use crate::error::{Error, Result};
use crate::model::{Assignments, IndexWidth};
use crate::storage::FeatureBlock;

/// Fixed global work size; each work item covers ⌈n / global⌉ contiguous rows.
pub const GLOBAL_WORK_SIZE: usize = 1024;

fn accel_err(e: ocl::Error) -> Error {
    Error::Accelerator {
        reason: e.to_string(),
        build_log: None,
    }
}

fn cl_index_type(width: IndexWidth) -> &'static str {
    match width {
        IndexWidth::U8 => "uchar",
        IndexWidth::U16 => "ushort",
        IndexWidth::U32 => "uint",
    }
}

/// Process-wide device state for one run: context, queue and the specialized
/// program. Owned by the engine; a single run owns the engine.
pub struct ClEngine {
    queue: Queue,
    program: Program,
    dim: usize,
    width: IndexWidth,
}

impl ClEngine {
    /// Discovers the device and builds the specialized program.
    pub fn new(kind: DistanceKind, k: usize, dim: usize) -> Result<Self> {
        let snippet = kind.kernel_source().ok_or_else(|| Error::Accelerator {
            reason: format!("distance key {:?} has no kernel", kind.key()),
            build_log: None,
        })?;

        let platform = Platform::list().into_iter().next().ok_or_else(|| Error::Accelerator {
            reason: "no OpenCL platform found".into(),
            build_log: None,
        })?;
        let device = Device::list_all(platform)
            .map_err(accel_err)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Accelerator {
                reason: "no OpenCL device on the first platform".into(),
                build_log: None,
            })?;
        let context = Context::builder()
            .platform(platform)
            .devices(device)
            .build()
            .map_err(accel_err)?;
        let queue = Queue::new(&context, device, None).map_err(accel_err)?;

        let width = IndexWidth::for_k(k);
        let src = [snippet, include_str!("kernels/engine.cl")].join("\n");
        let program = Program::builder()
            .devices(device)
            .cmplr_opt(format!("-D DIM={} -D INDEX_T={}", dim, cl_index_type(width)))
            .src(src)
            .build(&context)
            .map_err(|e| Error::Accelerator {
                reason: "kernel build failed".into(),
                build_log: Some(e.to_string()),
            })?;

        Ok(Self {
            queue,
            program,
            dim,
            width,
        })
    }

    /// Uploads a centroid table into a read-only device buffer.
    ///
    /// The returned handle releases the buffer when dropped, which ties the
    /// device-side centroid lifetime to the pass scope. Seeding passes bind
    /// tables smaller than the run's k, so the handle carries its own row
    /// count.
    pub fn upload_centroids(&self, flat: &[f32]) -> Result<DeviceCentroids<'_>> {
        let buffer = Buffer::<f32>::builder()
            .queue(self.queue.clone())
            .flags(flags::MEM_READ_ONLY)
            .len(flat.len())
            .copy_host_slice(flat)
            .build()
            .map_err(accel_err)?;
        Ok(DeviceCentroids {
            engine: self,
            k: flat.len() / self.dim,
            buffer,
        })
    }

    /// Launches the outer-loop kernel, leaving the n x k matrix on device.
    fn launch_matrix(
        &self,
        block: &FeatureBlock,
        centroids: &Buffer<f32>,
        k: usize,
    ) -> Result<Buffer<f32>> {
        let n = block.rows();
        let rows_per_worker = n.div_ceil(GLOBAL_WORK_SIZE);

        let points = Buffer::<f32>::builder()
            .queue(self.queue.clone())
            .flags(flags::MEM_READ_ONLY)
            .len(block.as_slice().len())
            .copy_host_slice(block.as_slice())
            .build()
            .map_err(accel_err)?;
        let matrix = Buffer::<f32>::builder()
            .queue(self.queue.clone())
            .flags(flags::MEM_READ_WRITE)
            .len(n * k)
            .build()
            .map_err(accel_err)?;

        let kernel = Kernel::builder()
            .program(&self.program)
            .name("distance_matrix")
            .queue(self.queue.clone())
            .global_work_size(GLOBAL_WORK_SIZE)
            .arg(&points)
            .arg(centroids)
            .arg(rows_per_worker as u32)
            .arg(n as u32)
            .arg(k as u32)
            .arg(&matrix)
            .build()
            .map_err(accel_err)?;
        unsafe { kernel.enq().map_err(accel_err)? };
        Ok(matrix)
    }

    fn read_reduced<T: ocl::OclPrm>(
        &self,
        name: &str,
        matrix: &Buffer<f32>,
        n: usize,
        k: usize,
    ) -> Result<Vec<T>> {
        let out = Buffer::<T>::builder()
            .queue(self.queue.clone())
            .flags(flags::MEM_WRITE_ONLY)
            .len(n)
            .build()
            .map_err(accel_err)?;
        let rows_per_worker = n.div_ceil(GLOBAL_WORK_SIZE);
        let kernel = Kernel::builder()
            .program(&self.program)
            .name(name)
            .queue(self.queue.clone())
            .global_work_size(GLOBAL_WORK_SIZE)
            .arg(matrix)
            .arg(rows_per_worker as u32)
            .arg(n as u32)
            .arg(k as u32)
            .arg(&out)
            .build()
            .map_err(accel_err)?;
        unsafe { kernel.enq().map_err(accel_err)? };
        self.queue.finish().map_err(accel_err)?;

        let mut host = vec![T::default(); n];
        out.read(&mut host).enq().map_err(accel_err)?;
        Ok(host)
    }
}

/// A centroid table resident on device for the duration of one pass.
pub struct DeviceCentroids<'e> {
    engine: &'e ClEngine,
    k: usize,
    buffer: Buffer<f32>,
}

impl DeviceCentroids<'_> {
    /// Full n x k matrix, read back to the host.
    pub fn distances(&self, block: &FeatureBlock) -> Result<Array2<f32>> {
        let n = block.rows();
        let matrix = self.engine.launch_matrix(block, &self.buffer, self.k)?;
        self.engine.queue.finish().map_err(accel_err)?;

        let mut host = vec![0f32; n * self.k];
        matrix.read(&mut host).enq().map_err(accel_err)?;
        Array2::from_shape_vec((n, self.k), host).map_err(|e| Error::Invariant(e.to_string()))
    }

    /// Per-row minimum distance. The n x k intermediate stays on device.
    pub fn min_distance(&self, block: &FeatureBlock) -> Result<Vec<f32>> {
        let matrix = self.engine.launch_matrix(block, &self.buffer, self.k)?;
        self.engine
            .read_reduced("min_reduce", &matrix, block.rows(), self.k)
    }

    /// Per-row nearest index at the narrow width. The n x k intermediate
    /// stays on device; only the narrow vector crosses the bus.
    pub fn nearest(&self, block: &FeatureBlock) -> Result<Assignments> {
        let n = block.rows();
        let matrix = self.engine.launch_matrix(block, &self.buffer, self.k)?;
        Ok(match self.engine.width {
            IndexWidth::U8 => {
                Assignments::U8(self.engine.read_reduced("nearest_reduce", &matrix, n, self.k)?)
            }
            IndexWidth::U16 => {
                Assignments::U16(self.engine.read_reduced("nearest_reduce", &matrix, n, self.k)?)
            }
            IndexWidth::U32 => {
                Assignments::U32(self.engine.read_reduced("nearest_reduce", &matrix, n, self.k)?)
            }
        })
    }
}
