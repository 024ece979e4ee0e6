//! Concurrent convolution of every (component, channel) pair.
//!
//! # Four-way reconstruction
//!
//! A complex kernel `k = kr + i·ki` applied separably (rows, then columns)
//! to a real plane `f` is rebuilt from real 1D passes only:
//!
//! ```text
//! inter_real = rows(f, kr)        inter_imag = rows(f, ki)
//! RR = cols(inter_real, kr)       RI = cols(inter_real, ki)
//! IR = cols(inter_imag, kr)       II = cols(inter_imag, ki)
//!
//! real = RR − II                  imag = RI + IR
//! weighted = A·real + B·imag
//! ```
//!
//! # Scheduling
//!
//! Each (component, channel) task reads one shared plane and one shared
//! kernel and owns its output buffer, so tasks need no locking. [`Executor`]
//! maps the tasks over a rayon pool and returns only after every task has
//! finished; the first error aborts the whole batch.

use super::kernel::{ComplexKernel, KernelSet};
use super::params::ComponentParams;
use crate::filter::{convolve_cols_into, convolve_rows_into, BorderMode};
use crate::{OpsError, OpsResult};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, trace};

/// Identifies one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConvolutionTask {
    /// Component index into the kernel set.
    pub component: usize,
    /// Channel index into the image planes.
    pub channel: usize,
}

/// Weighted real contribution of one component on one channel.
#[derive(Debug, Clone)]
pub struct ConvolutionResult {
    /// Component index.
    pub component: usize,
    /// Channel index.
    pub channel: usize,
    /// Row-major plane, same size as the input plane.
    pub data: Vec<f32>,
}

/// Real and imaginary planes of a complex 2D convolution result.
#[derive(Debug, Clone)]
pub struct ComplexPlane {
    /// Real part.
    pub real: Vec<f32>,
    /// Imaginary part.
    pub imag: Vec<f32>,
}

/// Zeroed buffer whose allocation failure is reported instead of aborting.
fn try_alloc(len: usize) -> OpsResult<Vec<f32>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|e| {
        OpsError::ComputeFailure(format!("cannot allocate {} samples: {}", len, e))
    })?;
    buf.resize(len, 0.0);
    Ok(buf)
}

/// Combines the four real passes into a complex plane.
///
/// `rr` and `ri` are reused as the output buffers.
pub fn reconstruct(mut rr: Vec<f32>, mut ri: Vec<f32>, ir: &[f32], ii: &[f32]) -> ComplexPlane {
    for (re, &v) in rr.iter_mut().zip(ii) {
        *re -= v;
    }
    for (im, &v) in ri.iter_mut().zip(ir) {
        *im += v;
    }
    ComplexPlane { real: rr, imag: ri }
}

/// Collapses a complex plane to `A·real + B·imag`, reusing the real buffer.
pub fn weighted_sum(plane: ComplexPlane, params: &ComponentParams) -> Vec<f32> {
    let a = params.real_weight as f32;
    let b = params.imag_weight as f32;
    let ComplexPlane { mut real, imag } = plane;
    for (re, &im) in real.iter_mut().zip(&imag) {
        *re = a * *re + b * im;
    }
    real
}

/// Runs the six 1D passes of one component over one plane.
pub fn convolve_component(
    plane: &[f32],
    width: usize,
    height: usize,
    kernel: &ComplexKernel,
    params: &ComponentParams,
    border: BorderMode,
) -> OpsResult<Vec<f32>> {
    let len = plane.len();

    let mut inter_real = try_alloc(len)?;
    let mut inter_imag = try_alloc(len)?;
    convolve_rows_into(plane, &mut inter_real, width, height, &kernel.real, border)?;
    convolve_rows_into(plane, &mut inter_imag, width, height, &kernel.imag, border)?;

    let mut rr = try_alloc(len)?;
    let mut ri = try_alloc(len)?;
    let mut ir = try_alloc(len)?;
    let mut ii = try_alloc(len)?;
    convolve_cols_into(&inter_real, &mut rr, width, height, &kernel.real, border)?;
    convolve_cols_into(&inter_real, &mut ri, width, height, &kernel.imag, border)?;
    convolve_cols_into(&inter_imag, &mut ir, width, height, &kernel.real, border)?;
    convolve_cols_into(&inter_imag, &mut ii, width, height, &kernel.imag, border)?;

    let complex = reconstruct(rr, ri, &ir, &ii);
    Ok(weighted_sum(complex, params))
}

/// Worker pool that runs convolution tasks.
///
/// [`Executor::global`] uses rayon's global pool (one worker per hardware
/// thread unless configured otherwise); [`Executor::with_threads`] builds a
/// dedicated pool.
#[derive(Debug, Default)]
pub struct Executor {
    pool: Option<ThreadPool>,
}

impl Executor {
    /// Executor on the global rayon pool.
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Executor on a dedicated pool of `threads` workers.
    ///
    /// # Errors
    ///
    /// [`OpsError::InvalidParameter`] for zero threads,
    /// [`OpsError::ComputeFailure`] if the pool cannot be spawned.
    pub fn with_threads(threads: usize) -> OpsResult<Self> {
        if threads == 0 {
            return Err(OpsError::InvalidParameter(
                "worker count must be > 0".into(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("bokeh-conv-{}", i))
            .build()
            .map_err(|e| OpsError::ComputeFailure(format!("cannot start worker pool: {}", e)))?;
        Ok(Self { pool: Some(pool) })
    }

    /// Number of workers tasks will be spread over.
    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Convolves every plane with every kernel of `set`.
    ///
    /// Returns one result per (component, channel) pair once all tasks are
    /// done. Result order follows task order, component-major.
    pub fn run(
        &self,
        planes: &[Vec<f32>],
        width: usize,
        height: usize,
        set: &KernelSet,
        border: BorderMode,
    ) -> OpsResult<Vec<ConvolutionResult>> {
        let tasks: Vec<ConvolutionTask> = (0..set.len())
            .flat_map(|component| {
                (0..planes.len()).map(move |channel| ConvolutionTask { component, channel })
            })
            .collect();
        debug!(tasks = tasks.len(), workers = self.threads(), "dispatching convolution tasks");

        let work = || {
            tasks
                .par_iter()
                .map(|task| {
                    trace!(component = task.component, channel = task.channel, "convolution task");
                    let data = convolve_component(
                        &planes[task.channel],
                        width,
                        height,
                        &set.kernels[task.component],
                        &set.params[task.component],
                        border,
                    )?;
                    Ok(ConvolutionResult {
                        component: task.component,
                        channel: task.channel,
                        data,
                    })
                })
                .collect::<OpsResult<Vec<_>>>()
        };

        match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::kernel::complex_kernel_1d;
    use crate::lens::params::parameters;
    use approx::assert_abs_diff_eq;

    /// Direct 2D complex correlation with the outer-product kernel.
    fn direct_complex(
        plane: &[f32],
        width: usize,
        height: usize,
        kernel: &ComplexKernel,
    ) -> (Vec<f64>, Vec<f64>) {
        let (kre, kim) = kernel.outer();
        let n = kernel.len();
        let r = (n / 2) as isize;
        let mut re = vec![0.0; width * height];
        let mut im = vec![0.0; width * height];
        for y in 0..height {
            for x in 0..width {
                for ky in 0..n {
                    let sy = BorderMode::Replicate.resolve(y as isize + ky as isize - r, height);
                    for kx in 0..n {
                        let sx = BorderMode::Replicate.resolve(x as isize + kx as isize - r, width);
                        let v = plane[sy * width + sx] as f64;
                        re[y * width + x] += v * kre[ky * n + kx];
                        im[y * width + x] += v * kim[ky * n + kx];
                    }
                }
            }
        }
        (re, im)
    }

    fn ramp(width: usize, height: usize) -> Vec<f32> {
        (0..width * height)
            .map(|i| ((i * 37) % 101) as f32 / 100.0)
            .collect()
    }

    #[test]
    fn test_reconstruct_identity() {
        let complex = reconstruct(vec![3.0, 1.0], vec![0.5, 0.0], &[0.25, 2.0], &[1.0, 4.0]);
        assert_eq!(complex.real, vec![2.0, -3.0]);
        assert_eq!(complex.imag, vec![0.75, 2.0]);
    }

    #[test]
    fn test_weighted_sum() {
        let params = ComponentParams {
            a: 1.0,
            b: 1.0,
            real_weight: 2.0,
            imag_weight: -1.0,
        };
        let plane = ComplexPlane {
            real: vec![1.0, 0.5],
            imag: vec![0.25, 1.0],
        };
        assert_eq!(weighted_sum(plane, &params), vec![1.75, 0.0]);
    }

    #[test]
    fn test_separable_matches_direct_2d() {
        let (w, h) = (9, 7);
        let plane = ramp(w, h);
        let kernel = complex_kernel_1d(2.0, 1.2, 1.019306, 9.027613).unwrap();
        let params = ComponentParams {
            a: 1.019306,
            b: 9.027613,
            real_weight: 0.7,
            imag_weight: -0.3,
        };

        let fast = convolve_component(&plane, w, h, &kernel, &params, BorderMode::Replicate).unwrap();
        let (re, im) = direct_complex(&plane, w, h, &kernel);
        for i in 0..w * h {
            let expect = 0.7 * re[i] - 0.3 * im[i];
            assert_abs_diff_eq!(fast[i] as f64, expect, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_run_covers_every_pair() {
        let (w, h) = (6, 5);
        let planes = vec![ramp(w, h), vec![0.5; w * h], vec![0.0; w * h]];
        let set = KernelSet::synthesize(1.5, &parameters(4)).unwrap();

        let results = Executor::global()
            .run(&planes, w, h, &set, BorderMode::Replicate)
            .unwrap();
        assert_eq!(results.len(), 12);

        let mut seen: Vec<(usize, usize)> = results.iter().map(|r| (r.component, r.channel)).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 12);
        assert!(results.iter().all(|r| r.data.len() == w * h));
    }

    #[test]
    fn test_dedicated_pool_matches_global() {
        let (w, h) = (11, 8);
        let planes = vec![ramp(w, h), ramp(w, h).iter().map(|v| 1.0 - v).collect()];
        let set = KernelSet::synthesize(3.0, &parameters(3)).unwrap();

        let global = Executor::global()
            .run(&planes, w, h, &set, BorderMode::Replicate)
            .unwrap();
        let local = Executor::with_threads(2)
            .unwrap()
            .run(&planes, w, h, &set, BorderMode::Replicate)
            .unwrap();

        for (a, b) in global.iter().zip(&local) {
            assert_eq!((a.component, a.channel), (b.component, b.channel));
            assert_eq!(a.data, b.data);
        }
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(matches!(
            Executor::with_threads(0),
            Err(OpsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_plane_size_error_propagates() {
        let planes = vec![vec![0.0; 10]];
        let set = KernelSet::synthesize(1.0, &parameters(1)).unwrap();
        let err = Executor::global()
            .run(&planes, 4, 4, &set, BorderMode::Replicate)
            .unwrap_err();
        assert!(matches!(err, OpsError::InvalidDimensions(_)));
    }
}
