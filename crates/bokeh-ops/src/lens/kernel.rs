//! Complex 1D kernel synthesis.
//!
//! A component kernel has `2 * ceil(radius) + 1` taps. Tap `i` samples the
//! complex Gaussian at
//!
//! ```text
//! x_i = span * (i - k) / k          k = ceil(radius), span = max(radius, 1)
//! u_i = x_i * scale / radius
//! tap = exp(-a u²) * (cos(b u²) + i sin(b u²))
//! ```
//!
//! For `radius >= 1` the positions are exactly a linspace over
//! `[-radius, radius]`, so fractional radii keep the true extent of the disc
//! instead of stretching it to the next whole pixel. Below one pixel the span
//! stays at the tap spacing and the kernel narrows toward a unit impulse.
//! A plain linspace would keep the outer taps at `u = ±scale` however small
//! the radius, so the blur would never vanish.
//!
//! Radii above [`MAX_RADIUS`] are rejected before any tap is allocated.

use super::params::{ComponentParams, ParameterSet};
use crate::{OpsError, OpsResult};
use bokeh_core::Image;

/// Largest accepted radius in pixels.
pub const MAX_RADIUS: f32 = 65_536.0;

/// Empty tap buffer with room for `len` taps, or `ComputeFailure`.
fn try_taps(len: usize) -> OpsResult<Vec<f32>> {
    let mut taps = Vec::new();
    taps.try_reserve_exact(len).map_err(|e| {
        OpsError::ComputeFailure(format!("cannot allocate {} kernel taps: {}", len, e))
    })?;
    Ok(taps)
}

/// One component's separable complex kernel, stored as paired real and
/// imaginary tap arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexKernel {
    /// Real taps.
    pub real: Vec<f32>,
    /// Imaginary taps.
    pub imag: Vec<f32>,
}

impl ComplexKernel {
    /// Number of taps (always odd).
    #[inline]
    pub fn len(&self) -> usize {
        self.real.len()
    }

    /// True when the kernel has no taps.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    /// Half-width in pixels.
    #[inline]
    pub fn half_width(&self) -> usize {
        self.real.len() / 2
    }

    /// Sums of the real and imaginary taps, accumulated in `f64`.
    pub fn tap_sums(&self) -> (f64, f64) {
        let re = self.real.iter().map(|&v| v as f64).sum();
        let im = self.imag.iter().map(|&v| v as f64).sum();
        (re, im)
    }

    /// Multiplies every tap by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for v in self.real.iter_mut().chain(self.imag.iter_mut()) {
            *v = (*v as f64 * factor) as f32;
        }
    }

    /// Outer product `k ⊗ k` as row-major `(real, imag)` grids.
    ///
    /// This is the 2D kernel the separable row/column passes apply.
    pub fn outer(&self) -> (Vec<f64>, Vec<f64>) {
        let n = self.len();
        let mut re = Vec::with_capacity(n * n);
        let mut im = Vec::with_capacity(n * n);
        for j in 0..n {
            let (cr, ci) = (self.real[j] as f64, self.imag[j] as f64);
            for i in 0..n {
                let (rr, ri) = (self.real[i] as f64, self.imag[i] as f64);
                re.push(cr * rr - ci * ri);
                im.push(cr * ri + ci * rr);
            }
        }
        (re, im)
    }
}

/// Builds one component kernel.
///
/// # Errors
///
/// [`OpsError::InvalidParameter`] if `radius` is not a positive finite number
/// or exceeds [`MAX_RADIUS`], [`OpsError::ComputeFailure`] if the taps cannot
/// be allocated.
///
/// # Example
///
/// ```rust
/// use bokeh_ops::lens::kernel::complex_kernel_1d;
///
/// let k = complex_kernel_1d(2.5, 1.4, 0.862325, 1.624835).unwrap();
/// assert_eq!(k.len(), 7);
/// assert_eq!(k.real[3], 1.0);
/// assert_eq!(k.imag[3], 0.0);
/// ```
pub fn complex_kernel_1d(radius: f32, scale: f64, a: f64, b: f64) -> OpsResult<ComplexKernel> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(OpsError::InvalidParameter(format!(
            "radius must be > 0, got {}",
            radius
        )));
    }
    if radius > MAX_RADIUS {
        return Err(OpsError::InvalidParameter(format!(
            "radius must be <= {}, got {}",
            MAX_RADIUS, radius
        )));
    }
    let radius = radius as f64;
    let half = radius.ceil() as usize;
    let size = half
        .checked_mul(2)
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| OpsError::InvalidParameter(format!("radius {} is too large", radius)))?;
    // Not a plain linspace below one pixel: see the module docs.
    let span = radius.max(1.0);
    let step = scale / radius;

    let mut real = try_taps(size)?;
    let mut imag = try_taps(size)?;
    for i in 0..size {
        let x = span * (i as f64 - half as f64) / half as f64;
        let u = x * step;
        let u2 = u * u;
        let envelope = (-a * u2).exp();
        // Far tails underflow; skip the phase so an infinite u² cannot leak NaN.
        if envelope == 0.0 {
            real.push(0.0);
            imag.push(0.0);
            continue;
        }
        let phase = b * u2;
        real.push((envelope * phase.cos()) as f32);
        imag.push((envelope * phase.sin()) as f32);
    }

    Ok(ComplexKernel { real, imag })
}

/// The kernels of every component for one radius.
///
/// Built once per blur invocation and treated as read-only afterwards.
#[derive(Debug, Clone)]
pub struct KernelSet {
    /// One kernel per component, in table order.
    pub kernels: Vec<ComplexKernel>,
    /// Terms the kernels were built from.
    pub params: &'static [ComponentParams],
    /// Shared scale factor.
    pub scale: f64,
    /// Radius the kernels were built for.
    pub radius: f32,
}

impl KernelSet {
    /// Builds the kernel of every component in `set`.
    pub fn synthesize(radius: f32, set: &ParameterSet) -> OpsResult<Self> {
        let kernels = set
            .components
            .iter()
            .map(|c| complex_kernel_1d(radius, set.scale, c.a, c.b))
            .collect::<OpsResult<Vec<_>>>()?;
        Ok(Self {
            kernels,
            params: set.components,
            scale: set.scale,
            radius,
        })
    }

    /// Number of components.
    #[inline]
    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    /// True when the set holds no kernels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Kernel width shared by every component.
    #[inline]
    pub fn kernel_len(&self) -> usize {
        self.kernels.first().map_or(0, ComplexKernel::len)
    }

    /// Pairs each kernel with its component terms.
    pub fn iter(&self) -> impl Iterator<Item = (&ComplexKernel, &ComponentParams)> {
        self.kernels.iter().zip(self.params.iter())
    }

    /// Reconstructs the composite 2D PSF `Σ A·Re(k⊗k) + B·Im(k⊗k)`.
    ///
    /// Returns a single-channel image of `kernel_len()²` pixels. Slower than
    /// the separable path; meant for inspection and verification.
    pub fn psf(&self) -> OpsResult<Image> {
        let n = self.kernel_len();
        if n == 0 {
            return Err(OpsError::InvalidParameter("kernel set is empty".into()));
        }
        let len = n.checked_mul(n).ok_or_else(|| {
            OpsError::ComputeFailure(format!("{}x{} PSF does not fit in memory", n, n))
        })?;
        let mut acc: Vec<f64> = Vec::new();
        acc.try_reserve_exact(len).map_err(|e| {
            OpsError::ComputeFailure(format!("cannot allocate {}x{} PSF: {}", n, n, e))
        })?;
        acc.resize(len, 0.0);

        for (kernel, p) in self.iter() {
            for (row, out) in acc.chunks_exact_mut(n).enumerate() {
                let (cr, ci) = (kernel.real[row] as f64, kernel.imag[row] as f64);
                for ((v, &rr), &ri) in out.iter_mut().zip(&kernel.real).zip(&kernel.imag) {
                    let (rr, ri) = (rr as f64, ri as f64);
                    *v += p.real_weight * (cr * rr - ci * ri) + p.imag_weight * (cr * ri + ci * rr);
                }
            }
        }
        let data = acc.into_iter().map(|v| v as f32).collect();
        Ok(Image::from_data(n as u32, n as u32, 1, data)?)
    }
}
