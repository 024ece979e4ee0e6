//! Convolution primitives and the Gaussian blur.
//!
//! Everything here is a correlation (kernel applied as-is, not flipped),
//! which is identical to convolution for the symmetric kernels used by the
//! lens and Gaussian blurs.
//!
//! # Building blocks
//!
//! - [`convolve_rows`] / [`convolve_cols`] - 1D passes over a single plane
//! - [`convolve`] - full 2D kernel over every channel
//! - [`gaussian_blur`] - separable Gaussian blur
//!
//! Borders are always extended from the image itself ([`BorderMode`]);
//! zero padding would darken edges.
//!
//! # Example
//!
//! ```rust
//! use bokeh_ops::filter::{convolve_rows, BorderMode};
//!
//! let plane = vec![0.5f32; 8 * 4];
//! let taps = [0.25, 0.5, 0.25];
//! let out = convolve_rows(&plane, 8, 4, &taps, BorderMode::Replicate).unwrap();
//! assert!(out.iter().all(|v| (v - 0.5).abs() < 1e-6));
//! ```

use crate::{OpsError, OpsResult};
use bokeh_core::Image;
use rayon::prelude::*;
use tracing::{debug, trace};

/// How samples outside the image are synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderMode {
    /// Repeat the edge pixel: `aaa|abcd|ddd`.
    #[default]
    Replicate,
    /// Mirror without repeating the edge pixel: `dcb|abcd|cba`.
    Reflect101,
}

impl BorderMode {
    /// Maps a possibly out-of-range coordinate onto `0..len`.
    #[inline]
    pub fn resolve(self, i: isize, len: usize) -> usize {
        let n = len as isize;
        if (0..n).contains(&i) {
            return i as usize;
        }
        match self {
            BorderMode::Replicate => i.clamp(0, n - 1) as usize,
            BorderMode::Reflect101 => {
                if n == 1 {
                    return 0;
                }
                // Reflection repeats every 2 * (n - 1) samples.
                let period = 2 * (n - 1);
                let m = i.rem_euclid(period);
                (if m < n { m } else { period - m }) as usize
            }
        }
    }
}

/// 2D convolution kernel.
#[derive(Debug, Clone)]
pub struct Kernel {
    /// Kernel weights, row-major.
    pub data: Vec<f32>,
    /// Kernel width (odd).
    pub width: usize,
    /// Kernel height (odd).
    pub height: usize,
}

impl Kernel {
    /// Creates a new kernel from data.
    ///
    /// Width and height must be odd numbers.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> OpsResult<Self> {
        if width % 2 == 0 || height % 2 == 0 {
            return Err(OpsError::InvalidParameter(
                "kernel dimensions must be odd".into(),
            ));
        }
        if data.len() != width * height {
            return Err(OpsError::InvalidParameter(format!(
                "kernel data size {} doesn't match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self { data, width, height })
    }

    /// Normalized 1D Gaussian taps.
    ///
    /// `size` is bumped to the next odd value. A non-positive `sigma` is
    /// derived from the size as `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bokeh_ops::filter::Kernel;
    ///
    /// let taps = Kernel::gaussian_1d(5, 1.0);
    /// assert_eq!(taps.len(), 5);
    /// assert!((taps.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    /// ```
    pub fn gaussian_1d(size: usize, sigma: f32) -> Vec<f32> {
        let size = if size % 2 == 0 { size + 1 } else { size };
        let sigma = if sigma > 0.0 {
            sigma
        } else {
            0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
        };
        let half = (size / 2) as i32;
        let sigma2 = 2.0 * sigma * sigma;

        let mut taps: Vec<f32> = (-half..=half)
            .map(|x| (-((x * x) as f32) / sigma2).exp())
            .collect();
        let sum: f32 = taps.iter().sum();
        for w in &mut taps {
            *w /= sum;
        }
        taps
    }

    /// Returns the kernel radius (half-size).
    #[inline]
    pub fn radius(&self) -> (usize, usize) {
        (self.width / 2, self.height / 2)
    }
}

fn check_plane(src: &[f32], width: usize, height: usize, taps: &[f32]) -> OpsResult<()> {
    if width == 0 || height == 0 {
        return Err(OpsError::InvalidDimensions(
            "width and height must be > 0".into(),
        ));
    }
    if src.len() != width * height {
        return Err(OpsError::InvalidDimensions(format!(
            "expected {} samples, got {}",
            width * height,
            src.len()
        )));
    }
    if taps.len() % 2 == 0 {
        return Err(OpsError::InvalidParameter(format!(
            "filter length {} must be odd",
            taps.len()
        )));
    }
    Ok(())
}

/// Filters every row of a single-channel plane with `taps`.
pub fn convolve_rows(
    src: &[f32],
    width: usize,
    height: usize,
    taps: &[f32],
    border: BorderMode,
) -> OpsResult<Vec<f32>> {
    let mut dst = vec![0.0f32; src.len()];
    convolve_rows_into(src, &mut dst, width, height, taps, border)?;
    Ok(dst)
}

/// [`convolve_rows`] writing into a caller-provided buffer.
pub fn convolve_rows_into(
    src: &[f32],
    dst: &mut [f32],
    width: usize,
    height: usize,
    taps: &[f32],
    border: BorderMode,
) -> OpsResult<()> {
    check_plane(src, width, height, taps)?;
    if dst.len() != src.len() {
        return Err(OpsError::SizeMismatch(format!(
            "destination has {} samples, source {}",
            dst.len(),
            src.len()
        )));
    }
    let r = (taps.len() / 2) as isize;

    for (src_row, dst_row) in src.chunks_exact(width).zip(dst.chunks_exact_mut(width)) {
        for (x, out) in dst_row.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (k, &w) in taps.iter().enumerate() {
                let sx = border.resolve(x as isize + k as isize - r, width);
                acc += src_row[sx] * w;
            }
            *out = acc;
        }
    }
    Ok(())
}

/// Filters every column of a single-channel plane with `taps`.
pub fn convolve_cols(
    src: &[f32],
    width: usize,
    height: usize,
    taps: &[f32],
    border: BorderMode,
) -> OpsResult<Vec<f32>> {
    let mut dst = vec![0.0f32; src.len()];
    convolve_cols_into(src, &mut dst, width, height, taps, border)?;
    Ok(dst)
}

/// [`convolve_cols`] writing into a caller-provided buffer.
pub fn convolve_cols_into(
    src: &[f32],
    dst: &mut [f32],
    width: usize,
    height: usize,
    taps: &[f32],
    border: BorderMode,
) -> OpsResult<()> {
    check_plane(src, width, height, taps)?;
    if dst.len() != src.len() {
        return Err(OpsError::SizeMismatch(format!(
            "destination has {} samples, source {}",
            dst.len(),
            src.len()
        )));
    }
    let r = (taps.len() / 2) as isize;

    // Row-at-a-time accumulation keeps the inner loop on contiguous memory.
    dst.fill(0.0);
    for (y, dst_row) in dst.chunks_exact_mut(width).enumerate() {
        for (k, &w) in taps.iter().enumerate() {
            let sy = border.resolve(y as isize + k as isize - r, height);
            let src_row = &src[sy * width..(sy + 1) * width];
            for (out, &s) in dst_row.iter_mut().zip(src_row) {
                *out += s * w;
            }
        }
    }
    Ok(())
}

/// Applies a 2D kernel to every channel of `image`.
///
/// Rows are processed in parallel.
///
/// # Example
///
/// ```rust
/// use bokeh_core::Image;
/// use bokeh_ops::filter::{convolve, BorderMode, Kernel};
///
/// let img = Image::filled(8, 8, &[0.5, 0.5, 0.5]);
/// let kernel = Kernel::new(vec![1.0 / 9.0; 9], 3, 3).unwrap();
/// let out = convolve(&img, &kernel, BorderMode::Replicate).unwrap();
/// assert_eq!(out.dimensions(), (8, 8));
/// ```
pub fn convolve(image: &Image, kernel: &Kernel, border: BorderMode) -> OpsResult<Image> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let channels = image.channels() as usize;
    trace!(width, height, channels, kernel_w = kernel.width, kernel_h = kernel.height, "convolve");

    if width == 0 || height == 0 || channels == 0 {
        return Err(OpsError::InvalidDimensions(
            "image must not be empty".into(),
        ));
    }

    let src = image.data();
    let (rx, ry) = kernel.radius();
    // Sparse kernels (motion lines) are mostly zeros.
    let taps: Vec<(isize, isize, f32)> = kernel
        .data
        .iter()
        .enumerate()
        .filter(|(_, w)| **w != 0.0)
        .map(|(i, &w)| {
            let kx = (i % kernel.width) as isize - rx as isize;
            let ky = (i / kernel.width) as isize - ry as isize;
            (kx, ky, w)
        })
        .collect();
    let mut dst = vec![0.0f32; src.len()];

    dst.par_chunks_mut(width * channels)
        .enumerate()
        .for_each(|(y, row)| {
            let mut sums = vec![0.0f32; channels];
            for x in 0..width {
                sums.fill(0.0);
                for &(dx, dy, kw) in &taps {
                    let sy = border.resolve(y as isize + dy, height);
                    let sx = border.resolve(x as isize + dx, width);
                    let src_idx = (sy * width + sx) * channels;
                    for c in 0..channels {
                        sums[c] += src[src_idx + c] * kw;
                    }
                }
                row[x * channels..(x + 1) * channels].copy_from_slice(&sums);
            }
        });

    Ok(Image::from_data(image.width(), image.height(), image.channels(), dst)?)
}

/// Separable Gaussian blur with replicated borders.
///
/// `kernel_size` is bumped to the next odd value; `sigma <= 0` derives the
/// spread from the size (see [`Kernel::gaussian_1d`]). Channels are blurred
/// in parallel.
///
/// # Errors
///
/// [`OpsError::InvalidParameter`] if `kernel_size` is zero.
///
/// # Example
///
/// ```rust
/// use bokeh_core::Image;
/// use bokeh_ops::filter::gaussian_blur;
///
/// let img = Image::filled(16, 16, &[0.25, 0.5, 0.75]);
/// let out = gaussian_blur(&img, 7, 2.0).unwrap();
/// assert!((out.pixel(8, 8).unwrap()[1] - 0.5).abs() < 1e-5);
/// ```
pub fn gaussian_blur(image: &Image, kernel_size: usize, sigma: f32) -> OpsResult<Image> {
    trace!(kernel_size, sigma, "gaussian_blur");
    if kernel_size == 0 {
        return Err(OpsError::InvalidParameter(
            "gaussian kernel size must be > 0".into(),
        ));
    }
    let width = image.width() as usize;
    let height = image.height() as usize;
    let taps = Kernel::gaussian_1d(kernel_size, sigma);
    debug!(taps = taps.len(), width, height, "Applying gaussian blur");

    let planes = image
        .planes()
        .into_par_iter()
        .map(|plane| {
            let inter = convolve_rows(&plane, width, height, &taps, BorderMode::Replicate)?;
            convolve_cols(&inter, width, height, &taps, BorderMode::Replicate)
        })
        .collect::<OpsResult<Vec<_>>>()?;

    Ok(Image::from_planes(image.width(), image.height(), &planes)?)
}

/// Gaussian blur parameters usable as a depth-layer blur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianBlur {
    /// Standard deviation; `<= 0` derives it from the kernel size.
    pub sigma: f32,
}

impl Default for GaussianBlur {
    fn default() -> Self {
        Self { sigma: 5.0 }
    }
}

impl GaussianBlur {
    /// Blurs with the given kernel size.
    pub fn apply(&self, image: &Image, kernel_size: usize) -> OpsResult<Image> {
        gaussian_blur(image, kernel_size, self.sigma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_border_replicate() {
        let b = BorderMode::Replicate;
        assert_eq!(b.resolve(-3, 5), 0);
        assert_eq!(b.resolve(2, 5), 2);
        assert_eq!(b.resolve(9, 5), 4);
    }

    #[test]
    fn test_border_reflect101() {
        let b = BorderMode::Reflect101;
        assert_eq!(b.resolve(-1, 5), 1);
        assert_eq!(b.resolve(-2, 5), 2);
        assert_eq!(b.resolve(5, 5), 3);
        assert_eq!(b.resolve(6, 5), 2);
        // Wider than the image: keeps folding.
        assert_eq!(b.resolve(-7, 3), 1);
        assert_eq!(b.resolve(4, 1), 0);
    }

    #[test]
    fn test_border_reflect101_far_offsets() {
        // Step-by-step mirror walk as the reference.
        fn walk(mut i: isize, n: isize) -> usize {
            while i < 0 || i >= n {
                i = if i < 0 { -i } else { 2 * (n - 1) - i };
            }
            i as usize
        }
        let b = BorderMode::Reflect101;
        for len in [2usize, 3, 5, 8] {
            for i in -40..40 {
                assert_eq!(b.resolve(i, len), walk(i, len as isize), "i={} len={}", i, len);
            }
        }
        assert_eq!(b.resolve(1_000_000_001, 3), 1);
        assert_eq!(b.resolve(-1_000_000_000, 5), 0);
        assert!(b.resolve(isize::MIN + 1, 7) < 7);
    }

    #[test]
    fn test_kernel_new_validates() {
        assert!(Kernel::new(vec![0.0; 4], 2, 2).is_err());
        assert!(Kernel::new(vec![0.0; 8], 3, 3).is_err());
        assert!(Kernel::new(vec![0.0; 9], 3, 3).is_ok());
    }

    #[test]
    fn test_gaussian_1d() {
        let taps = Kernel::gaussian_1d(4, 1.0);
        assert_eq!(taps.len(), 5);
        assert_abs_diff_eq!(taps.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert!(taps[2] > taps[1] && taps[1] > taps[0]);
        assert_abs_diff_eq!(taps[0], taps[4], epsilon = 1e-7);
    }

    #[test]
    fn test_gaussian_1d_derived_sigma() {
        // size 7 -> sigma 1.4
        let derived = Kernel::gaussian_1d(7, 0.0);
        let explicit = Kernel::gaussian_1d(7, 1.4);
        for (a, b) in derived.iter().zip(&explicit) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_row_and_column_passes() {
        // 3x2 plane, filter along each axis and compare against hand values.
        let plane = vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let taps = [0.25, 0.5, 0.25];
        let rows = convolve_rows(&plane, 3, 2, &taps, BorderMode::Replicate).unwrap();
        assert_eq!(rows, vec![0.25, 0.5, 0.25, 0.25, 0.5, 0.25]);

        let cols = convolve_cols(&plane, 3, 2, &taps, BorderMode::Replicate).unwrap();
        assert_eq!(cols, plane);
    }

    #[test]
    fn test_replicate_keeps_edges_bright() {
        let plane = vec![1.0f32; 5 * 5];
        let taps = Kernel::gaussian_1d(9, 3.0);
        let out = convolve_rows(&plane, 5, 5, &taps, BorderMode::Replicate).unwrap();
        let out = convolve_cols(&out, 5, 5, &taps, BorderMode::Replicate).unwrap();
        for v in out {
            assert_abs_diff_eq!(v, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_even_taps_rejected() {
        let plane = vec![0.0f32; 4];
        assert!(matches!(
            convolve_rows(&plane, 2, 2, &[0.5, 0.5], BorderMode::Replicate),
            Err(OpsError::InvalidParameter(_))
        ));
        assert!(matches!(
            convolve_cols(&plane, 3, 2, &[1.0], BorderMode::Replicate),
            Err(OpsError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_convolve_identity_kernel() {
        let data: Vec<f32> = (0..4 * 3 * 3).map(|i| i as f32 / 36.0).collect();
        let img = Image::from_data(4, 3, 3, data).unwrap();
        let mut k = vec![0.0; 9];
        k[4] = 1.0;
        let kernel = Kernel::new(k, 3, 3).unwrap();
        let out = convolve(&img, &kernel, BorderMode::Reflect101).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_gaussian_blur_constant() {
        let img = Image::filled(12, 9, &[0.2, 0.4, 0.6]);
        let out = gaussian_blur(&img, 11, 3.0).unwrap();
        for (a, b) in out.data().iter().zip(img.data()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_gaussian_blur_spreads_impulse() {
        let mut img = Image::new(9, 9, 1);
        img.set_pixel(4, 4, &[1.0]).unwrap();
        let out = gaussian_blur(&img, 5, 1.0).unwrap();
        let center = out.pixel(4, 4).unwrap()[0];
        let side = out.pixel(5, 4).unwrap()[0];
        assert!(center < 1.0);
        assert!(side > 0.0 && side < center);
        assert_abs_diff_eq!(out.data().iter().sum::<f32>(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_gaussian_blur_zero_size() {
        let img = Image::new(4, 4, 3);
        assert!(gaussian_blur(&img, 0, 1.0).is_err());
    }
}
