//! Directional motion blur.
//!
//! The kernel is a horizontal line of ones in a `size×size` grid, rotated
//! about the grid centre and normalized. Applying it averages pixels along
//! the rotated direction.
//!
//! # Example
//!
//! ```rust
//! use bokeh_core::Image;
//! use bokeh_ops::motion::motion_blur;
//!
//! let img = Image::filled(20, 20, &[0.3, 0.3, 0.3]);
//! let out = motion_blur(&img, 9, 45.0).unwrap();
//! assert!((out.data()[0] - 0.3).abs() < 1e-5);
//! ```

use crate::filter::{convolve, BorderMode, Kernel};
use crate::{OpsError, OpsResult};
use bokeh_core::Image;
use tracing::{debug, trace};

/// Bilinear sample, zero outside the grid.
fn sample(grid: &[f64], size: usize, x: f64, y: f64) -> f64 {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let at = |ix: f64, iy: f64| -> f64 {
        if ix < 0.0 || iy < 0.0 || ix >= size as f64 || iy >= size as f64 {
            0.0
        } else {
            grid[iy as usize * size + ix as usize]
        }
    };
    at(x0, y0) * (1.0 - fx) * (1.0 - fy)
        + at(x0 + 1.0, y0) * fx * (1.0 - fy)
        + at(x0, y0 + 1.0) * (1.0 - fx) * fy
        + at(x0 + 1.0, y0 + 1.0) * fx * fy
}

/// Builds a normalized motion kernel.
///
/// `angle_deg` rotates the line counter-clockwise as seen on screen. Even
/// sizes are padded with a trailing zero row and column so the kernel has a
/// centre tap; the anchor stays at `size / 2`.
///
/// # Errors
///
/// [`OpsError::InvalidParameter`] if `size` is zero, the angle is not finite,
/// or the rotated line falls entirely outside the grid.
pub fn motion_kernel(size: usize, angle_deg: f32) -> OpsResult<Kernel> {
    if size == 0 {
        return Err(OpsError::InvalidParameter(
            "motion kernel size must be > 0".into(),
        ));
    }
    if !angle_deg.is_finite() {
        return Err(OpsError::InvalidParameter(format!(
            "motion angle must be finite, got {}",
            angle_deg
        )));
    }

    let mut line = vec![0.0f64; size * size];
    let mid = (size - 1) / 2;
    line[mid * size..(mid + 1) * size].fill(1.0);

    let centre = size as f64 / 2.0 - 0.5;
    let (sin, cos) = (angle_deg as f64).to_radians().sin_cos();
    let mut rotated = vec![0.0f64; size * size];
    for y in 0..size {
        let dy = y as f64 - centre;
        for x in 0..size {
            let dx = x as f64 - centre;
            let sx = cos * dx - sin * dy + centre;
            let sy = sin * dx + cos * dy + centre;
            rotated[y * size + x] = sample(&line, size, sx, sy);
        }
    }

    let sum: f64 = rotated.iter().sum();
    if sum <= 0.0 {
        return Err(OpsError::InvalidParameter(format!(
            "motion kernel of size {} at {} degrees is empty",
            size, angle_deg
        )));
    }

    let odd = size | 1;
    let mut data = vec![0.0f32; odd * odd];
    for y in 0..size {
        for x in 0..size {
            data[y * odd + x] = (rotated[y * size + x] / sum) as f32;
        }
    }
    debug!(size, odd, angle_deg, "built motion kernel");
    Kernel::new(data, odd, odd)
}

/// Blurs along a line of `size` pixels rotated by `angle_deg`.
///
/// Borders are mirrored ([`BorderMode::Reflect101`]).
pub fn motion_blur(image: &Image, size: usize, angle_deg: f32) -> OpsResult<Image> {
    trace!(size, angle_deg, "motion_blur");
    let kernel = motion_kernel(size, angle_deg)?;
    convolve(image, &kernel, BorderMode::Reflect101)
}

/// Motion blur direction, usable as a depth-layer blur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionBlur {
    /// Direction in degrees, counter-clockwise.
    pub angle: f32,
}

impl Default for MotionBlur {
    fn default() -> Self {
        Self { angle: 30.0 }
    }
}

impl MotionBlur {
    /// Blurs with a line of `size` pixels.
    pub fn apply(&self, image: &Image, size: usize) -> OpsResult<Image> {
        motion_blur(image, size, self.angle)
    }
}
