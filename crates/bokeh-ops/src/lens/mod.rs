//! Lens (bokeh) blur from a sum of complex Gaussians.
//!
//! A disc-shaped point-spread function is approximated by a handful of
//! complex Gaussian terms. Each term is separable, so a blur of radius `r`
//! costs `O(r)` per pixel per term instead of `O(r²)` for a direct disc
//! convolution.
//!
//! # Pipeline
//!
//! ```text
//! Parameters -> Kernels -> Normalize -> Convolve -> Composite -> Compand
//! ```
//!
//! - [`params`]: coefficient table lookup
//! - [`kernel`]: complex 1D kernel synthesis
//! - [`normalize`]: joint unit-energy scaling of all kernels
//! - [`executor`]: parallel (component, channel) convolution tasks
//! - [`composite`]: per-channel sum of component contributions
//! - [`compander`]: exposure gamma around the convolution
//!
//! Every stage either succeeds or aborts the whole call; no partial image is
//! ever returned.
//!
//! # Example
//!
//! ```rust
//! use bokeh_core::Image;
//! use bokeh_ops::lens::LensBlur;
//!
//! let img = Image::filled(32, 32, &[0.2, 0.4, 0.6]);
//! let out = LensBlur::new(4.0, 3, 2.0).apply(&img).unwrap();
//! assert_eq!(out.dimensions(), (32, 32));
//! ```

pub mod compander;
pub mod composite;
pub mod executor;
pub mod kernel;
pub mod normalize;
pub mod params;

use crate::filter::BorderMode;
use crate::{OpsError, OpsResult};
use bokeh_core::Image;
use executor::Executor;
use kernel::{KernelSet, MAX_RADIUS};
use params::MAX_COMPONENTS;
use tracing::{debug, trace};

/// Lens blur configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensBlur {
    /// Blur radius in pixels (> 0, fractional allowed).
    pub radius: f32,
    /// Number of complex Gaussian terms, 1 to 6. More is slower and closer
    /// to a hard-edged disc.
    pub components: usize,
    /// Exposure gamma (> 0). Higher values make highlights bloom.
    pub exposure_gamma: f32,
    /// Edge handling for the separable passes.
    pub border: BorderMode,
    /// Dedicated worker count; `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

impl Default for LensBlur {
    fn default() -> Self {
        Self {
            radius: 3.0,
            components: 5,
            exposure_gamma: 5.0,
            border: BorderMode::Replicate,
            threads: None,
        }
    }
}

impl LensBlur {
    /// Creates a lens blur with the given radius, component count and gamma.
    pub fn new(radius: f32, components: usize, exposure_gamma: f32) -> Self {
        Self {
            radius,
            components,
            exposure_gamma,
            ..Self::default()
        }
    }

    /// Sets the radius.
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Sets the component count.
    pub fn with_components(mut self, components: usize) -> Self {
        self.components = components;
        self
    }

    /// Sets the exposure gamma.
    pub fn with_exposure_gamma(mut self, gamma: f32) -> Self {
        self.exposure_gamma = gamma;
        self
    }

    /// Sets the border mode.
    pub fn with_border(mut self, border: BorderMode) -> Self {
        self.border = border;
        self
    }

    /// Runs on a dedicated pool of `threads` workers.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Checks the parameters without touching any image.
    ///
    /// # Errors
    ///
    /// [`OpsError::InvalidParameter`] for a non-positive or non-finite radius
    /// or gamma, a radius above [`MAX_RADIUS`], zero components, or zero
    /// threads.
    pub fn validate(&self) -> OpsResult<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(OpsError::InvalidParameter(format!(
                "radius must be > 0, got {}",
                self.radius
            )));
        }
        if self.radius > MAX_RADIUS {
            return Err(OpsError::InvalidParameter(format!(
                "radius must be <= {}, got {}",
                MAX_RADIUS, self.radius
            )));
        }
        if self.components == 0 {
            return Err(OpsError::InvalidParameter(
                "components must be >= 1".into(),
            ));
        }
        if !(self.exposure_gamma.is_finite() && self.exposure_gamma > 0.0) {
            return Err(OpsError::InvalidParameter(format!(
                "exposure gamma must be > 0, got {}",
                self.exposure_gamma
            )));
        }
        if self.threads == Some(0) {
            return Err(OpsError::InvalidParameter(
                "thread count must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Builds the normalized kernel set for this configuration.
    pub fn kernels(&self) -> OpsResult<KernelSet> {
        self.validate()?;
        if self.components > MAX_COMPONENTS {
            debug!(
                requested = self.components,
                max = MAX_COMPONENTS,
                "clamping component count"
            );
        }
        let set = params::parameters(self.components);
        let kernels = KernelSet::synthesize(self.radius, &set)?;
        normalize::normalize(kernels)
    }

    /// Blurs `image`.
    ///
    /// All channels are blurred independently with the same kernels.
    /// Samples are expected in `[0, 1]`; the output is clipped to that range.
    ///
    /// # Errors
    ///
    /// - [`OpsError::InvalidParameter`] for bad parameters
    /// - [`OpsError::InvalidDimensions`] for an empty image
    /// - [`OpsError::NormalizationFailure`] for a degenerate kernel set
    /// - [`OpsError::ComputeFailure`] if a convolution task fails
    pub fn apply(&self, image: &Image) -> OpsResult<Image> {
        trace!(
            width = image.width(),
            height = image.height(),
            channels = image.channels(),
            radius = self.radius,
            components = self.components,
            gamma = self.exposure_gamma,
            "lens_blur"
        );
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 || image.channels() == 0 {
            return Err(OpsError::InvalidDimensions(
                "image must not be empty".into(),
            ));
        }

        let set = self.kernels()?;
        let executor = match self.threads {
            Some(n) => Executor::with_threads(n)?,
            None => Executor::global(),
        };

        let mut planes = image.planes();
        for plane in &mut planes {
            compander::expand(plane, self.exposure_gamma);
        }

        let results = executor.run(&planes, w as usize, h as usize, &set, self.border)?;
        let plane_len = w as usize * h as usize;
        let mut channels = composite::composite(results, set.len(), planes.len(), plane_len)?;

        for plane in &mut channels {
            compander::compress(plane, self.exposure_gamma);
        }
        Ok(Image::from_planes(w, h, &channels)?)
    }
}

/// Lens blur with default border handling on the global pool.
///
/// # Example
///
/// ```rust
/// use bokeh_core::Image;
/// use bokeh_ops::lens::lens_blur;
///
/// let img = Image::filled(16, 16, &[0.5, 0.5, 0.5]);
/// let out = lens_blur(&img, 3.0, 4, 2.0).unwrap();
/// assert!((out.data()[0] - 0.5).abs() < 1e-3);
/// ```
pub fn lens_blur(
    image: &Image,
    radius: f32,
    components: usize,
    exposure_gamma: f32,
) -> OpsResult<Image> {
    LensBlur::new(radius, components, exposure_gamma).apply(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn checker(w: u32, h: u32) -> Image {
        let mut img = Image::new(w, h, 3);
        for y in 0..h {
            for x in 0..w {
                let v = if (x / 2 + y / 2) % 2 == 0 { 0.9 } else { 0.1 };
                img.set_pixel(x, y, &[v, 1.0 - v, 0.5]).unwrap();
            }
        }
        img
    }

    #[test]
    fn test_default() {
        let lens = LensBlur::default();
        assert_eq!(lens.radius, 3.0);
        assert_eq!(lens.components, 5);
        assert_eq!(lens.exposure_gamma, 5.0);
        assert_eq!(lens.border, BorderMode::Replicate);
        assert_eq!(lens.threads, None);
    }

    #[test]
    fn test_builder() {
        let lens = LensBlur::default()
            .with_radius(7.5)
            .with_components(2)
            .with_exposure_gamma(1.5)
            .with_border(BorderMode::Reflect101)
            .with_threads(3);
        assert_eq!(lens.radius, 7.5);
        assert_eq!(lens.components, 2);
        assert_eq!(lens.exposure_gamma, 1.5);
        assert_eq!(lens.border, BorderMode::Reflect101);
        assert_eq!(lens.threads, Some(3));
    }

    #[test]
    fn test_validation() {
        let bad = [
            LensBlur::new(0.0, 3, 2.0),
            LensBlur::new(-2.0, 3, 2.0),
            LensBlur::new(f32::NAN, 3, 2.0),
            LensBlur::new(3.0, 0, 2.0),
            LensBlur::new(3.0, 3, 0.0),
            LensBlur::new(3.0, 3, -1.0),
            LensBlur::new(3.0, 3, 2.0).with_threads(0),
            LensBlur::new(MAX_RADIUS * 2.0, 3, 2.0),
        ];
        for lens in bad {
            assert!(
                matches!(lens.validate(), Err(OpsError::InvalidParameter(_))),
                "{:?} should be rejected",
                lens
            );
        }
        assert!(LensBlur::new(3.0, 6, 0.5).validate().is_ok());
    }

    #[test]
    fn test_apply_rejects_bad_params_before_work() {
        let img = checker(8, 8);
        assert!(matches!(
            LensBlur::new(2.0, 0, 2.0).apply(&img),
            Err(OpsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_huge_radius_is_an_error() {
        let img = Image::filled(4, 4, &[0.5; 3]);
        for radius in [1e9, 1e30, f32::MAX] {
            assert!(matches!(
                LensBlur::new(radius, 1, 1.0).apply(&img),
                Err(OpsError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_empty_image_rejected() {
        let img = Image::new(0, 4, 3);
        assert!(matches!(
            LensBlur::default().apply(&img),
            Err(OpsError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_excess_components_clamp() {
        let img = checker(12, 10);
        let six = LensBlur::new(2.5, 6, 2.0).apply(&img).unwrap();
        let many = LensBlur::new(2.5, 40, 2.0).apply(&img).unwrap();
        assert_eq!(six, many);
    }

    #[test]
    fn test_constant_image_unchanged() {
        let img = Image::filled(20, 14, &[0.2, 0.5, 0.8]);
        for components in 1..=MAX_COMPONENTS {
            for gamma in [1.0, 2.2, 5.0] {
                let out = LensBlur::new(4.5, components, gamma).apply(&img).unwrap();
                for (a, b) in out.data().iter().zip(img.data()) {
                    assert_abs_diff_eq!(*a, *b, epsilon = 1e-3);
                }
            }
        }
    }

    #[test]
    fn test_output_in_unit_range() {
        let img = checker(24, 24);
        let out = LensBlur::new(6.0, 4, 3.0).apply(&img).unwrap();
        assert_eq!(out.dimensions(), img.dimensions());
        assert_eq!(out.channels(), 3);
        assert!(out.data().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_single_channel() {
        let img = Image::from_data(4, 4, 1, (0..16).map(|i| i as f32 / 15.0).collect()).unwrap();
        let out = lens_blur(&img, 1.5, 2, 1.0).unwrap();
        assert_eq!(out.channels(), 1);
        assert_eq!(out.dimensions(), (4, 4));
    }

    #[test]
    fn test_blur_reduces_contrast() {
        let img = checker(32, 32);
        let out = LensBlur::new(5.0, 3, 1.0).apply(&img).unwrap();
        let spread = |im: &Image| {
            let p = im.plane(0).unwrap();
            let max = p.iter().cloned().fold(f32::MIN, f32::max);
            let min = p.iter().cloned().fold(f32::MAX, f32::min);
            max - min
        };
        assert!(spread(&out) < 0.5 * spread(&img));
    }
}
