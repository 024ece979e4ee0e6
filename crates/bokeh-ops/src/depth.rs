//! Depth-driven layered blur.
//!
//! A depth map is sliced into equal-width depth buckets. The image is blurred
//! once per bucket with a strength that grows with depth, and each output
//! pixel is taken from the blur of the bucket it belongs to.
//!
//! ```text
//! amount = min_blur + lower_edge * (max_blur - min_blur)
//! ```
//!
//! # Example
//!
//! ```rust
//! use bokeh_core::Image;
//! use bokeh_ops::depth::{blur_with_depth, DepthLayers};
//! use bokeh_ops::filter::GaussianBlur;
//!
//! let img = Image::filled(16, 16, &[0.4, 0.4, 0.4]);
//! let depth = Image::filled(16, 16, &[0.5]);
//! let out = blur_with_depth(&img, &depth, &GaussianBlur::default(), &DepthLayers::default()).unwrap();
//! assert_eq!(out.dimensions(), (16, 16));
//! ```

use crate::filter::GaussianBlur;
use crate::lens::LensBlur;
use crate::motion::MotionBlur;
use crate::{OpsError, OpsResult};
use bokeh_core::Image;
use tracing::{debug, trace};

/// A blur whose strength is controlled by a single amount.
///
/// The meaning of `amount` depends on the blur: a radius for the lens blur,
/// a line length for motion blur, a kernel size for the Gaussian blur. An
/// amount too small to blur returns the image unchanged.
pub trait Blur {
    /// Blurs `image` with the given strength.
    fn blur(&self, image: &Image, amount: f32) -> OpsResult<Image>;
}

/// Rounds an amount to a kernel size; `None` when nothing would blur.
fn kernel_size(amount: f32) -> Option<usize> {
    let size = amount.round();
    (size >= 1.0).then_some(size as usize)
}

impl Blur for LensBlur {
    fn blur(&self, image: &Image, amount: f32) -> OpsResult<Image> {
        if amount <= 0.0 {
            return Ok(image.clone());
        }
        self.with_radius(amount).apply(image)
    }
}

impl Blur for MotionBlur {
    fn blur(&self, image: &Image, amount: f32) -> OpsResult<Image> {
        match kernel_size(amount) {
            Some(size) => self.apply(image, size),
            None => Ok(image.clone()),
        }
    }
}

impl Blur for GaussianBlur {
    fn blur(&self, image: &Image, amount: f32) -> OpsResult<Image> {
        match kernel_size(amount) {
            Some(size) => self.apply(image, size),
            None => Ok(image.clone()),
        }
    }
}

/// How the depth range is sliced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthLayers {
    /// Number of equal-width depth buckets.
    pub num_layers: usize,
    /// Blur amount at the nearest depth.
    pub min_blur: f32,
    /// Blur amount at depth 1.
    pub max_blur: f32,
}

impl Default for DepthLayers {
    fn default() -> Self {
        Self {
            num_layers: 10,
            min_blur: 1.0,
            max_blur: 100.0,
        }
    }
}

impl DepthLayers {
    /// Creates a layer configuration.
    pub fn new(num_layers: usize, min_blur: f32, max_blur: f32) -> Self {
        Self {
            num_layers,
            min_blur,
            max_blur,
        }
    }

    /// Blur amount for a bucket starting at `depth`.
    #[inline]
    pub fn amount(&self, depth: f32) -> f32 {
        self.min_blur + depth * (self.max_blur - self.min_blur)
    }

    fn validate(&self) -> OpsResult<()> {
        if self.num_layers == 0 {
            return Err(OpsError::InvalidParameter(
                "depth layer count must be >= 1".into(),
            ));
        }
        if !(self.min_blur.is_finite() && self.max_blur.is_finite()) {
            return Err(OpsError::InvalidParameter(format!(
                "blur range must be finite, got {}..{}",
                self.min_blur, self.max_blur
            )));
        }
        Ok(())
    }
}

/// Pixels of one depth slice.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBucket {
    /// Lower depth edge (inclusive).
    pub lower: f32,
    /// Upper depth edge (exclusive, except for the last bucket).
    pub upper: f32,
    /// Blur amount for this bucket.
    pub amount: f32,
    /// One flag per pixel, row-major.
    pub mask: Vec<bool>,
}

impl DepthBucket {
    /// Number of pixels in the bucket.
    pub fn count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
}

/// Splits a depth plane into non-empty buckets.
///
/// The range `[min, max]` of the plane is cut into `num_layers` equal
/// slices; every pixel lands in exactly one. A flat plane yields a single
/// bucket.
///
/// # Errors
///
/// [`OpsError::InvalidParameter`] for zero layers, a non-finite blur range,
/// or a depth plane containing NaN or infinity.
/// [`OpsError::InvalidDimensions`] for an empty plane.
pub fn depth_buckets(depth: &[f32], layers: &DepthLayers) -> OpsResult<Vec<DepthBucket>> {
    layers.validate()?;
    if depth.is_empty() {
        return Err(OpsError::InvalidDimensions("depth map is empty".into()));
    }
    if depth.iter().any(|v| !v.is_finite()) {
        return Err(OpsError::InvalidParameter(
            "depth map contains non-finite values".into(),
        ));
    }

    let min = depth.iter().copied().fold(f32::INFINITY, f32::min);
    let max = depth.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    let n = if range > 0.0 { layers.num_layers } else { 1 };
    let step = range / n as f32;
    let index_of = |v: f32| -> usize {
        if range > 0.0 {
            (((v - min) / step) as usize).min(n - 1)
        } else {
            0
        }
    };

    let mut buckets: Vec<DepthBucket> = (0..n)
        .map(|i| {
            let lower = min + i as f32 * step;
            let upper = if i + 1 == n { max } else { min + (i + 1) as f32 * step };
            DepthBucket {
                lower,
                upper,
                amount: layers.amount(lower),
                mask: vec![false; depth.len()],
            }
        })
        .collect();

    for (p, &v) in depth.iter().enumerate() {
        buckets[index_of(v)].mask[p] = true;
    }
    buckets.retain(|b| b.mask.iter().any(|&m| m));
    Ok(buckets)
}

/// Blurs `image` with a strength that follows `depth`.
///
/// `depth` may have any channel count; it is reduced to Rec.601 luma and is
/// expected in `[0, 1]`.
///
/// # Errors
///
/// [`OpsError::SizeMismatch`] if the depth map and image differ in size,
/// plus anything [`depth_buckets`] or the blur itself reports.
pub fn blur_with_depth<B: Blur + ?Sized>(
    image: &Image,
    depth: &Image,
    blur: &B,
    layers: &DepthLayers,
) -> OpsResult<Image> {
    trace!(
        width = image.width(),
        height = image.height(),
        layers = layers.num_layers,
        "blur_with_depth"
    );
    if !image.same_size(depth) {
        return Err(OpsError::SizeMismatch(format!(
            "depth map is {}x{}, image is {}x{}",
            depth.width(),
            depth.height(),
            image.width(),
            image.height()
        )));
    }

    let buckets = depth_buckets(&depth.to_luma(), layers)?;
    let channels = image.channels() as usize;
    let mut out = Image::new(image.width(), image.height(), image.channels());

    for bucket in &buckets {
        debug!(
            lower = bucket.lower,
            upper = bucket.upper,
            amount = bucket.amount,
            pixels = bucket.count(),
            "blurring depth layer"
        );
        let blurred = bucket_blur(image, blur, bucket.amount)?;
        let src = blurred.data();
        let dst = out.data_mut();
        for (p, _) in bucket.mask.iter().enumerate().filter(|(_, m)| **m) {
            let i = p * channels;
            dst[i..i + channels].copy_from_slice(&src[i..i + channels]);
        }
    }
    Ok(out)
}

fn bucket_blur<B: Blur + ?Sized>(image: &Image, blur: &B, amount: f32) -> OpsResult<Image> {
    if amount <= 0.0 {
        return Ok(image.clone());
    }
    blur.blur(image, amount)
}
