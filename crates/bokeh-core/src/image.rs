//! Floating-point image buffer.
//!
//! [`Image`] is the container every blur operates on.
//!
//! # Memory Layout
//!
//! Pixels are stored in **row-major** order, top-to-bottom, with channels
//! interleaved:
//!
//! ```text
//! Memory: [R G B R G B R G B ...]  <- Row 0
//!         [R G B R G B R G B ...]  <- Row 1
//!         ...
//! ```
//!
//! Filters that work one channel at a time pull contiguous planes out with
//! [`Image::plane`] and rebuild the image with [`Image::from_planes`].
//!
//! # Usage
//!
//! ```rust
//! use bokeh_core::Image;
//!
//! let mut img = Image::new(4, 4, 3);
//! img.set_pixel(1, 2, &[1.0, 0.5, 0.25]).unwrap();
//! assert_eq!(img.pixel(1, 2), Some(&[1.0, 0.5, 0.25][..]));
//!
//! let red = img.plane(0).unwrap();
//! assert_eq!(red.len(), 16);
//! ```

use crate::pixel::{luma_rec601, luminance_rec709};
use crate::{Error, Result};

/// Owned row-major image with interleaved `f32` channels.
///
/// Values are nominally in `[0, 1]`, but nothing here enforces that; blur
/// stages temporarily hold companded or slightly negative values.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<f32>,
}

impl Image {
    /// Creates a new image filled with zeros.
    pub fn new(width: u32, height: u32, channels: u32) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self {
            width,
            height,
            channels,
            data: vec![0.0; len],
        }
    }

    /// Creates an image from interleaved pixel data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `channels` is zero or the data
    /// length is not `width * height * channels`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bokeh_core::Image;
    ///
    /// let img = Image::from_data(2, 2, 3, vec![0.5; 12]).unwrap();
    /// assert_eq!(img.pixel_count(), 4);
    /// assert!(Image::from_data(2, 2, 3, vec![0.5; 11]).is_err());
    /// ```
    pub fn from_data(width: u32, height: u32, channels: u32, data: Vec<f32>) -> Result<Self> {
        if channels == 0 {
            return Err(Error::invalid_dimensions(width, height, "image needs at least one channel"));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("expected {} elements, got {}", expected, data.len()),
            ));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Creates an image where every pixel equals `pixel`.
    ///
    /// The channel count is taken from `pixel.len()`.
    pub fn filled(width: u32, height: u32, pixel: &[f32]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * pixel.len());
        for _ in 0..count {
            data.extend_from_slice(pixel);
        }
        Self {
            width,
            height,
            channels: pixel.len() as u32,
            data,
        }
    }

    /// Builds an interleaved image from one contiguous plane per channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if no planes are given or any
    /// plane is not `width * height` long.
    pub fn from_planes(width: u32, height: u32, planes: &[Vec<f32>]) -> Result<Self> {
        if planes.is_empty() {
            return Err(Error::invalid_dimensions(width, height, "no channel planes"));
        }
        let count = width as usize * height as usize;
        if let Some(bad) = planes.iter().find(|p| p.len() != count) {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("plane has {} samples, expected {}", bad.len(), count),
            ));
        }

        let channels = planes.len();
        let mut data = vec![0.0f32; count * channels];
        for (ch, plane) in planes.iter().enumerate() {
            for (i, &v) in plane.iter().enumerate() {
                data[i * channels + ch] = v;
            }
        }
        Ok(Self {
            width,
            height,
            channels: channels as u32,
            data,
        })
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of interleaved channels.
    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the total number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Interleaved sample data.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable interleaved sample data.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the image, returning the interleaved sample data.
    #[inline]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Returns the channels of pixel `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[f32]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let c = self.channels as usize;
        let idx = (y as usize * self.width as usize + x as usize) * c;
        Some(&self.data[idx..idx + c])
    }

    /// Overwrites pixel `(x, y)`.
    ///
    /// # Errors
    ///
    /// Fails if the coordinates are outside the image or `value` does not
    /// have one entry per channel.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: &[f32]) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::other(format!(
                "pixel ({}, {}) out of bounds for image {}x{}",
                x, y, self.width, self.height
            )));
        }
        if value.len() != self.channels as usize {
            return Err(Error::other(format!(
                "pixel has {} channels, image has {}",
                value.len(),
                self.channels
            )));
        }
        let c = self.channels as usize;
        let idx = (y as usize * self.width as usize + x as usize) * c;
        self.data[idx..idx + c].copy_from_slice(value);
        Ok(())
    }

    /// Copies channel `ch` into a contiguous row-major plane.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelOutOfRange`] if `ch >= channels()`.
    pub fn plane(&self, ch: u32) -> Result<Vec<f32>> {
        if ch >= self.channels {
            return Err(Error::channel_out_of_range(ch, self.channels));
        }
        Ok(self
            .data
            .iter()
            .skip(ch as usize)
            .step_by(self.channels as usize)
            .copied()
            .collect())
    }

    /// Splits the image into one plane per channel.
    pub fn planes(&self) -> Vec<Vec<f32>> {
        let c = self.channels as usize;
        (0..c)
            .map(|ch| self.data.iter().skip(ch).step_by(c).copied().collect())
            .collect()
    }

    /// Returns true if `other` has the same width and height.
    #[inline]
    pub fn same_size(&self, other: &Image) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Applies `f` to every sample, returning a new image.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Image {
        Image {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Mean Rec.709 luminance over all pixels.
    ///
    /// Images with fewer than three channels use the plain mean of the first
    /// channel. Returns 0 for an empty image.
    pub fn mean_luminance(&self) -> f64 {
        let count = self.pixel_count();
        let c = self.channels as usize;
        if count == 0 || c == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .data
            .chunks_exact(c)
            .map(|px| {
                if c >= 3 {
                    luminance_rec709([px[0], px[1], px[2]]) as f64
                } else {
                    px[0] as f64
                }
            })
            .sum();
        sum / count as f64
    }

    /// Collapses the image to a single Rec.601 luma plane.
    ///
    /// Single- and two-channel images return their first channel.
    pub fn to_luma(&self) -> Vec<f32> {
        let c = self.channels as usize;
        if c == 0 {
            return Vec::new();
        }
        self.data
            .chunks_exact(c)
            .map(|px| {
                if c >= 3 {
                    luma_rec601([px[0], px[1], px[2]])
                } else {
                    px[0]
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_new_is_zeroed() {
        let img = Image::new(3, 2, 3);
        assert_eq!(img.data().len(), 18);
        assert!(img.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_from_data_rejects_zero_channels() {
        assert!(Image::from_data(2, 2, 0, vec![]).is_err());
    }

    #[test]
    fn test_plane_roundtrip() {
        let data: Vec<f32> = (0..24).map(|i| i as f32).collect();
        let img = Image::from_data(4, 2, 3, data).unwrap();

        let planes = img.planes();
        assert_eq!(planes.len(), 3);
        assert_eq!(planes[1], img.plane(1).unwrap());
        assert_eq!(planes[0], vec![0.0, 3.0, 6.0, 9.0, 12.0, 15.0, 18.0, 21.0]);

        let rebuilt = Image::from_planes(4, 2, &planes).unwrap();
        assert_eq!(rebuilt, img);
    }

    #[test]
    fn test_plane_out_of_range() {
        let img = Image::new(2, 2, 3);
        assert!(matches!(img.plane(3), Err(Error::ChannelOutOfRange { .. })));
    }

    #[test]
    fn test_from_planes_length_mismatch() {
        let planes = vec![vec![0.0; 4], vec![0.0; 3]];
        assert!(Image::from_planes(2, 2, &planes).is_err());
    }

    #[test]
    fn test_pixel_access() {
        let mut img = Image::filled(3, 3, &[0.1, 0.2, 0.3]);
        assert_eq!(img.pixel(2, 2), Some(&[0.1, 0.2, 0.3][..]));
        assert_eq!(img.pixel(3, 0), None);

        img.set_pixel(0, 1, &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(img.pixel(0, 1), Some(&[1.0, 1.0, 1.0][..]));
        assert!(img.set_pixel(0, 1, &[1.0]).is_err());
        assert!(img.set_pixel(5, 1, &[1.0, 1.0, 1.0]).is_err());
    }

    #[test]
    fn test_mean_luminance() {
        let img = Image::filled(4, 4, &[0.5, 0.5, 0.5]);
        assert_abs_diff_eq!(img.mean_luminance(), 0.5, epsilon = 1e-6);

        let gray = Image::filled(2, 2, &[0.25]);
        assert_abs_diff_eq!(gray.mean_luminance(), 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_to_luma() {
        let img = Image::filled(2, 1, &[1.0, 0.0, 0.0]);
        let luma = img.to_luma();
        assert_eq!(luma.len(), 2);
        assert_abs_diff_eq!(luma[0], 0.299, epsilon = 1e-6);
    }

    #[test]
    fn test_map() {
        let img = Image::filled(2, 2, &[0.5, 0.25, 1.0]);
        let squared = img.map(|v| v * v);
        assert_eq!(squared.pixel(1, 1), Some(&[0.25, 0.0625, 1.0][..]));
    }
}
