//! # bokeh-io
//!
//! PNG and JPEG reading and writing for the blur tools.
//!
//! Files are decoded into [`ImageData`], which keeps the stored integer
//! samples. [`ImageData::to_image`] scales them into the `[0, 1]` float
//! range used by `bokeh-ops`, and [`ImageData::from_image`] quantizes a
//! processed image back to 8 bits.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bokeh_io::{read, write, ImageData};
//!
//! let image = read("input.png")?.to_rgb_image()?;
//! // ... blur ...
//! write("output.jpg", &ImageData::from_image(&image))?;
//! ```
//!
//! # Supported Formats
//!
//! | Format | Read | Write | Bit Depths |
//! |--------|------|-------|------------|
//! | PNG | Yes | Yes | read 1-16, write 8 |
//! | JPEG | Yes | Yes | 8 (16-bit grayscale read) |
//!
//! # Feature Flags
//!
//! - `png` - PNG support (default)
//! - `jpeg` - JPEG support (default)

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod detect;
mod error;

#[cfg(feature = "png")]
pub mod png;

#[cfg(feature = "jpeg")]
pub mod jpeg;

pub use detect::Format;
pub use error::{IoError, IoResult};

use bokeh_core::Image;
use std::path::Path;
use tracing::debug;

/// Reads an image from a file, auto-detecting the format.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be opened
/// - The format is not supported
/// - The file is corrupted
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<ImageData> {
    let path = path.as_ref();
    let format = Format::detect(path)?;
    debug!(path = %path.display(), ?format, "reading image");

    match format {
        #[cfg(feature = "png")]
        Format::Png => png::read(path),

        #[cfg(feature = "jpeg")]
        Format::Jpeg => jpeg::read(path),

        _ => Err(unsupported(path)),
    }
}

/// Writes an image to a file, choosing the format from the extension.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be created
/// - The extension is not a supported format
/// - The channel count is not supported by the format
pub fn write<P: AsRef<Path>>(path: P, image: &ImageData) -> IoResult<()> {
    let path = path.as_ref();
    let format = Format::from_extension(path);
    debug!(path = %path.display(), ?format, width = image.width, height = image.height, "writing image");

    match format {
        #[cfg(feature = "png")]
        Format::Png => png::write(path, image),

        #[cfg(feature = "jpeg")]
        Format::Jpeg => jpeg::write(path, image),

        _ => Err(unsupported(path)),
    }
}

fn unsupported(path: &Path) -> IoError {
    IoError::UnsupportedFormat(
        path.extension()
            .and_then(|e| e.to_str())
            .unwrap_or("unknown")
            .to_string(),
    )
}

/// Decoded image with integer samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Number of interleaved channels (1 to 4).
    pub channels: u32,
    /// Sample storage.
    pub data: PixelData,
}

/// Raw pixel data storage.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    /// 8-bit unsigned data.
    U8(Vec<u8>),
    /// 16-bit unsigned data.
    U16(Vec<u16>),
}

impl ImageData {
    /// Creates ImageData from u8 pixel data.
    pub fn from_u8(width: u32, height: u32, channels: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            data: PixelData::U8(data),
        }
    }

    /// Creates ImageData from u16 pixel data.
    pub fn from_u16(width: u32, height: u32, channels: u32, data: Vec<u16>) -> Self {
        Self {
            width,
            height,
            channels,
            data: PixelData::U16(data),
        }
    }

    /// Quantizes a float image to 8 bits, clamping to `[0, 1]` and rounding.
    pub fn from_image(image: &Image) -> Self {
        let data = image
            .data()
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        Self::from_u8(image.width(), image.height(), image.channels(), data)
    }

    /// Returns the total number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns the bit depth of the stored samples.
    pub fn bit_depth(&self) -> u8 {
        match self.data {
            PixelData::U8(_) => 8,
            PixelData::U16(_) => 16,
        }
    }

    /// Converts samples to f32 in `[0, 1]`.
    pub fn to_f32(&self) -> Vec<f32> {
        match &self.data {
            PixelData::U8(data) => data.iter().map(|&v| v as f32 / 255.0).collect(),
            PixelData::U16(data) => data.iter().map(|&v| v as f32 / 65535.0).collect(),
        }
    }

    /// Converts samples to u8.
    pub fn to_u8(&self) -> Vec<u8> {
        match &self.data {
            PixelData::U8(data) => data.clone(),
            PixelData::U16(data) => data.iter().map(|&v| (v >> 8) as u8).collect(),
        }
    }

    /// Converts to a float image with the stored channel count.
    ///
    /// # Errors
    ///
    /// [`IoError::Core`] if the sample count does not match the dimensions.
    pub fn to_image(&self) -> IoResult<Image> {
        Ok(Image::from_data(self.width, self.height, self.channels, self.to_f32())?)
    }

    /// Converts to a three-channel float image.
    ///
    /// Grayscale is replicated into all three channels and alpha is dropped.
    ///
    /// # Errors
    ///
    /// [`IoError::UnsupportedBitDepth`] for channel counts outside 1 to 4,
    /// [`IoError::Core`] if the sample count does not match the dimensions.
    pub fn to_rgb_image(&self) -> IoResult<Image> {
        let samples = self.to_f32();
        let c = self.channels as usize;
        let rgb: Vec<f32> = match c {
            1 | 2 => samples.chunks_exact(c).flat_map(|px| [px[0]; 3]).collect(),
            3 => samples,
            4 => samples
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
            n => {
                return Err(IoError::UnsupportedBitDepth(format!(
                    "{} channels cannot be converted to RGB",
                    n
                )));
            }
        };
        Ok(Image::from_data(self.width, self.height, 3, rgb)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_image_rounds_and_clamps() {
        let img = Image::from_data(2, 1, 2, vec![-0.5, 0.5, 1.0, 2.0]).unwrap();
        let data = ImageData::from_image(&img);
        assert_eq!(data.data, PixelData::U8(vec![0, 128, 255, 255]));
        assert_eq!(data.channels, 2);
        assert_eq!(data.bit_depth(), 8);
    }

    #[test]
    fn test_u16_scaling() {
        let data = ImageData::from_u16(1, 1, 1, vec![65535]);
        assert_eq!(data.to_f32(), vec![1.0]);
        assert_eq!(data.to_u8(), vec![255]);
        assert_eq!(data.bit_depth(), 16);
    }

    #[test]
    fn test_rgb_conversion() {
        let gray = ImageData::from_u8(2, 1, 1, vec![0, 255]);
        let rgb = gray.to_rgb_image().unwrap();
        assert_eq!(rgb.channels(), 3);
        assert_eq!(rgb.data(), &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);

        let rgba = ImageData::from_u8(1, 1, 4, vec![255, 0, 255, 0]);
        assert_eq!(rgba.to_rgb_image().unwrap().data(), &[1.0, 0.0, 1.0]);

        let gray_alpha = ImageData::from_u8(1, 1, 2, vec![255, 0]);
        assert_eq!(gray_alpha.to_rgb_image().unwrap().data(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_bad_channel_count() {
        let odd = ImageData::from_u8(1, 1, 5, vec![0; 5]);
        assert!(matches!(odd.to_rgb_image(), Err(IoError::UnsupportedBitDepth(_))));
    }

    #[test]
    fn test_length_mismatch() {
        let short = ImageData::from_u8(2, 2, 3, vec![0; 5]);
        assert!(matches!(short.to_image(), Err(IoError::Core(_))));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let data = ImageData::from_u8(1, 1, 3, vec![0; 3]);
        assert!(matches!(
            write("out.bmp", &data),
            Err(IoError::UnsupportedFormat(ext)) if ext == "bmp"
        ));
    }
}
