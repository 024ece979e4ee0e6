//! JPEG format support.
//!
//! Decodes RGB, 8/16-bit grayscale and CMYK files; CMYK is converted to
//! RGB on load. Encodes RGB or grayscale with a configurable quality.
//!
//! # Example
//!
//! ```rust,ignore
//! use bokeh_io::jpeg::{self, JpegWriterOptions};
//!
//! let image = jpeg::read("photo.jpg")?;
//! jpeg::write_with_options("small.jpg", &image, &JpegWriterOptions { quality: 60 })?;
//! ```

use crate::{ImageData, IoError, IoResult, PixelData};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Options for writing JPEG files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegWriterOptions {
    /// Quality level 1-100. Higher = better quality, larger files.
    pub quality: u8,
}

impl Default for JpegWriterOptions {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

/// Reads a JPEG file.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<ImageData> {
    let file = File::open(path.as_ref())?;
    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(file));
    let pixels = decoder
        .decode()
        .map_err(|e| IoError::DecodeError(e.to_string()))?;
    let info = decoder
        .info()
        .ok_or_else(|| IoError::DecodeError("missing JPEG info".into()))?;

    let width = info.width as u32;
    let height = info.height as u32;

    let (channels, data) = match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => (3, PixelData::U8(pixels)),
        jpeg_decoder::PixelFormat::L8 => (1, PixelData::U8(pixels)),
        jpeg_decoder::PixelFormat::L16 => {
            let samples = pixels
                .chunks_exact(2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
                .collect();
            (1, PixelData::U16(samples))
        }
        jpeg_decoder::PixelFormat::CMYK32 => (3, PixelData::U8(cmyk_to_rgb(&pixels))),
    };

    Ok(ImageData {
        width,
        height,
        channels,
        data,
    })
}

/// Approximate CMYK to RGB conversion.
fn cmyk_to_rgb(pixels: &[u8]) -> Vec<u8> {
    pixels
        .chunks_exact(4)
        .flat_map(|cmyk| {
            let k = 1.0 - cmyk[3] as f32 / 255.0;
            let channel = |v: u8| ((1.0 - v as f32 / 255.0) * k * 255.0).round() as u8;
            [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
        })
        .collect()
}

/// Writes a JPEG file with default options (quality 90).
pub fn write<P: AsRef<Path>>(path: P, image: &ImageData) -> IoResult<()> {
    write_with_options(path, image, &JpegWriterOptions::default())
}

/// Writes a JPEG file.
///
/// One- and two-channel images are written as grayscale (alpha dropped),
/// three- and four-channel images as RGB (alpha dropped).
pub fn write_with_options<P: AsRef<Path>>(
    path: P,
    image: &ImageData,
    options: &JpegWriterOptions,
) -> IoResult<()> {
    let bytes = encode(image, options)?;
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}

/// Encodes a JPEG to memory.
pub fn encode(image: &ImageData, options: &JpegWriterOptions) -> IoResult<Vec<u8>> {
    use jpeg_encoder::{ColorType, Encoder};

    let (width, height) = match (u16::try_from(image.width), u16::try_from(image.height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(IoError::EncodeError(format!(
                "{}x{} exceeds the JPEG size limit",
                image.width, image.height
            )));
        }
    };

    let u8_data = image.to_u8();
    let (color_type, pixel_data) = match image.channels {
        1 => (ColorType::Luma, u8_data),
        2 => (ColorType::Luma, u8_data.chunks_exact(2).map(|ga| ga[0]).collect()),
        3 => (ColorType::Rgb, u8_data),
        4 => (
            ColorType::Rgb,
            u8_data
                .chunks_exact(4)
                .flat_map(|rgba| [rgba[0], rgba[1], rgba[2]])
                .collect(),
        ),
        n => {
            return Err(IoError::EncodeError(format!(
                "unsupported channel count: {}",
                n
            )));
        }
    };

    let mut buffer = Vec::new();
    let encoder = Encoder::new(&mut buffer, options.quality.clamp(1, 100));
    encoder
        .encode(&pixel_data, width, height, color_type)
        .map_err(|e: jpeg_encoder::EncodingError| IoError::EncodeError(e.to_string()))?;
    Ok(buffer)
}
