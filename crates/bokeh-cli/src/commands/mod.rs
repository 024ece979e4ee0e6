//! CLI command implementations.

pub mod gaussian;
pub mod lens;
pub mod motion;
pub mod psf;

use crate::{DepthArgs, IoArgs};
use anyhow::{Context, Result, bail};
use bokeh_core::Image;
use bokeh_io::ImageData;
use bokeh_ops::{Blur, DepthLayers, blur_with_depth};
use std::path::Path;
use tracing::{info, trace, warn};

const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Rejects paths whose extension is not a supported image format.
pub fn check_extension(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some(e) if SUPPORTED_EXTENSIONS.contains(&e) => Ok(()),
        _ => bail!(
            "Unsupported image type: {} (expected .png, .jpg or .jpeg)",
            path.display()
        ),
    }
}

/// Loads an image as three-channel float RGB.
pub fn load_image(path: &Path) -> Result<Image> {
    check_extension(path)?;
    bokeh_io::read(path)
        .and_then(|data| data.to_rgb_image())
        .with_context(|| format!("Failed to load: {}", path.display()))
}

/// Loads a depth map, keeping its channel count for luma reduction.
pub fn load_depth(path: &Path) -> Result<Image> {
    check_extension(path)?;
    bokeh_io::read(path)
        .and_then(|data| data.to_image())
        .with_context(|| format!("Failed to load depth map: {}", path.display()))
}

/// Saves a float image, quantized to 8 bits.
pub fn save_image(path: &Path, image: &Image) -> Result<()> {
    check_extension(path)?;
    bokeh_io::write(path, &ImageData::from_image(image))
        .with_context(|| format!("Failed to save: {}", path.display()))
}

/// Loads the input, blurs it uniformly or per depth layer, and saves it.
///
/// `amount` is the command's own size or radius; it is ignored when a
/// depth map is given.
pub fn blur_file<B: Blur>(
    name: &str,
    io: &IoArgs,
    depth: &DepthArgs,
    blur: &B,
    amount: f32,
    verbose: u8,
) -> Result<()> {
    trace!(command = name, input = %io.input.display(), amount, "blur_file");
    check_extension(&io.output)?;
    let image = load_image(&io.input)?;

    let result = match &depth.depth_map {
        Some(depth_path) => {
            warn!(
                command = name,
                amount, "depth map given; the blur size comes from the depth layers"
            );
            let depth_image = load_depth(depth_path)?;
            let layers = DepthLayers::new(
                depth.depth_layers,
                depth.depth_min_blur,
                depth.depth_max_blur,
            );
            info!(
                command = name,
                layers = layers.num_layers,
                min = layers.min_blur,
                max = layers.max_blur,
                "Applying depth blur"
            );
            if verbose > 0 {
                println!(
                    "Applying {} blur over {} depth layers ({}..{}) to {}",
                    name,
                    layers.num_layers,
                    layers.min_blur,
                    layers.max_blur,
                    io.input.display()
                );
            }
            blur_with_depth(&image, &depth_image, blur, &layers)?
        }
        None => {
            info!(
                command = name,
                amount,
                w = image.width(),
                h = image.height(),
                "Applying blur"
            );
            if verbose > 0 {
                println!("Applying {} blur ({}) to {}", name, amount, io.input.display());
            }
            blur.blur(&image, amount)?
        }
    };

    save_image(&io.output, &result)?;
    if verbose > 0 {
        println!("Done.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_extension() {
        assert!(check_extension(Path::new("a.png")).is_ok());
        assert!(check_extension(Path::new("a.JPG")).is_ok());
        assert!(check_extension(Path::new("dir/a.jpeg")).is_ok());
        assert!(check_extension(Path::new("a.exr")).is_err());
        assert!(check_extension(Path::new("noext")).is_err());
    }
}
