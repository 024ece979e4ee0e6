//! PSF command
//!
//! Renders the composite 2D point spread function of a lens configuration,
//! stretched to the full `[0, 1]` range so the ringing is visible.

use crate::PsfArgs;
use anyhow::Result;
use bokeh_core::Image;
use bokeh_ops::LensBlur;
use tracing::{debug, info, trace};

pub fn run(args: PsfArgs, verbose: u8) -> Result<()> {
    trace!(radius = args.radius, components = args.components, "psf::run");
    super::check_extension(&args.output)?;

    let kernels = LensBlur::default()
        .with_radius(args.radius)
        .with_components(args.components)
        .kernels()?;
    let psf = kernels.psf()?;
    info!(size = psf.width(), components = kernels.len(), "Rendering PSF");

    let image = stretch(&psf);
    super::save_image(&args.output, &image)?;
    if verbose > 0 {
        println!(
            "Wrote {}x{} PSF to {}",
            psf.width(),
            psf.height(),
            args.output.display()
        );
    }
    Ok(())
}

/// Maps the PSF's value range linearly onto `[0, 1]`.
fn stretch(psf: &Image) -> Image {
    let (lo, hi) = psf
        .data()
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    debug!(lo, hi, "psf range");
    let span = hi - lo;
    if !span.is_finite() || span <= 0.0 {
        return psf.map(|_| 1.0);
    }
    psf.map(|v| (v - lo) / span)
}
