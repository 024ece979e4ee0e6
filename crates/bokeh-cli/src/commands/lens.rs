//! Lens command
//!
//! Bokeh blur through the complex-kernel PSF, optionally per depth layer.

use crate::LensArgs;
use anyhow::Result;
use bokeh_ops::LensBlur;
use tracing::trace;

pub fn run(args: LensArgs, verbose: u8) -> Result<()> {
    trace!(
        radius = args.radius,
        components = args.components,
        gamma = args.exposure_gamma,
        "lens::run"
    );
    let blur = LensBlur::new(args.radius, args.components, args.exposure_gamma);
    // Surface bad parameters before any file is read.
    blur.validate()?;
    super::blur_file("lens", &args.io, &args.depth, &blur, args.radius, verbose)
}
