//! Gaussian command

use crate::GaussianArgs;
use anyhow::Result;
use bokeh_ops::GaussianBlur;
use tracing::trace;

pub fn run(args: GaussianArgs, verbose: u8) -> Result<()> {
    trace!(kernel = args.kernel, sigma = args.sigma, "gaussian::run");
    let blur = GaussianBlur { sigma: args.sigma };
    super::blur_file("gaussian", &args.io, &args.depth, &blur, args.kernel as f32, verbose)
}
