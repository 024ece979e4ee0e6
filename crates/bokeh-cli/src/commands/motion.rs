//! Motion command

use crate::MotionArgs;
use anyhow::Result;
use bokeh_ops::MotionBlur;
use tracing::trace;

pub fn run(args: MotionArgs, verbose: u8) -> Result<()> {
    trace!(size = args.size, angle = args.angle, "motion::run");
    let blur = MotionBlur { angle: args.angle };
    super::blur_file("motion", &args.io, &args.depth, &blur, args.size as f32, verbose)
}
