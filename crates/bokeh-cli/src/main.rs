//! bokeh - lens, motion and gaussian blur from the command line
//!
//! Every blur command can also run per depth layer when given a depth map.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

mod commands;

#[derive(Parser)]
#[command(name = "bokeh")]
#[command(author, version, about = "Lens blur (bokeh), motion blur and gaussian blur")]
#[command(long_about = "
Simulates out-of-focus camera blur with a separable complex-kernel PSF.

Examples:
  bokeh lens photo.jpg -o soft.png -r 12          # Circular bokeh
  bokeh lens photo.jpg -o soft.png -c 6 -g 3     # Sharper disc, brighter highlights
  bokeh lens photo.jpg --depth-map depth.png     # Blur grows with depth
  bokeh motion photo.jpg -s 40 -a 90             # Vertical streaks
  bokeh gaussian photo.jpg -k 21 -s 4
  bokeh psf -r 30 -c 4 -o psf.png                # Inspect the kernel shape
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Lens (bokeh) blur
    #[command(visible_alias = "l")]
    Lens(LensArgs),

    /// Directional motion blur
    #[command(visible_alias = "m")]
    Motion(MotionArgs),

    /// Gaussian blur
    #[command(visible_alias = "g")]
    Gaussian(GaussianArgs),

    /// Write the lens PSF as a grayscale image
    Psf(PsfArgs),
}

/// Input and output shared by the blur commands.
#[derive(Args)]
struct IoArgs {
    /// Input image (.png, .jpg, .jpeg)
    input: PathBuf,

    /// Output image
    #[arg(short, long, default_value = "result.png")]
    output: PathBuf,
}

/// Per-layer blurring driven by a depth map.
#[derive(Args)]
struct DepthArgs {
    /// Depth map; brighter is farther. Overrides the blur size.
    #[arg(long)]
    depth_map: Option<PathBuf>,

    /// Number of depth layers
    #[arg(long, default_value = "10")]
    depth_layers: usize,

    /// Blur amount at the nearest depth
    #[arg(long, default_value = "1")]
    depth_min_blur: f32,

    /// Blur amount at the farthest depth
    #[arg(long, default_value = "100")]
    depth_max_blur: f32,
}

#[derive(Args)]
struct LensArgs {
    #[command(flatten)]
    io: IoArgs,

    /// Blur radius in pixels
    #[arg(short, long, default_value = "5")]
    radius: f32,

    /// Number of kernel components (1-6)
    #[arg(short, long, default_value = "4")]
    components: usize,

    /// Exposure gamma; higher values bloom highlights
    #[arg(short = 'g', long, default_value = "2")]
    exposure_gamma: f32,

    #[command(flatten)]
    depth: DepthArgs,
}

#[derive(Args)]
struct MotionArgs {
    #[command(flatten)]
    io: IoArgs,

    /// Kernel size in pixels
    #[arg(short, long, default_value = "100")]
    size: usize,

    /// Direction in degrees, counter-clockwise from horizontal
    #[arg(short, long, default_value = "30", allow_hyphen_values = true)]
    angle: f32,

    #[command(flatten)]
    depth: DepthArgs,
}

#[derive(Args)]
struct GaussianArgs {
    #[command(flatten)]
    io: IoArgs,

    /// Kernel size in pixels (even sizes are rounded up)
    #[arg(short, long, default_value = "100")]
    kernel: usize,

    /// Standard deviation (0 = derive from kernel size)
    #[arg(short, long, default_value = "5")]
    sigma: f32,

    #[command(flatten)]
    depth: DepthArgs,
}

#[derive(Args)]
struct PsfArgs {
    /// Output image
    #[arg(short, long, default_value = "psf.png")]
    output: PathBuf,

    /// Blur radius in pixels
    #[arg(short, long, default_value = "5")]
    radius: f32,

    /// Number of kernel components (1-6)
    #[arg(short, long, default_value = "4")]
    components: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Lens(args) => commands::lens::run(args, cli.verbose),
        Commands::Motion(args) => commands::motion::run(args, cli.verbose),
        Commands::Gaussian(args) => commands::gaussian::run(args, cli.verbose),
        Commands::Psf(args) => commands::psf::run(args, cli.verbose),
    }
}

/// Installs the stderr subscriber and, with `--log-file`, a file writer.
///
/// `RUST_LOG` takes precedence over the verbosity flag. The returned guard
/// flushes the file writer on drop and must outlive the command.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal());

    let Some(path) = log_file else {
        Registry::default()
            .with(filter)
            .with(stderr_layer)
            .try_init()
            .context("Failed to initialize logging")?;
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    let file_layer = fmt::layer().with_writer(writer).with_ansi(false);

    Registry::default()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_lens_defaults() {
        let cli = Cli::try_parse_from(["bokeh", "lens", "in.png"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.threads, 0);
        match cli.command {
            Commands::Lens(args) => {
                assert_eq!(args.io.output, PathBuf::from("result.png"));
                assert_eq!(args.radius, 5.0);
                assert_eq!(args.components, 4);
                assert_eq!(args.exposure_gamma, 2.0);
                assert!(args.depth.depth_map.is_none());
                assert_eq!(args.depth.depth_layers, 10);
                assert_eq!(args.depth.depth_min_blur, 1.0);
                assert_eq!(args.depth.depth_max_blur, 100.0);
            }
            _ => panic!("expected lens"),
        }
    }

    #[test]
    fn test_motion_and_gaussian_defaults() {
        match Cli::try_parse_from(["bokeh", "motion", "in.jpg"]).unwrap().command {
            Commands::Motion(args) => {
                assert_eq!(args.size, 100);
                assert_eq!(args.angle, 30.0);
            }
            _ => panic!("expected motion"),
        }
        match Cli::try_parse_from(["bokeh", "gaussian", "in.jpg"]).unwrap().command {
            Commands::Gaussian(args) => {
                assert_eq!(args.kernel, 100);
                assert_eq!(args.sigma, 5.0);
            }
            _ => panic!("expected gaussian"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bokeh", "lens", "in.png", "-vv", "-j", "2"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.threads, 2);
    }

    #[test]
    fn test_negative_angle() {
        let cli = Cli::try_parse_from(["bokeh", "motion", "in.png", "-a", "-45"]).unwrap();
        match cli.command {
            Commands::Motion(args) => assert_eq!(args.angle, -45.0),
            _ => panic!("expected motion"),
        }
    }
}
