//! # bokeh-ops
//!
//! Blur operations for simulating camera optics.
//!
//! The centrepiece is a lens (bokeh) blur that approximates a disc-shaped
//! point-spread function with a few separable complex Gaussian kernels. A
//! directional motion blur, a plain Gaussian blur and depth-map driven
//! layering sit alongside it.
//!
//! # Modules
//!
//! - [`lens`] - Lens blur pipeline
//! - [`motion`] - Rotated line motion blur
//! - [`filter`] - Convolution primitives and Gaussian blur
//! - [`depth`] - Depth-layer compositing over any [`depth::Blur`]
//!
//! # Example
//!
//! ```rust
//! use bokeh_core::Image;
//! use bokeh_ops::lens_blur;
//!
//! let img = Image::filled(24, 24, &[0.1, 0.5, 0.9]);
//! let out = lens_blur(&img, 5.0, 4, 2.0).unwrap();
//! assert_eq!(out.dimensions(), img.dimensions());
//! ```
//!
//! # Common Operations
//!
//! ## Lens blur with options
//!
//! ```rust,ignore
//! use bokeh_ops::{BorderMode, LensBlur};
//!
//! let out = LensBlur::new(8.0, 6, 3.0)
//!     .with_border(BorderMode::Reflect101)
//!     .with_threads(4)
//!     .apply(&image)?;
//! ```
//!
//! ## Depth of field
//!
//! ```rust,ignore
//! use bokeh_ops::{blur_with_depth, DepthLayers, LensBlur};
//!
//! let out = blur_with_depth(&image, &depth, &LensBlur::default(), &DepthLayers::default())?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod depth;
pub mod filter;
pub mod lens;
pub mod motion;

pub use depth::{blur_with_depth, Blur, DepthLayers};
pub use error::{OpsError, OpsResult};
pub use filter::{gaussian_blur, BorderMode, GaussianBlur};
pub use lens::{lens_blur, LensBlur};
pub use motion::{motion_blur, MotionBlur};
