//! # bokeh-core
//!
//! Core types shared by the bokeh-rs crates.
//!
//! - [`Image`] - Row-major interleaved `f32` image buffer
//! - [`Error`], [`Result`] - Buffer and dimension errors
//! - [`luminance_rec709`], [`luma_rec601`] - Luminance weighting helpers
//!
//! ## Crate Structure
//!
//! ```text
//! bokeh-core (this crate)
//!    ^
//!    |
//!    +-- bokeh-ops (lens, motion, gaussian blur, depth compositing)
//!    +-- bokeh-io (PNG / JPEG I/O)
//!    +-- bokeh-cli
//! ```
//!
//! Pixel values are normalized floats. Loaders scale integer storage into
//! `[0, 1]` and writers quantize back, see `bokeh-io`.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod image;
pub mod pixel;

pub use error::{Error, Result};
pub use image::Image;
pub use pixel::{luma_rec601, luminance_rec709, REC601_LUMA, REC709_LUMA};
