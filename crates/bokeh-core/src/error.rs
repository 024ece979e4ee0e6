//! Error types for bokeh-core operations.
//!
//! Covers the failure modes of the [`Image`](crate::Image) container:
//! buffer length validation, channel indexing and size comparisons.
//! Higher-level crates wrap [`Error`] in their own error enums.
//!
//! # Usage
//!
//! ```rust
//! use bokeh_core::{Error, Result};
//!
//! fn check_channel(ch: u32, channels: u32) -> Result<()> {
//!     if ch >= channels {
//!         return Err(Error::channel_out_of_range(ch, channels));
//!     }
//!     Ok(())
//! }
//! assert!(check_channel(3, 3).is_err());
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when building or indexing images.
#[derive(Debug, Error)]
pub enum Error {
    /// Buffer length or dimensions are not usable.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// What was wrong
        reason: String,
    },

    /// Two images were expected to share a size.
    #[error("dimension mismatch: {a_width}x{a_height} vs {b_width}x{b_height}")]
    DimensionMismatch {
        /// First image width
        a_width: u32,
        /// First image height
        a_height: u32,
        /// Second image width
        b_width: u32,
        /// Second image height
        b_height: u32,
    },

    /// A channel index beyond the image's channel count.
    #[error("channel {channel} out of range for {channels}-channel image")]
    ChannelOutOfRange {
        /// Requested channel
        channel: u32,
        /// Channels in the image
        channels: u32,
    },

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::DimensionMismatch`] error from `(width, height)` pairs.
    #[inline]
    pub fn dimension_mismatch(a: (u32, u32), b: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            a_width: a.0,
            a_height: a.1,
            b_width: b.0,
            b_height: b.1,
        }
    }

    /// Creates an [`Error::ChannelOutOfRange`] error.
    #[inline]
    pub fn channel_out_of_range(channel: u32, channels: u32) -> Self {
        Self::ChannelOutOfRange { channel, channels }
    }

    /// Creates an [`Error::Other`] error.
    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
