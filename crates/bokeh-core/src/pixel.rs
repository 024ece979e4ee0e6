//! Luminance weighting helpers.
//!
//! Two weightings are used across the workspace:
//!
//! - Rec.709 ([`luminance_rec709`]) for brightness statistics of linear RGB.
//! - Rec.601 ([`luma_rec601`]) for collapsing an RGB depth map to one
//!   channel, matching the usual RGB-to-gray conversion of 8-bit images.

/// Rec.709 luminance coefficients as an array [R, G, B].
pub const REC709_LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Rec.601 luma coefficients as an array [R, G, B].
pub const REC601_LUMA: [f32; 3] = [0.299, 0.587, 0.114];

/// Calculate Rec.709 luminance from RGB values.
///
/// # Example
///
/// ```
/// use bokeh_core::luminance_rec709;
/// let luma = luminance_rec709([0.5, 0.3, 0.2]);
/// // 0.5 * 0.2126 + 0.3 * 0.7152 + 0.2 * 0.0722 = 0.3353
/// assert!((luma - 0.3353).abs() < 0.0001);
/// ```
#[inline]
pub fn luminance_rec709(rgb: [f32; 3]) -> f32 {
    rgb[0] * REC709_LUMA[0] + rgb[1] * REC709_LUMA[1] + rgb[2] * REC709_LUMA[2]
}

/// Calculate Rec.601 luma from RGB values.
#[inline]
pub fn luma_rec601(rgb: [f32; 3]) -> f32 {
    rgb[0] * REC601_LUMA[0] + rgb[1] * REC601_LUMA[1] + rgb[2] * REC601_LUMA[2]
}
