//! Exposure gamma companding around the convolution.
//!
//! Raising samples to `gamma` before blurring makes highlights dominate the
//! weighted average, which gives the bright "bokeh balls" of a real lens.
//! The inverse power is applied afterwards and the result clipped to
//! `[0, 1]`.

/// Raises every sample to `gamma`.
///
/// Negative samples are treated as zero. `gamma == 1` leaves the plane as is.
pub fn expand(plane: &mut [f32], gamma: f32) {
    if gamma == 1.0 {
        return;
    }
    for v in plane.iter_mut() {
        *v = v.max(0.0).powf(gamma);
    }
}

/// Clips negatives, applies `1 / gamma`, and clamps to `[0, 1]`.
///
/// Ringing from the complex kernels can push samples slightly below zero;
/// those must be clipped before the fractional power.
pub fn compress(plane: &mut [f32], gamma: f32) {
    if gamma == 1.0 {
        for v in plane.iter_mut() {
            *v = v.clamp(0.0, 1.0);
        }
        return;
    }
    let inv = 1.0 / gamma;
    for v in plane.iter_mut() {
        *v = v.max(0.0).powf(inv).min(1.0);
    }
}
