//! Sum-of-complex-Gaussians parameter table.
//!
//! Each entry approximates a disc PSF with `n` complex Gaussian terms
//! `exp(-a x²) * (cos(b x²) + i sin(b x²))`, recombined into a real PSF with
//! the weights `A` (real part) and `B` (imaginary part). Coefficients come
//! from Olli Niemitalo's fit, <http://yehar.com/blog/?p=1495>.
//!
//! Sets with more components trade speed for a flatter, sharper-edged disc.

/// Largest component count available in the table.
pub const MAX_COMPONENTS: usize = 6;

/// One complex-Gaussian term of the PSF approximation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentParams {
    /// Gaussian falloff `a`.
    pub a: f64,
    /// Phase frequency `b`.
    pub b: f64,
    /// Weight `A` of the real part in the reconstructed PSF.
    pub real_weight: f64,
    /// Weight `B` of the imaginary part in the reconstructed PSF.
    pub imag_weight: f64,
}

const fn term(a: f64, b: f64, real_weight: f64, imag_weight: f64) -> ComponentParams {
    ComponentParams {
        a,
        b,
        real_weight,
        imag_weight,
    }
}

/// Scales that bring each set's support to roughly the requested radius.
const KERNEL_SCALES: [f64; MAX_COMPONENTS] = [1.4, 1.2, 1.2, 1.2, 1.2, 1.2];

const ONE: [ComponentParams; 1] = [term(0.862325, 1.624835, 0.767583, 1.862321)];

const TWO: [ComponentParams; 2] = [
    term(0.886528, 5.268909, 0.411259, -0.548794),
    term(1.960518, 1.558213, 0.513282, 4.56111),
];

const THREE: [ComponentParams; 3] = [
    term(2.17649, 5.043495, 1.621035, -2.105439),
    term(1.019306, 9.027613, -0.28086, -0.162882),
    term(2.81511, 1.597273, -0.366471, 10.300301),
];

const FOUR: [ComponentParams; 4] = [
    term(4.338459, 1.553635, -5.767909, 46.164397),
    term(3.839993, 4.693183, 9.795391, -15.227561),
    term(2.791880, 8.178137, -3.048324, 0.302959),
    term(1.342190, 12.328289, 0.010001, 0.244650),
];

const FIVE: [ComponentParams; 5] = [
    term(4.892608, 1.685979, -22.356787, 85.91246),
    term(4.71187, 4.998496, 35.918936, -28.875618),
    term(4.052795, 8.244168, -13.212253, -1.578428),
    term(2.929212, 11.900859, 0.507991, 1.816328),
    term(1.512961, 16.116382, 0.138051, -0.01),
];

const SIX: [ComponentParams; 6] = [
    term(5.143778, 2.079813, -82.326596, 111.231024),
    term(5.612426, 6.153387, 113.878661, 58.004879),
    term(5.982921, 9.802895, 39.479083, -162.028887),
    term(6.505167, 11.059237, -71.286026, 95.027069),
    term(3.869579, 14.81052, 1.405746, -3.704914),
    term(2.201904, 19.032909, -0.152784, -0.107988),
];

static TABLE: [&[ComponentParams]; MAX_COMPONENTS] = [&ONE, &TWO, &THREE, &FOUR, &FIVE, &SIX];

/// The terms and shared scale for one component count.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSet {
    /// Ordered component terms.
    pub components: &'static [ComponentParams],
    /// Scale applied to sample positions, shared by all terms.
    pub scale: f64,
}

impl ParameterSet {
    /// Number of components in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Always false: every table entry has at least one term.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Looks up the parameter set for `component_count`.
///
/// Counts are clamped into `1..=MAX_COMPONENTS`; asking for more components
/// than tabulated returns the largest set. Zero is rejected earlier by
/// [`LensBlur`](super::LensBlur) validation and clamps to one here.
///
/// # Example
///
/// ```rust
/// use bokeh_ops::lens::params::{parameters, MAX_COMPONENTS};
///
/// let set = parameters(4);
/// assert_eq!(set.len(), 4);
/// assert_eq!(set.scale, 1.2);
/// assert_eq!(parameters(42).len(), MAX_COMPONENTS);
/// ```
pub fn parameters(component_count: usize) -> ParameterSet {
    let index = component_count.clamp(1, MAX_COMPONENTS) - 1;
    ParameterSet {
        components: TABLE[index],
        scale: KERNEL_SCALES[index],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_count_has_matching_len() {
        for n in 1..=MAX_COMPONENTS {
            assert_eq!(parameters(n).len(), n);
        }
    }

    #[test]
    fn test_clamping() {
        assert_eq!(parameters(0).len(), 1);
        assert_eq!(parameters(7).len(), 6);
        assert_eq!(parameters(usize::MAX).len(), 6);
    }

    #[test]
    fn test_scales() {
        assert_eq!(parameters(1).scale, 1.4);
        for n in 2..=MAX_COMPONENTS {
            assert_eq!(parameters(n).scale, 1.2);
        }
    }

    #[test]
    fn test_single_component_values() {
        let c = parameters(1).components[0];
        assert_eq!(c.a, 0.862325);
        assert_eq!(c.b, 1.624835);
        assert_eq!(c.real_weight, 0.767583);
        assert_eq!(c.imag_weight, 1.862321);
    }

    #[test]
    fn test_falloff_is_positive() {
        // Every term must decay, otherwise kernels grow toward the edges.
        for n in 1..=MAX_COMPONENTS {
            assert!(parameters(n).components.iter().all(|c| c.a > 0.0));
        }
    }
}
