//! Joint energy normalization of a kernel set.
//!
//! The composite PSF is `Σ_c A_c·Re(k_c⊗k_c) + B_c·Im(k_c⊗k_c)`. Its integral
//! is the double sum over tap pairs
//!
//! ```text
//! total = Σ_c Σ_i Σ_j A·(Re_i Re_j − Im_i Im_j) + B·(Re_i Im_j + Im_i Re_j)
//! ```
//!
//! which factors through the tap sums `R = Σ Re_i`, `I = Σ Im_i` into
//! `Σ_c A·(R² − I²) + 2B·R·I`. Scaling every kernel by `1/sqrt(total)`
//! scales each outer product by `1/total`, so the PSF integrates to one for
//! any radius or component count.

use super::kernel::KernelSet;
use crate::{OpsError, OpsResult};
use tracing::debug;

/// Integral of the composite 2D PSF described by `set`.
pub fn joint_energy(set: &KernelSet) -> f64 {
    set.iter()
        .map(|(kernel, p)| {
            let (re, im) = kernel.tap_sums();
            p.real_weight * (re * re - im * im) + p.imag_weight * (2.0 * re * im)
        })
        .sum()
}

/// Rescales every kernel in `set` so the composite PSF has unit energy.
///
/// # Errors
///
/// [`OpsError::NormalizationFailure`] if the energy total is not a positive
/// finite number. With the built-in table this indicates a corrupted set.
pub fn normalize(mut set: KernelSet) -> OpsResult<KernelSet> {
    let total = joint_energy(&set);
    if !(total.is_finite() && total > 0.0) {
        return Err(OpsError::NormalizationFailure { total });
    }
    let factor = 1.0 / total.sqrt();
    debug!(total, factor, components = set.len(), "normalizing kernel set");

    for kernel in &mut set.kernels {
        kernel.scale(factor);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::kernel::complex_kernel_1d;
    use crate::lens::params::{parameters, ComponentParams, MAX_COMPONENTS};
    use approx::assert_abs_diff_eq;

    /// Literal pairwise sum, used to check the factored form.
    fn pairwise_energy(set: &KernelSet) -> f64 {
        let mut total = 0.0;
        for (k, p) in set.iter() {
            for i in 0..k.len() {
                for j in 0..k.len() {
                    let (ri, ii) = (k.real[i] as f64, k.imag[i] as f64);
                    let (rj, ij) = (k.real[j] as f64, k.imag[j] as f64);
                    total += p.real_weight * (ri * rj - ii * ij)
                        + p.imag_weight * (ri * ij + ii * rj);
                }
            }
        }
        total
    }

    #[test]
    fn test_factored_energy_matches_pairwise() {
        for n in 1..=MAX_COMPONENTS {
            for radius in [1.0, 2.5, 7.0] {
                let set = KernelSet::synthesize(radius, &parameters(n)).unwrap();
                let fast = joint_energy(&set);
                let slow = pairwise_energy(&set);
                assert_abs_diff_eq!(fast, slow, epsilon = 1e-9 * slow.abs().max(1.0));
            }
        }
    }

    #[test]
    fn test_normalized_psf_has_unit_energy() {
        for n in 1..=MAX_COMPONENTS {
            for radius in [0.5, 1.0, 3.3, 10.0, 25.0] {
                let set = KernelSet::synthesize(radius, &parameters(n)).unwrap();
                let set = normalize(set).unwrap();
                let psf = set.psf().unwrap();
                let energy: f64 = psf.data().iter().map(|&v| v as f64).sum();
                assert_abs_diff_eq!(energy, 1.0, epsilon = 1e-3);
                assert_abs_diff_eq!(joint_energy(&set), 1.0, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_builtin_table_totals_are_positive() {
        for n in 1..=MAX_COMPONENTS {
            for radius in [0.01, 1.0, 4.5, 50.0] {
                let set = KernelSet::synthesize(radius, &parameters(n)).unwrap();
                assert!(joint_energy(&set) > 0.0);
            }
        }
    }

    static DEGENERATE: [ComponentParams; 1] = [ComponentParams {
        a: 1.0,
        b: 0.0,
        real_weight: -1.0,
        imag_weight: 0.0,
    }];

    #[test]
    fn test_non_positive_total_fails() {
        let set = KernelSet {
            kernels: vec![complex_kernel_1d(3.0, 1.2, 1.0, 0.0).unwrap()],
            params: &DEGENERATE,
            scale: 1.2,
            radius: 3.0,
        };
        match normalize(set) {
            Err(OpsError::NormalizationFailure { total }) => assert!(total < 0.0),
            other => panic!("expected NormalizationFailure, got {:?}", other),
        }
    }
}
