//! Per-channel summation of component contributions.

use super::executor::ConvolutionResult;
use crate::{OpsError, OpsResult};

/// Sums the weighted component planes of every channel.
///
/// Results are placed by their `(component, channel)` key, so completion
/// order does not matter. Each channel is then accumulated in ascending
/// component order, which keeps the output bit-identical across runs.
///
/// # Errors
///
/// [`OpsError::ComputeFailure`] if a pair is missing, duplicated, out of
/// range, or has the wrong plane length.
pub fn composite(
    results: Vec<ConvolutionResult>,
    components: usize,
    channels: usize,
    plane_len: usize,
) -> OpsResult<Vec<Vec<f32>>> {
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; components * channels];

    for result in results {
        if result.component >= components || result.channel >= channels {
            return Err(OpsError::ComputeFailure(format!(
                "result for component {} channel {} is out of range",
                result.component, result.channel
            )));
        }
        if result.data.len() != plane_len {
            return Err(OpsError::ComputeFailure(format!(
                "component {} channel {} has {} samples, expected {}",
                result.component,
                result.channel,
                result.data.len(),
                plane_len
            )));
        }
        let slot = &mut slots[result.component * channels + result.channel];
        if slot.is_some() {
            return Err(OpsError::ComputeFailure(format!(
                "duplicate result for component {} channel {}",
                result.component, result.channel
            )));
        }
        *slot = Some(result.data);
    }

    (0..channels)
        .map(|channel| {
            let mut sum = vec![0.0f32; plane_len];
            for component in 0..components {
                let data = slots[component * channels + channel].as_ref().ok_or_else(|| {
                    OpsError::ComputeFailure(format!(
                        "missing result for component {} channel {}",
                        component, channel
                    ))
                })?;
                for (acc, &v) in sum.iter_mut().zip(data) {
                    *acc += v;
                }
            }
            Ok(sum)
        })
        .collect()
}
