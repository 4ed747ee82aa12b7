use candle_core::{Device, Tensor};

use crate::{Error, Result};

/// Builds a `[outer, token, inner]` tensor from nested vectors.
///
/// # Arguments
///
/// * `activations` - The activations indexed as `activations[outer][token][inner]`.
/// * `device` - The device in which the tensor will be created.
///
/// # Returns
///
/// The activations tensor.
///
/// # Errors
///
/// Returns [`Error::Shape`] if the nested vectors are ragged.
pub fn tensor_from_nested(activations: Vec<Vec<Vec<f32>>>, device: &Device) -> Result<Tensor> {
    let n_outer = activations.len();
    let n_tokens = activations.first().map_or(0, |tokens| tokens.len());
    let n_inner = activations
        .first()
        .and_then(|tokens| tokens.first())
        .map_or(0, |inner| inner.len());

    let mut data = Vec::with_capacity(n_outer * n_tokens * n_inner);
    for tokens in activations {
        if tokens.len() != n_tokens {
            return Err(Error::Shape(vec![n_outer, tokens.len()]));
        }
        for inner in tokens {
            if inner.len() != n_inner {
                return Err(Error::Shape(vec![n_outer, n_tokens, inner.len()]));
            }
            data.extend(inner);
        }
    }

    Ok(Tensor::from_vec(data, (n_outer, n_tokens, n_inner), device)?)
}
