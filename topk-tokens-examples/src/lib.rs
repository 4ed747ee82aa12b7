use anyhow::Result;
use candle_core::{Device, Tensor};
use rand::Rng;

/// Builds a `[outer, token, inner]` tensor of activations drawn uniformly from `[-1, 1)`.
pub fn random_activations<R: Rng>(
    rng: &mut R,
    n_outer: usize,
    n_tokens: usize,
    n_inner: usize,
) -> Result<Tensor> {
    let data: Vec<f32> = (0..n_outer * n_tokens * n_inner)
        .map(|_| rng.gen_range(-1.0..1.0))
        .collect();
    Ok(Tensor::from_vec(data, (n_outer, n_tokens, n_inner), &Device::Cpu)?)
}

/// Builds placeholder tokens (`tok0`, `tok1`, ...) for a sample.
pub fn placeholder_tokens(n_tokens: usize) -> Vec<String> {
    (0..n_tokens).map(|i| format!("tok{}", i)).collect()
}
