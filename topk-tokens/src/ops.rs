use candle_core::Tensor;

use crate::selector::select;
use crate::Result;

/// Top-k and bottom-k selection along the token axis of `[outer, token, inner]` tensors.
pub trait TopKTokenAxisOp {
    /// The `k` largest values along the token axis in descending order and their positions.
    fn topk_tokens(&self, k: usize) -> Result<(Tensor, Tensor)>;

    /// The `k` smallest values along the token axis, from the `k`-th smallest to the minimum, and
    /// their positions.
    fn bottomk_tokens(&self, k: usize) -> Result<(Tensor, Tensor)>;
}

impl TopKTokenAxisOp for Tensor {
    fn topk_tokens(&self, k: usize) -> Result<(Tensor, Tensor)> {
        select(self, k, true)
    }

    fn bottomk_tokens(&self, k: usize) -> Result<(Tensor, Tensor)> {
        select(self, k, false)
    }
}

#[cfg(test)]
mod tests {
    use super::TopKTokenAxisOp;
    use candle_core::{Device, Tensor};

    #[test]
    fn test_topk_bottomk_tokens() {
        let activations = Tensor::new(&[[[1f32], [9.], [4.]]], &Device::Cpu).unwrap();

        let (values, indices) = activations.topk_tokens(2).unwrap();
        assert_eq!(values.to_vec3::<f32>().unwrap(), vec![vec![vec![9.], vec![4.]]]);
        assert_eq!(indices.to_vec3::<u32>().unwrap(), vec![vec![vec![1], vec![2]]]);

        let (values, indices) = activations.bottomk_tokens(2).unwrap();
        assert_eq!(values.to_vec3::<f32>().unwrap(), vec![vec![vec![4.], vec![1.]]]);
        assert_eq!(indices.to_vec3::<u32>().unwrap(), vec![vec![vec![2], vec![0]]]);
    }
}
