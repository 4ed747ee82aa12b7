use candle_core::Tensor;

use crate::ensure;
use crate::pipeline::TopkTokensOptions;
use crate::selector::{select, TOKEN_AXIS};
use crate::Result;

/// The top-k and bottom-k values and token positions of a single sample. All the tensors have
/// shape `[outer, k, inner]`.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    topk_values: Tensor,
    topk_indices: Tensor,
    bottomk_values: Tensor,
    bottomk_indices: Tensor,
}

impl SelectionResult {
    pub fn get_topk_values(&self) -> &Tensor {
        &self.topk_values
    }

    pub fn get_topk_indices(&self) -> &Tensor {
        &self.topk_indices
    }

    pub fn get_bottomk_values(&self) -> &Tensor {
        &self.bottomk_values
    }

    pub fn get_bottomk_indices(&self) -> &Tensor {
        &self.bottomk_indices
    }

    /// The number of values selected per `(outer, inner)` pair.
    pub fn get_k(&self) -> usize {
        self.topk_values.dims()[TOKEN_AXIS]
    }
}

/// The selection results of a batch, as four sequences of tensors in sample order.
#[derive(Debug, Clone, Default)]
pub struct TopkTokensBatch {
    pub topk_values: Vec<Tensor>,
    pub topk_indices: Vec<Tensor>,
    pub bottomk_values: Vec<Tensor>,
    pub bottomk_indices: Vec<Tensor>,
}

impl TopkTokensBatch {
    pub fn len(&self) -> usize {
        self.topk_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topk_values.is_empty()
    }

    fn push(&mut self, result: SelectionResult) {
        self.topk_values.push(result.topk_values);
        self.topk_indices.push(result.topk_indices);
        self.bottomk_values.push(result.bottomk_values);
        self.bottomk_indices.push(result.bottomk_indices);
    }
}

impl FromIterator<SelectionResult> for TopkTokensBatch {
    fn from_iter<T: IntoIterator<Item = SelectionResult>>(iter: T) -> Self {
        let mut batch = TopkTokensBatch::default();
        for result in iter {
            batch.push(result);
        }
        batch
    }
}

/// Computes the top-k and bottom-k activations of a single sample, with `k` clamped to the number
/// of tokens of the sample.
///
/// # Arguments
///
/// * `activations` - The activations of the sample with shape `[outer, token, inner]`.
/// * `max_k` - The maximum number of values to select.
///
/// # Returns
///
/// The [`SelectionResult`] of the sample.
pub fn select_sample(activations: &Tensor, max_k: usize) -> Result<SelectionResult> {
    let n_tokens = activations.dims().get(TOKEN_AXIS).copied().unwrap_or(0);
    let k = max_k.min(n_tokens);
    let (topk_values, topk_indices) = select(activations, k, true)?;
    let (bottomk_values, bottomk_indices) = select(activations, k, false)?;
    Ok(SelectionResult {
        topk_values,
        topk_indices,
        bottomk_values,
        bottomk_indices,
    })
}

/// Computes the top-k and bottom-k activations of every sample of a batch.
///
/// # Arguments
///
/// * `activations` - The activations of each sample with shape `[outer, token, inner]`. The
///   number of tokens can differ between samples.
/// * `max_k` - The maximum number of values to select per sample.
///
/// # Returns
///
/// A [`TopkTokensBatch`] with one entry per sample, in input order.
///
/// # Errors
///
/// Fails before selecting anything if any of the tensors does not have 3 dimensions.
pub fn select_batch(activations: &[Tensor], max_k: usize) -> Result<TopkTokensBatch> {
    for (i, sample) in activations.iter().enumerate() {
        ensure!(
            sample.rank() == 3,
            "activations of sample {} must be of the form [outer, token, inner], got shape {:?}",
            i,
            sample.dims()
        );
    }

    activations
        .iter()
        .enumerate()
        .map(|(i, sample)| -> Result<SelectionResult> {
            let result = select_sample(sample, max_k)?;
            tracing::debug!(
                "Selected top and bottom {} tokens of sample {} with shape {:?}",
                result.get_k(),
                i,
                sample.dims()
            );
            Ok(result)
        })
        .collect()
}

/// Checks that a batch of tokens and activations can be selected and displayed together.
///
/// # Arguments
///
/// * `tokens` - The tokens of each sample.
/// * `activations` - The activations of each sample with shape `[outer, token, inner]`.
/// * `options` - The options holding the optional sample and outer dimension labels.
///
/// # Errors
///
/// Returns [`crate::Error::Precondition`] describing the first violated condition.
pub fn validate_batch(
    tokens: &[Vec<String>],
    activations: &[Tensor],
    options: &TopkTokensOptions,
) -> Result<()> {
    ensure!(
        tokens.len() == activations.len(),
        "tokens and activations must be same length, got {} and {}",
        tokens.len(),
        activations.len()
    );

    let mut expected_dims: Option<(usize, usize)> = None;
    for (i, (sample_tokens, sample)) in tokens.iter().zip(activations).enumerate() {
        ensure!(
            sample.rank() == 3,
            "activations of sample {} must be of the form [outer, token, inner], got shape {:?}",
            i,
            sample.dims()
        );
        let (n_outer, n_tokens, n_inner) = sample.dims3()?;
        ensure!(n_tokens > 0, "sample {} has no tokens", i);
        ensure!(
            sample_tokens.len() == n_tokens,
            "sample {} has {} tokens but its activations have {} positions",
            i,
            sample_tokens.len(),
            n_tokens
        );
        match expected_dims {
            None => expected_dims = Some((n_outer, n_inner)),
            Some((outer, inner)) => ensure!(
                (outer, inner) == (n_outer, n_inner),
                "sample {} has outer and inner sizes ({}, {}) but sample 0 has ({}, {})",
                i,
                n_outer,
                n_inner,
                outer,
                inner
            ),
        }
    }

    if let Some(sample_labels) = &options.sample_labels {
        ensure!(
            sample_labels.len() == tokens.len(),
            "got {} sample labels for {} samples",
            sample_labels.len(),
            tokens.len()
        );
    }

    if let (Some(labels), Some((n_outer, _))) = (&options.first_dimension_labels, expected_dims) {
        ensure!(
            labels.len() == n_outer,
            "got {} {} labels but the activations have {} values in that dimension",
            labels.len(),
            options.first_dimension_name,
            n_outer
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use candle_core::Device;

    fn tokens(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("tok{}", i)).collect()
    }

    fn zeros(dims: &[usize]) -> Tensor {
        Tensor::zeros(dims, candle_core::DType::F32, &Device::Cpu).unwrap()
    }

    #[test]
    fn test_select_sample_clamps_k() {
        let activations = Tensor::new(&[[[1f32], [9.], [4.]]], &Device::Cpu).unwrap();
        let result = select_sample(&activations, 10).unwrap();
        assert_eq!(result.get_k(), 3);
        assert_eq!(
            result.get_topk_values().to_vec3::<f32>().unwrap(),
            vec![vec![vec![9.], vec![4.], vec![1.]]]
        );
        assert_eq!(
            result.get_topk_indices().to_vec3::<u32>().unwrap(),
            vec![vec![vec![1], vec![2], vec![0]]]
        );
        assert_eq!(
            result.get_bottomk_values().to_vec3::<f32>().unwrap(),
            vec![vec![vec![9.], vec![4.], vec![1.]]]
        );
        assert_eq!(
            result.get_bottomk_indices().to_vec3::<u32>().unwrap(),
            vec![vec![vec![1], vec![2], vec![0]]]
        );
    }

    #[test]
    fn test_select_sample_max_k() {
        let activations = Tensor::new(&[[[1f32], [9.], [4.]]], &Device::Cpu).unwrap();
        let result = select_sample(&activations, 2).unwrap();
        assert_eq!(
            result.get_topk_values().to_vec3::<f32>().unwrap(),
            vec![vec![vec![9.], vec![4.]]]
        );
        assert_eq!(
            result.get_topk_indices().to_vec3::<u32>().unwrap(),
            vec![vec![vec![1], vec![2]]]
        );
        assert_eq!(
            result.get_bottomk_values().to_vec3::<f32>().unwrap(),
            vec![vec![vec![4.], vec![1.]]]
        );
        assert_eq!(
            result.get_bottomk_indices().to_vec3::<u32>().unwrap(),
            vec![vec![vec![2], vec![0]]]
        );
    }

    #[test]
    fn test_select_batch_ragged_tokens() {
        let activations = vec![zeros(&[2, 5, 3]), zeros(&[2, 2, 3]), zeros(&[2, 4, 3])];
        let batch = select_batch(&activations, 3).unwrap();
        assert_eq!(batch.len(), 3);
        let ks: Vec<usize> = batch.topk_values.iter().map(|t| t.dims()[1]).collect();
        assert_eq!(ks, vec![3, 2, 3]);
        for tensors in [
            &batch.topk_values,
            &batch.topk_indices,
            &batch.bottomk_values,
            &batch.bottomk_indices,
        ] {
            assert_eq!(tensors.len(), 3);
            assert_eq!(tensors[1].dims(), &[2, 2, 3]);
        }
    }

    #[test]
    fn test_select_batch_rejects_rank_before_selecting() {
        let activations = vec![zeros(&[1, 3, 1]), zeros(&[3, 1])];
        assert!(matches!(
            select_batch(&activations, 2),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn test_select_batch_zero_max_k() {
        let activations = vec![zeros(&[1, 3, 1])];
        assert!(matches!(
            select_batch(&activations, 0),
            Err(Error::Range {
                k: 0,
                token_count: 3
            })
        ));
    }

    #[test]
    fn test_validate_batch() {
        let options = TopkTokensOptions::default();
        let activations = vec![zeros(&[2, 3, 4]), zeros(&[2, 1, 4])];
        let ok_tokens = vec![tokens(3), tokens(1)];
        assert!(validate_batch(&ok_tokens, &activations, &options).is_ok());

        let cases: Vec<(Vec<Vec<String>>, Vec<Tensor>, TopkTokensOptions)> = vec![
            // Different number of samples.
            (vec![tokens(3)], activations.clone(), options.clone()),
            // Not rank 3.
            (ok_tokens.clone(), vec![zeros(&[2, 3, 4]), zeros(&[1, 4])], options.clone()),
            // Token count mismatch.
            (vec![tokens(3), tokens(2)], activations.clone(), options.clone()),
            // Inner size mismatch.
            (ok_tokens.clone(), vec![zeros(&[2, 3, 4]), zeros(&[2, 1, 5])], options.clone()),
            // Empty sample.
            (
                vec![tokens(3), tokens(0)],
                vec![zeros(&[2, 3, 4]), zeros(&[2, 0, 4])],
                options.clone(),
            ),
            // Wrong number of sample labels.
            (
                ok_tokens.clone(),
                activations.clone(),
                TopkTokensOptions {
                    sample_labels: Some(vec!["a".to_string()]),
                    ..Default::default()
                },
            ),
            // Wrong number of outer dimension labels.
            (
                ok_tokens.clone(),
                activations.clone(),
                TopkTokensOptions {
                    first_dimension_labels: Some(vec!["L0".to_string()]),
                    ..Default::default()
                },
            ),
        ];

        for (tokens, activations, options) in cases {
            assert!(matches!(
                validate_batch(&tokens, &activations, &options),
                Err(Error::Precondition(_))
            ));
        }
    }
}
