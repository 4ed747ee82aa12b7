use candle_core::{Device, Tensor};
use serde::Deserialize;

use crate::batch::{select_batch, validate_batch};
use crate::props::TopkTokensProps;
use crate::utils::tensor_from_nested;
use crate::Result;

/// Options for [`topk_tokens`] and the [`TopkTokensPipeline`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopkTokensOptions {
    /// Maximum number of top and bottom activations selected per sample.
    pub max_k: usize,
    /// Name of the outer dimension (e.g. "Layer").
    pub first_dimension_name: String,
    /// Name of the inner dimension (e.g. "Neuron").
    pub third_dimension_name: String,
    /// Optional label for each sample.
    pub sample_labels: Option<Vec<String>>,
    /// Optional label for each value of the outer dimension.
    pub first_dimension_labels: Option<Vec<String>>,
}

impl Default for TopkTokensOptions {
    fn default() -> Self {
        Self {
            max_k: 10,
            first_dimension_name: "Layer".to_string(),
            third_dimension_name: "Neuron".to_string(),
            sample_labels: None,
            first_dimension_labels: None,
        }
    }
}

/// Computes the top-k and bottom-k activations along the token axis for each sample of a batch
/// and packages them with the tokens and labels for display.
///
/// # Arguments
///
/// * `tokens` - The tokens of each sample (e.g. `[["A", "person"], ["He", "ran"]]`).
/// * `activations` - The activations of each sample with shape `[outer, token, inner]`.
/// * `options` - Optional options. The defaults are used if not provided.
///
/// # Returns
///
/// The [`TopkTokensProps`] of the batch.
///
/// # Errors
///
/// Fails without computing anything if the batch is malformed (see [`validate_batch`]).
pub fn topk_tokens(
    tokens: Vec<Vec<String>>,
    activations: &[Tensor],
    options: Option<TopkTokensOptions>,
) -> Result<TopkTokensProps> {
    let options = options.unwrap_or_default();
    validate_batch(&tokens, activations, &options)?;
    let batch = select_batch(activations, options.max_k)?;
    TopkTokensProps::new(tokens, &batch, options)
}

/// A pipeline that selects the top-k tokens of batches using a set of default options.
#[derive(Debug, Clone, Default)]
pub struct TopkTokensPipeline {
    options: TopkTokensOptions,
}

impl TopkTokensPipeline {
    /// Creates a new `TopkTokensPipeline`.
    ///
    /// # Arguments
    ///
    /// * `options` - The options used when a run does not provide its own.
    ///
    /// # Returns
    ///
    /// The `TopkTokensPipeline` instance.
    pub fn new(options: Option<TopkTokensOptions>) -> Self {
        Self {
            options: options.unwrap_or_default(),
        }
    }

    pub fn get_options(&self) -> &TopkTokensOptions {
        &self.options
    }

    /// Runs the selection on a batch of activation tensors.
    pub fn run_batch(
        &self,
        tokens: Vec<Vec<String>>,
        activations: &[Tensor],
        options: Option<TopkTokensOptions>,
    ) -> Result<TopkTokensProps> {
        let options = options.unwrap_or_else(|| self.options.clone());
        topk_tokens(tokens, activations, Some(options))
    }

    /// Runs the selection on a batch of nested `[outer][token][inner]` activations.
    pub fn run_nested(
        &self,
        tokens: Vec<Vec<String>>,
        activations: Vec<Vec<Vec<Vec<f32>>>>,
        options: Option<TopkTokensOptions>,
    ) -> Result<TopkTokensProps> {
        let activations = activations
            .into_iter()
            .map(|sample| tensor_from_nested(sample, &Device::Cpu))
            .collect::<Result<Vec<_>>>()?;
        self.run_batch(tokens, &activations, options)
    }
}
