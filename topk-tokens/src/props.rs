use candle_core::{DType, Tensor};
use serde::Serialize;

use crate::batch::TopkTokensBatch;
use crate::pipeline::TopkTokensOptions;
use crate::Result;

/// Nested `[sample][outer][k][inner]` values.
pub type NestedValues = Vec<Vec<Vec<Vec<f32>>>>;

/// Nested `[sample][outer][k][inner]` token positions.
pub type NestedIndices = Vec<Vec<Vec<Vec<u32>>>>;

/// The data handed to the component rendering the top-k tokens table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopkTokensProps {
    pub tokens: Vec<Vec<String>>,
    pub topk_vals: NestedValues,
    pub topk_idxs: NestedIndices,
    pub bottomk_vals: NestedValues,
    pub bottomk_idxs: NestedIndices,
    pub first_dimension_name: String,
    pub third_dimension_name: String,
    pub sample_labels: Option<Vec<String>>,
    pub first_dimension_labels: Option<Vec<String>>,
}

impl TopkTokensProps {
    /// Converts the selected tensors of a batch into nested vectors.
    ///
    /// # Arguments
    ///
    /// * `tokens` - The tokens of each sample.
    /// * `batch` - The selection results of the batch.
    /// * `options` - The options holding the dimension names and labels.
    ///
    /// # Returns
    ///
    /// The `TopkTokensProps` instance.
    pub fn new(
        tokens: Vec<Vec<String>>,
        batch: &TopkTokensBatch,
        options: TopkTokensOptions,
    ) -> Result<Self> {
        Ok(Self {
            tokens,
            topk_vals: nested_values(&batch.topk_values)?,
            topk_idxs: nested_indices(&batch.topk_indices)?,
            bottomk_vals: nested_values(&batch.bottomk_values)?,
            bottomk_idxs: nested_indices(&batch.bottomk_indices)?,
            first_dimension_name: options.first_dimension_name,
            third_dimension_name: options.third_dimension_name,
            sample_labels: options.sample_labels,
            first_dimension_labels: options.first_dimension_labels,
        })
    }

    /// Serializes the props as a JSON string. JSON has no NaN or infinity, so non-finite values
    /// (which rank as the largest activations when NaN) are written as `null`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn nested_values(tensors: &[Tensor]) -> Result<NestedValues> {
    tensors
        .iter()
        .map(|t| -> Result<Vec<Vec<Vec<f32>>>> {
            Ok(t.to_dtype(DType::F32)?.to_vec3::<f32>()?)
        })
        .collect()
}

fn nested_indices(tensors: &[Tensor]) -> Result<NestedIndices> {
    tensors
        .iter()
        .map(|t| -> Result<Vec<Vec<Vec<u32>>>> { Ok(t.to_vec3::<u32>()?) })
        .collect()
}
