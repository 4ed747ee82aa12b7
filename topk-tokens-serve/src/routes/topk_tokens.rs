use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use topk_tokens::{TopkTokensOptions, TopkTokensPipeline, TopkTokensProps};

use crate::cli::Cli;
use crate::inference_endpoint::inference;
use crate::responses::ErrorResponse;
use crate::workers::{task_distributor, ProcessFn, SelectionState, SelectionTask};

#[derive(Debug, Clone, Default, Deserialize)]
struct TopkTokensInferenceParams {
    max_k: Option<usize>,
    first_dimension_name: Option<String>,
    third_dimension_name: Option<String>,
    sample_labels: Option<Vec<String>>,
    first_dimension_labels: Option<Vec<String>>,
}

impl TopkTokensInferenceParams {
    /// Fills the parameters missing in the request with the configured defaults.
    fn into_options(self, defaults: &TopkTokensOptions) -> TopkTokensOptions {
        TopkTokensOptions {
            max_k: self.max_k.unwrap_or(defaults.max_k),
            first_dimension_name: self
                .first_dimension_name
                .unwrap_or_else(|| defaults.first_dimension_name.clone()),
            third_dimension_name: self
                .third_dimension_name
                .unwrap_or_else(|| defaults.third_dimension_name.clone()),
            sample_labels: self.sample_labels,
            first_dimension_labels: self.first_dimension_labels,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TopkTokensInferenceRequest {
    /// The tokens of each sample.
    tokens: Vec<Vec<String>>,
    /// The `[outer][token][inner]` activations of each sample.
    activations: Vec<Vec<Vec<Vec<f32>>>>,
    parameters: Option<TopkTokensInferenceParams>,
}

type TopkTokensResponse = Result<TopkTokensProps, ErrorResponse>;

pub fn router(args: &Cli) -> Result<Router> {
    let options = args.options();
    tracing::info!(
        "Loading top-k tokens pipeline with max_k {} and dimensions '{}' x '{}'",
        options.max_k,
        options.first_dimension_name,
        options.third_dimension_name
    );

    let pipeline = Arc::new(TopkTokensPipeline::new(Some(options)));

    tracing::info!("Warming up the pipeline...");
    topk_tokens_warm_up(&pipeline).unwrap_or_else(|e| {
        tracing::error!("Failed to warm up the pipeline: {}", e);
    });

    let (tx, rx) =
        mpsc::channel::<SelectionTask<TopkTokensInferenceRequest, TopkTokensResponse>>(32);
    let process_fn: Arc<
        ProcessFn<TopkTokensPipeline, TopkTokensInferenceRequest, TopkTokensResponse>,
    > = Arc::new(process_topk_tokens);
    tokio::spawn(task_distributor(rx, pipeline, args.num_workers(), process_fn));

    let state = SelectionState { tx };

    Ok(Router::new()
        .route("/", post(inference::<TopkTokensInferenceRequest, TopkTokensProps>))
        .route("/health", get(health))
        .with_state(state))
}

async fn health() -> &'static str {
    "ok"
}

pub(crate) fn process_topk_tokens(
    pipeline: &TopkTokensPipeline,
    request: TopkTokensInferenceRequest,
) -> TopkTokensResponse {
    let options = request
        .parameters
        .unwrap_or_default()
        .into_options(pipeline.get_options());
    let props = pipeline.run_nested(request.tokens, request.activations, Some(options))?;
    Ok(props)
}

pub(crate) fn topk_tokens_warm_up(pipeline: &TopkTokensPipeline) -> topk_tokens::Result<()> {
    pipeline.run_nested(
        vec![vec!["warm".to_string(), "up".to_string()]],
        vec![vec![vec![vec![0.0], vec![1.0]]]],
        None,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn request(body: serde_json::Value) -> TopkTokensInferenceRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_process_topk_tokens() {
        let pipeline = TopkTokensPipeline::new(Some(TopkTokensOptions {
            max_k: 2,
            ..Default::default()
        }));
        let props = process_topk_tokens(
            &pipeline,
            request(serde_json::json!({
                "tokens": [["A", "person", "ran"]],
                "activations": [[[[1.0], [9.0], [4.0]]]],
                "parameters": {"third_dimension_name": "Head"}
            })),
        )
        .unwrap();
        assert_eq!(props.topk_vals, vec![vec![vec![vec![9.], vec![4.]]]]);
        assert_eq!(props.topk_idxs, vec![vec![vec![vec![1], vec![2]]]]);
        assert_eq!(props.bottomk_vals, vec![vec![vec![vec![4.], vec![1.]]]]);
        assert_eq!(props.bottomk_idxs, vec![vec![vec![vec![2], vec![0]]]]);
        assert_eq!(props.first_dimension_name, "Layer");
        assert_eq!(props.third_dimension_name, "Head");
    }

    #[test]
    fn test_process_topk_tokens_max_k_override() {
        let pipeline = TopkTokensPipeline::default();
        let props = process_topk_tokens(
            &pipeline,
            request(serde_json::json!({
                "tokens": [["A", "person", "ran"]],
                "activations": [[[[1.0], [9.0], [4.0]]]],
                "parameters": {"max_k": 1}
            })),
        )
        .unwrap();
        assert_eq!(props.topk_vals, vec![vec![vec![vec![9.]]]]);
        assert_eq!(props.bottomk_vals, vec![vec![vec![vec![1.]]]]);
    }

    #[test]
    fn test_process_topk_tokens_invalid_batch() {
        let pipeline = TopkTokensPipeline::default();
        let response = process_topk_tokens(
            &pipeline,
            request(serde_json::json!({
                "tokens": [["A", "person"]],
                "activations": [[[[1.0], [9.0], [4.0]]]]
            })),
        );
        let err = response.unwrap_err();
        assert_eq!(err.code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_warm_up() {
        assert!(topk_tokens_warm_up(&TopkTokensPipeline::default()).is_ok());
    }
}
