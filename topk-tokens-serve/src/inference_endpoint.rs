use axum::{extract::State, http::StatusCode, Json};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::oneshot;

use crate::{
    responses::ErrorResponse,
    workers::{SelectionState, SelectionTask},
};

/// Queues the request for the selection workers and waits for its response.
pub(crate) async fn inference<I, O>(
    State(state): State<SelectionState<I, Result<O, ErrorResponse>>>,
    Json(req): Json<I>,
) -> Result<Json<O>, ErrorResponse>
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
{
    let (resp_tx, resp_rx) = oneshot::channel();
    let task = SelectionTask { req, resp_tx };

    if let Err(e) = state.tx.send(task).await {
        tracing::error!("Failed to send task to worker: {}", e);
        return Err(ErrorResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to process request",
        ));
    }

    match resp_rx.await {
        Ok(response) => response.map(Json).map_err(|e| {
            tracing::debug!("Request failed with status {}", e.code());
            e
        }),
        Err(e) => {
            tracing::error!("Failed to receive response from worker: {}", e);
            Err(ErrorResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process request",
            ))
        }
    }
}
