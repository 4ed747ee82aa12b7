use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// The error body returned when a selection request fails, as
/// `{"error": {"code": <status>, "message": <description>}}`. Malformed batches (mismatched
/// tokens, wrong shapes, out of range `k`) get `422` with the validation message; any other failure
/// gets `500` with a generic message and is logged.
#[derive(Debug)]
pub(crate) struct ErrorResponse {
    /// The HTTP status code.
    code: StatusCode,
    /// Why the selection request was rejected.
    message: String,
}

impl ErrorResponse {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }
}

impl From<topk_tokens::Error> for ErrorResponse {
    fn from(e: topk_tokens::Error) -> Self {
        if e.is_invalid_input() {
            Self::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        } else {
            tracing::error!("Failed to select top-k tokens: {}", e);
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process request")
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code.as_u16(),
                "message": self.message,
            }
        }));

        (self.code, body).into_response()
    }
}
