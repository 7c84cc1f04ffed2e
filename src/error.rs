//! Error handling

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{error, info, warn};

use crate::constants::GENERIC_FAILURE_MESSAGE;
use crate::rules::ImageRejection;
use crate::upstream::EditError;

/// Failures of a generation request, each with its own HTTP mapping.
#[derive(Debug)]
pub enum RelayError {
    /// Client input was missing or invalid, the message names the problem.
    Validation(String),
    /// The body could not be read as a form.
    Malformed {
        /// Status chosen by the form reader, eg 413 past the body limit.
        status: StatusCode,
        /// What went wrong.
        message: String,
    },
    /// The image API refused the request.
    Upstream {
        /// Status reported by the image API.
        status: u16,
        /// Message reported by the image API.
        message: String,
    },
    /// Anything else, the detail is only logged.
    Unexpected(String),
}

impl RelayError {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::Malformed { status, .. } => *status,
            RelayError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            RelayError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the user.
    pub fn public_message(&self) -> &str {
        match self {
            RelayError::Validation(message) => message,
            RelayError::Malformed { message, .. } => message,
            RelayError::Upstream { message, .. } => message,
            RelayError::Unexpected(_) => GENERIC_FAILURE_MESSAGE,
        }
    }
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::Validation(message) => write!(f, "invalid request: {message}"),
            RelayError::Malformed { status, message } => {
                write!(f, "unreadable request ({status}): {message}")
            }
            RelayError::Upstream { status, message } => {
                write!(f, "image API error {status}: {message}")
            }
            RelayError::Unexpected(detail) => write!(f, "unexpected error: {detail}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<ImageRejection> for RelayError {
    fn from(err: ImageRejection) -> Self {
        RelayError::Validation(err.to_string())
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Unexpected(err.to_string())
    }
}

impl From<base64::DecodeError> for RelayError {
    fn from(err: base64::DecodeError) -> Self {
        RelayError::Unexpected(format!("invalid base64 image data: {err}"))
    }
}

impl From<EditError> for RelayError {
    fn from(err: EditError) -> Self {
        match err {
            EditError::Api {
                status,
                message: Some(message),
            } => RelayError::Upstream { status, message },
            EditError::Api {
                status,
                message: None,
            } => RelayError::Unexpected(format!("image API returned {status} without a message")),
            other => RelayError::Unexpected(other.to_string()),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        match &self {
            RelayError::Validation(message) => info!("Rejected request: {}", message),
            RelayError::Malformed { status, message } => {
                info!("Unreadable request ({}): {}", status, message)
            }
            RelayError::Upstream { status, message } => {
                warn!("Image API error {}: {}", status, message)
            }
            RelayError::Unexpected(detail) => error!("Internal server error: {}", detail),
        }
        let body = json!({
            "success": false,
            "message": self.public_message(),
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(err: RelayError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn validation_maps_to_bad_request() {
        let (status, body) =
            body_json(RelayError::Validation("No images uploaded".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"success": false, "message": "No images uploaded"})
        );
    }

    #[tokio::test]
    async fn malformed_keeps_reader_status() {
        let (status, body) = body_json(RelayError::Malformed {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "length limit exceeded".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "length limit exceeded");
    }

    #[tokio::test]
    async fn upstream_status_passes_through() {
        let (status, body) = body_json(RelayError::Upstream {
            status: 429,
            message: "rate limited".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body, json!({"success": false, "message": "rate limited"}));
    }

    #[tokio::test]
    async fn unexpected_hides_detail() {
        let (status, body) =
            body_json(RelayError::Unexpected("disk on fire".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn edit_errors_convert() {
        let err = RelayError::from(EditError::Api {
            status: 400,
            message: Some("bad prompt".to_string()),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "bad prompt");

        let err = RelayError::from(EditError::Api {
            status: 502,
            message: None,
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn invalid_upstream_status_falls_back_to_500() {
        let err = RelayError::Upstream {
            status: 42,
            message: "odd".to_string(),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
