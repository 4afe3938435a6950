use crate::routes::Upstream;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("upstream url must start with http:// or https://: {0}")]
    InvalidUpstreamUrl(String),
    #[error("no route for {0}")]
    NoRoute(String),
    #[error("failed to read request body: {0}")]
    Body(axum::Error),
    #[error("{upstream} unavailable: {source}")]
    Unavailable {
        upstream: Upstream,
        source: reqwest::Error,
    },
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::NoRoute(path) => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "success": false,
                    "message": "Endpoint not found",
                    "path": path,
                })),
            )
                .into_response(),
            GatewayError::Body(e) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "message": e.to_string()})),
            )
                .into_response(),
            GatewayError::Unavailable { upstream, source } => {
                tracing::warn!("{} unreachable: {}", upstream, source);
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({
                        "success": false,
                        "message": "Service unavailable",
                        "service": upstream.name(),
                    })),
                )
                    .into_response()
            }
            GatewayError::InvalidUpstreamUrl(_) => {
                tracing::error!("{}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"success": false, "message": "internal server error"})),
                )
                    .into_response()
            }
        }
    }
}
