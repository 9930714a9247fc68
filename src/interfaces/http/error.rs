use crate::error::PosError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Everything a handler or middleware can fail with.
///
/// Rendered as `{"success": false, "message": ...}`. Server-side failures are
/// reported as a bare "Internal Server Error" unless the error is an
/// exposable configuration problem.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Pos(#[from] PosError),

    #[error("{1}")]
    Rejected(StatusCode, String),

    #[error("{0}")]
    RateLimited(&'static str),

    #[error("Not Found")]
    RouteNotFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Pos(err) => match err {
                PosError::Validation(_) | PosError::Csv(_) => StatusCode::BAD_REQUEST,
                PosError::NotFound(_) => StatusCode::NOT_FOUND,
                PosError::Conflict(_) => StatusCode::CONFLICT,
                PosError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                PosError::Forbidden(_) => StatusCode::FORBIDDEN,
                PosError::Gateway(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Rejected(status, _) => *status,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Pos(PosError::Config(msg)) => msg.clone(),
            ApiError::Pos(PosError::Gateway(_)) => "Payment gateway error".to_string(),
            ApiError::Pos(err) if self.status().is_server_error() => {
                tracing::error!(error = %err, "request failed");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match &rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                StatusCode::BAD_REQUEST
            }
            other => other.status(),
        };
        ApiError::Rejected(status, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Pos(PosError::Gateway(detail)) = &self {
            tracing::warn!(detail = %detail, "payment gateway call failed");
        }
        let body = json!({ "success": false, "message": self.public_message() });
        (status, Json(body)).into_response()
    }
}
