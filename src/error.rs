use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Crosses the HTTP boundary only. Leaf algorithm/rescorer failures never
/// surface as one of these — a failed child is recorded in the group's
/// merge and the pipeline carries on (spec §4.6/§4.10); only request-level
/// rejection and startup-time failures reach a handler as an `AppError`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Registry initialization failed: {0}")]
    RegistryInit(String),

    #[error("Component unavailable: {0}")]
    ComponentUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => {
                tracing::warn!(error = %msg, "bad request");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::RegistryInit(msg) => {
                tracing::error!(error = %msg, "registry initialization error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::ComponentUnavailable(msg) => {
                tracing::warn!(error = %msg, "component unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
