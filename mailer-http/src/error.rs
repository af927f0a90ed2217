//! HTTP boundary error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Why a request was turned away before anything was sent.
///
/// The response body is the bare status code, e.g. `415`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("No such route")]
    NotFound,

    #[error("Content-Type must be application/json")]
    UnsupportedMediaType,

    #[error("Accept must be */* or application/json")]
    NotAcceptable,

    #[error("Body must be a JSON object with string From and Body fields")]
    UnprocessableEntity,
}

impl RejectReason {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for RejectReason {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, status.as_str().to_string()).into_response()
    }
}

/// Errors that can occur in the HTTP boundary
#[derive(Debug, Error)]
pub enum HttpError {
    /// Failed to bind to the specified address
    #[error("Failed to bind HTTP server to {address}: {source}")]
    BindError {
        address: String,
        source: std::io::Error,
    },

    /// HTTP server encountered a runtime error
    #[error("HTTP server error: {0}")]
    ServerError(String),

    #[error(transparent)]
    Rejected(#[from] RejectReason),

    /// The request body could not be read
    #[error("Failed to read request body: {0}")]
    Body(#[from] axum::Error),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self {
            Self::Rejected(reason) => reason.into_response(),
            other => {
                tracing::error!(error = %other, "Unable to handle request");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, status.as_str().to_string()).into_response()
            }
        }
    }
}
