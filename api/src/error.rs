//! HTTP error mapping

use crate::models::ErrorResponse;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contact_form::{ConfigurationError, FormError};
use thiserror::Error;

/// Errors returned by route handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Rendering failed
    #[error(transparent)]
    Form(#[from] FormError),

    /// Request body could not be read; carries the extractor's status
    #[error("invalid submission: {message}")]
    Rejected {
        /// Status chosen by the failing extractor
        status: StatusCode,
        /// Rejection text
        message: String,
    },
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::Rejected {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(e: MultipartRejection) -> Self {
        Self::Rejected {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl From<FormRejection> for ApiError {
    fn from(e: FormRejection) -> Self {
        Self::Rejected {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Configuration(
                ConfigurationError::Unreachable { .. } | ConfigurationError::Status { .. },
            ) => StatusCode::BAD_GATEWAY,
            Self::Configuration(_) | Self::Form(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Rejected { status, .. } => *status,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::Form(_) => "render_error",
            Self::Rejected { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                "payload_too_large"
            }
            Self::Rejected { .. } => "bad_request",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
