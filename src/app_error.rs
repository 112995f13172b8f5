//! Request-boundary errors and the response envelope.
//!
//! Every handler returns `Result<_, AppError>`. Success bodies are wrapped in
//! [`StdResponse`] and failures in `{ "success": false, "error": ... }`, so
//! clients can always branch on `success`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    db::RepositoryError,
    services::{auth::OtpError, coupons::CouponError, payments::PaymentError},
    validation::ValidationErrors,
};

const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your internet connection.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Otp(#[from] OtpError),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    ForbiddenResource(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) | Self::Otp(_) | Self::Coupon(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::ForbiddenResource(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Repository(err) if err.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Payment(err) => err.status(),
            Self::Other(err) if is_network_failure(err) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self.status() {
            StatusCode::SERVICE_UNAVAILABLE => NETWORK_ERROR_MESSAGE.to_string(),
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = ErrorBody {
            success: false,
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Whether an error chain describes a failed call to a downstream service
/// rather than a bug or bad data.
pub fn is_network_failure(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(reqwest_err) = cause.downcast_ref::<reqwest::Error>() {
            if reqwest_err.is_connect() || reqwest_err.is_timeout() {
                return true;
            }
        }
        is_network_message(&cause.to_string())
    })
}

pub fn is_network_message(message: &str) -> bool {
    let message = message.to_lowercase();
    [
        "fetch failed",
        "network",
        "eai_again",
        "getaddrinfo",
        "connection refused",
        "timed out",
    ]
    .iter()
    .any(|needle| message.contains(needle))
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

/// Successful response envelope: `{ "success": true, "message"?: ..., ...data }`.
///
/// `data` is flattened into the top-level object, so it must serialize as a map.
#[derive(Debug)]
pub struct StdResponse<T> {
    pub data: T,
    pub message: Option<String>,
}

impl<T> StdResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: Some(message.into()),
        }
    }
}

/// Payload for responses that carry only a message.
#[derive(Debug, Serialize, ToSchema)]
pub struct Empty {}

#[derive(Serialize)]
struct Envelope<'a, T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(flatten)]
    data: &'a T,
}

impl<T: Serialize> IntoResponse for StdResponse<T> {
    fn into_response(self) -> Response {
        Json(Envelope {
            success: true,
            message: self.message.as_deref(),
            data: &self.data,
        })
        .into_response()
    }
}
