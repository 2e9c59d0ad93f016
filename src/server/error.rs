use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::core::error::MeterError;

/// HTTP face of [`MeterError`].
#[derive(Debug)]
pub struct ApiError(pub MeterError);

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn detail(&self) -> String {
        match &self.0 {
            // Keep the full context chain for operators reading the response.
            MeterError::Internal(e) => format!("{:#}", e),
            other => other.to_string(),
        }
    }
}

impl From<MeterError> for ApiError {
    fn from(err: MeterError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Internal service error: {:#}", self.0);
        } else {
            tracing::debug!("Client error: {}", self.0);
        }
        (status, Json(ErrorBody { detail: self.detail() })).into_response()
    }
}
