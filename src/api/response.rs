use axum::{
    http::StatusCode,
    response::{self, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::service;

/// Envelope every endpoint answers with.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response<T> {
    pub success: bool,
    pub status_code: u16,
    /// Failure name, see [`service::Error::code`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Response<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, data)
    }

    pub fn with_status(
        status: StatusCode,
        message: impl Into<String>,
        data: T,
    ) -> Self {
        Self {
            success: true,
            status_code: status.as_u16(),
            code: None,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl Response<()> {
    pub fn failure(e: &service::Error) -> Self {
        let message = if e.is_internal() {
            "internal error".to_string()
        } else {
            e.to_string()
        };
        Self {
            success: false,
            status_code: e.status_code().as_u16(),
            code: Some(e.code().to_string()),
            message,
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for Response<T> {
    fn into_response(self) -> response::Response {
        let status = StatusCode::from_u16(self.status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for service::Error {
    fn into_response(self) -> response::Response {
        if self.is_internal() {
            tracing::error!(error = %self, "request failed");
        }
        Response::failure(&self).into_response()
    }
}
