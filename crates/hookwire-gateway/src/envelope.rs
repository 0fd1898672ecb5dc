// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response envelope and request payload extraction.
//!
//! Every response body has the shape
//! `{"code": <status>, "success": <bool>, "data" | "error": ...}`.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use hookwire_core::{ErrorKind, HookwireError};

/// Wraps `data` in a successful envelope.
pub fn ok<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "code": StatusCode::OK.as_u16(),
            "success": true,
            "data": data,
        })),
    )
        .into_response()
}

/// An error rendered as an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

/// Status for an error surfaced by the core crates.
///
/// `NoSession` stays a 500 because existing clients match on it.
pub fn status_for(err: &HookwireError) -> StatusCode {
    match err {
        HookwireError::Unauthorized => StatusCode::UNAUTHORIZED,
        HookwireError::NoSession => StatusCode::INTERNAL_SERVER_ERROR,
        other => match other.kind() {
            ErrorKind::Caller => StatusCode::BAD_REQUEST,
            ErrorKind::Transient | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

impl From<HookwireError> for ApiError {
    fn from(err: HookwireError) -> Self {
        Self::new(status_for(&err), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "code": self.status.as_u16(),
                "success": false,
                "error": self.message,
            })),
        )
            .into_response()
    }
}

/// JSON body extractor that accepts any content type and answers malformed
/// input with a 400 envelope.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::bad_request("Could not decode Payload"))?;
        serde_json::from_slice(&bytes)
            .map(Payload)
            .map_err(|_| ApiError::bad_request("Could not decode Payload"))
    }
}
