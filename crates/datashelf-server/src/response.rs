//! Response formatting: pretty-printed JSON bodies and the error envelope.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use datashelf_core::{to_pretty_json, CatalogError};
use serde::Serialize;
use tracing::{debug, error};

/// JSON body serialized with 4-space indentation and an explicit
/// `Content-Length`.
pub struct PrettyJson<T>(pub StatusCode, pub T);

impl<T: Serialize> IntoResponse for PrettyJson<T> {
    fn into_response(self) -> Response {
        let PrettyJson(status, value) = self;
        let body = match to_pretty_json(&value) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize response body: {}", e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        let length = body.len();
        let mut response = (status, body).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers
            .entry(header::CONTENT_LENGTH)
            .or_insert_with(|| HeaderValue::from(length));
        response
    }
}

/// Error body: `{ "code": <status>, "message": <text> }`.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub code: u16,
    pub message: String,
}

/// Give the timeout layer's bare 408 the JSON error envelope.
pub async fn envelope_timeout(response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT {
        return response;
    }
    debug!("Request timed out");
    PrettyJson(
        StatusCode::REQUEST_TIMEOUT,
        ErrorEnvelope {
            code: StatusCode::REQUEST_TIMEOUT.as_u16(),
            message: "Request timed out".to_string(),
        },
    )
    .into_response()
}

/// A catalog error on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub CatalogError);

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            debug!("Request rejected ({}): {}", status.as_u16(), self.0);
        }

        PrettyJson(
            status,
            ErrorEnvelope {
                code: status.as_u16(),
                message: self.0.to_string(),
            },
        )
        .into_response()
    }
}
