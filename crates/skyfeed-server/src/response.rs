//! JSON response helpers.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;

use skyfeed_core::ErrorEnvelope;

/// Content type of every response body.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Type alias for HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

const FALLBACK_BODY: &str =
    r#"{"error":"InternalServerError","message":"Internal server error"}"#;

/// Serializes `body` into a JSON response.
///
/// A body that fails to serialize is answered with a generic 500.
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> HttpResponse {
    match serde_json::to_vec(body) {
        Ok(bytes) => raw_json(status, Bytes::from(bytes)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            raw_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(FALLBACK_BODY.as_bytes()),
            )
        }
    }
}

/// Builds an `{"error", "message"}` response.
pub fn error_response(status: StatusCode, code: &str, message: &str) -> HttpResponse {
    json_response(status, &ErrorEnvelope::new(code, message))
}

fn raw_json(status: StatusCode, body: Bytes) -> HttpResponse {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    response
}
