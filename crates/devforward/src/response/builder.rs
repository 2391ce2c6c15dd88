use crate::proxy::headers::TEXT_PLAIN;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use tracing::error;

/// Build a fully buffered response with an exact `Content-Length`.
///
/// If the response cannot be assembled the failure is logged and a bare 500
/// is returned instead; callers never see an error.
pub fn build_response(
    status: StatusCode,
    headers: impl IntoIterator<Item = (HeaderName, HeaderValue)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let body = body.into();
    let mut builder = Response::builder()
        .status(status)
        .header(CONTENT_LENGTH, body.len());
    for (name, value) in headers {
        builder = builder.header(name, value);
    }

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        error!("Failed to build {} response: {}", status, e);
        bare_internal_error()
    })
}

/// Plain-text error response carrying `message` as its body.
pub fn text_error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    build_response(
        status,
        [(CONTENT_TYPE, TEXT_PLAIN.clone())],
        Bytes::copy_from_slice(message.as_bytes()),
    )
}

/// An empty 500, used when even an error response could not be written.
pub fn bare_internal_error() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
