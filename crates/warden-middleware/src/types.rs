//! Common types used throughout the middleware pipeline.
//!
//! Calls travel as plain HTTP messages: a unary call is a `POST` to
//! `/{package.Service}/{Method}` with an opaque body, and its outcome is
//! reported in the `grpc-status` and `grpc-message` response headers with an
//! HTTP status of 200.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http_body_util::Full;
use warden_core::{Code, Status};

/// The request type used in the middleware pipeline.
pub type Request = http::Request<Full<Bytes>>;

/// The response type used in the middleware pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// Header carrying the numeric status code.
pub const GRPC_STATUS_HEADER: &str = "grpc-status";

/// Header carrying the diagnostic message.
pub const GRPC_MESSAGE_HEADER: &str = "grpc-message";

/// Content type of every response.
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// Extension trait for building and reading call responses.
pub trait ResponseExt {
    /// Creates a response carrying `body` and an `OK` status.
    fn ok(body: Bytes) -> Response;

    /// Creates an empty response carrying `status`.
    fn rpc(status: &Status) -> Response;

    /// Reads the status reported by this response.
    ///
    /// A missing or unparsable `grpc-status` header reads as `UNKNOWN`.
    fn rpc_status(&self) -> Status;
}

impl ResponseExt for Response {
    fn ok(body: Bytes) -> Response {
        let mut response = http::Response::new(Full::new(body));
        set_status_headers(&mut response, &Status::ok());
        response
    }

    fn rpc(status: &Status) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::new()));
        set_status_headers(&mut response, status);
        response
    }

    fn rpc_status(&self) -> Status {
        let headers = self.headers();
        let code = headers
            .get(GRPC_STATUS_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u8>().ok())
            .map_or(Code::Unknown, Code::from_u8);
        let message = headers
            .get(GRPC_MESSAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        Status::new(code, message)
    }
}

fn set_status_headers(response: &mut Response, status: &Status) {
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(CONTENT_TYPE_OCTET_STREAM),
    );
    headers.insert(GRPC_STATUS_HEADER, HeaderValue::from(u16::from(status.code().as_u8())));
    if !status.message().is_empty() {
        headers.insert(GRPC_MESSAGE_HEADER, header_safe(status.message()));
    }
}

// Header values must be visible ASCII; anything else is replaced.
fn header_safe(message: &str) -> HeaderValue {
    let cleaned: String = message
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '?' })
        .collect();
    HeaderValue::from_str(&cleaned).unwrap_or_else(|_| HeaderValue::from_static("?"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_ok_response() {
        let response = Response::ok(Bytes::from_static(b"payload"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(GRPC_STATUS_HEADER).unwrap(), "0");
        assert!(response.headers().get(GRPC_MESSAGE_HEADER).is_none());
        assert_eq!(response.rpc_status().code(), Code::Ok);
    }

    #[test]
    fn test_error_response_uses_http_200() {
        let response = Response::rpc(&Status::unauthenticated("missing credential"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(GRPC_STATUS_HEADER).unwrap(), "16");
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            CONTENT_TYPE_OCTET_STREAM
        );

        let status = response.rpc_status();
        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(status.message(), "missing credential");
    }

    #[test]
    fn test_missing_status_reads_as_unknown() {
        let response: Response = http::Response::new(Full::new(Bytes::new()));
        assert_eq!(response.rpc_status().code(), Code::Unknown);
    }

    #[test]
    fn test_non_ascii_message_is_sanitized() {
        let response = Response::rpc(&Status::internal("bad\nline é"));
        let message = response.headers().get(GRPC_MESSAGE_HEADER).unwrap();
        assert_eq!(message, "bad?line ?");
    }
}
