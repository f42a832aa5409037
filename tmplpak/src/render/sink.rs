//! Response sinks and request context
//!
//! [`ResponseSink`] is the minimal HTTP response surface the render helper
//! writes to: headers, a status code and body bytes. Headers and status are
//! committed by the first body write, after which they can no longer change.
//! [`BufferedResponse`] implements it in memory and converts into an axum
//! [`Response`].

use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use http::request::Parts;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use std::convert::Infallible;
use std::io;

/// Header carrying a caller-supplied request identifier
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Destination for a rendered HTTP response
pub trait ResponseSink: io::Write {
    /// Set a response header, replacing any previous value
    ///
    /// Has no effect once the response is committed.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Current value of a response header
    fn header(&self, name: &HeaderName) -> Option<&HeaderValue>;

    /// Commit the status code and headers
    ///
    /// Only the first call has an effect. Writing body bytes without calling
    /// this commits `200 OK`.
    fn write_status(&mut self, status: StatusCode);
}

/// In-memory response that can be returned from an axum handler
#[derive(Debug, Clone, Default)]
pub struct BufferedResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl BufferedResponse {
    /// Create an empty, uncommitted response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed status, or `200 OK` if nothing was committed yet
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// True once the status line and headers are fixed
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    /// Response headers
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Body bytes written so far
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl io::Write for BufferedResponse {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseSink for BufferedResponse {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if self.is_committed() {
            tracing::debug!(header = %name, "header set after response was committed");
            return;
        }
        self.headers.insert(name, value);
    }

    fn header(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    fn write_status(&mut self, status: StatusCode) {
        if let Some(committed) = self.status {
            tracing::debug!(
                committed = committed.as_u16(),
                ignored = status.as_u16(),
                "superfluous status write"
            );
            return;
        }
        self.status = Some(status);
    }
}

impl IntoResponse for BufferedResponse {
    fn into_response(self) -> Response {
        (self.status(), self.headers, self.body).into_response()
    }
}

/// Request details attached to every log record the render helper writes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Request method
    pub method: Method,

    /// Request URI
    pub uri: Uri,

    /// Value of the `x-request-id` header, if present
    pub request_id: Option<String>,
}

impl From<&Parts> for RequestContext {
    fn from(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            request_id: parts
                .headers
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(ToString::to_string),
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from(&*parts))
    }
}
