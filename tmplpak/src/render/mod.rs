//! Writing templates, JSON and error pages to HTTP responses
//!
//! [`RenderHelper`] is a thin, cloneable wrapper around a shared
//! [`TemplateLoader`], usually a [`Loader`](crate::template::Loader).
//! Every method writes to a [`ResponseSink`] and logs failures instead of
//! returning them: once a response has started there is nothing a handler
//! can do to recover.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum::{extract::State, response::IntoResponse};
//! use tmplpak::render::{BufferedResponse, RenderHelper, RequestContext};
//! use tmplpak::template::{FunctionTable, Loader, TemplateConfig};
//!
//! async fn home(State(helper): State<RenderHelper>, ctx: RequestContext) -> impl IntoResponse {
//!     let mut response = BufferedResponse::new();
//!     helper.render(&mut response, &ctx, "home", &serde_json::json!({ "user": "ann" }));
//!     response
//! }
//!
//! let mut loader = Loader::new(FunctionTable::new(), "./templates");
//! loader.register(TemplateConfig::new("home", ["layout.html", "home.html"]));
//! let helper = RenderHelper::new(Arc::new(loader)).with_error_template("error");
//! let app: axum::Router = axum::Router::new()
//!     .route("/", axum::routing::get(home))
//!     .with_state(helper);
//! ```

use crate::template::TemplateLoader;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderValue, StatusCode};
use minijinja::Value;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::Span;

pub mod json;
pub mod sink;

pub use json::{CompactEncoder, JsonEncoder, PrettyEncoder};
pub use sink::{BufferedResponse, RequestContext, ResponseSink, REQUEST_ID_HEADER};

/// Message sent to the client when a template cannot be loaded
pub const GENERIC_ERROR_MESSAGE: &str = "Please try again later";

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json";
const NOSNIFF: &str = "nosniff";

/// Random bytes behind every [`ErrorId`]
const ERROR_ID_BYTES: usize = 16;

/// Short random token shown to users so they can reference a failure
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ErrorId(String);

impl ErrorId {
    /// Generate a new base64url-encoded 16-byte token
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut bytes = [0u8; ERROR_ID_BYTES];
        rng.fill(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Get the token as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Data passed to the error template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPage {
    /// Numeric HTTP status
    #[serde(rename = "StatusCode")]
    pub status_code: u16,

    /// User-facing message
    #[serde(rename = "Status")]
    pub status: String,

    /// Token correlating the page with server logs
    #[serde(rename = "ErrorID")]
    pub error_id: String,
}

/// Log context for one served error
///
/// Returned by [`RenderHelper::serve_error_template`] so the caller can add
/// fields and emit further records carrying the same `eid`.
#[derive(Debug, Clone)]
#[must_use = "the entry carries the error id; emit it or attach more context"]
pub struct ErrorEntry {
    error_id: ErrorId,
    error: String,
    status: StatusCode,
    request: RequestContext,
    fields: Vec<(String, String)>,
    span: Span,
}

impl ErrorEntry {
    /// The generated error id
    #[must_use]
    pub const fn error_id(&self) -> &ErrorId {
        &self.error_id
    }

    /// The internal error, rendered with `Display`
    #[must_use]
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Status requested by the caller
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Extra fields attached with [`ErrorEntry::with_field`]
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Attach an extra field to every record emitted from this entry
    pub fn with_field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    /// Emit an error-level record carrying the error id and all fields
    pub fn emit(&self, message: &str) {
        let _entered = self.span.enter();
        tracing::error!(
            eid = %self.error_id,
            error = %self.error,
            status = self.status.as_u16(),
            method = %self.request.method,
            uri = %self.request.uri,
            request_id = self.request.request_id.as_deref(),
            fields = ?self.fields,
            "{message}"
        );
    }
}

/// Renders templates, JSON and error pages into response sinks
#[derive(Clone)]
pub struct RenderHelper {
    loader: Arc<dyn TemplateLoader>,
    error_template: Option<String>,
    encoder: Option<Arc<dyn JsonEncoder>>,
    content_type: HeaderValue,
    span: Span,
}

impl RenderHelper {
    /// Create a helper over a shared loader
    #[must_use]
    pub fn new(loader: Arc<dyn TemplateLoader>) -> Self {
        Self {
            loader,
            error_template: None,
            encoder: None,
            content_type: HeaderValue::from_static(HTML_CONTENT_TYPE),
            span: Span::none(),
        }
    }

    /// Template rendered by [`RenderHelper::serve_error_template`]
    #[must_use]
    pub fn with_error_template(mut self, name: impl Into<String>) -> Self {
        self.error_template = Some(name.into());
        self
    }

    /// Encoder used by [`RenderHelper::json`] instead of [`CompactEncoder`]
    #[must_use]
    pub fn with_encoder(mut self, encoder: impl JsonEncoder + 'static) -> Self {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    /// Content type set by [`RenderHelper::render`] when none is present
    #[must_use]
    pub fn with_content_type(mut self, content_type: HeaderValue) -> Self {
        self.content_type = content_type;
        self
    }

    /// Span that log records are emitted under
    ///
    /// Without one, records join whatever span is current at the call site.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The shared loader
    #[must_use]
    pub const fn loader(&self) -> &Arc<dyn TemplateLoader> {
        &self.loader
    }

    /// Name of the configured error template
    #[must_use]
    pub fn error_template(&self) -> Option<&str> {
        self.error_template.as_deref()
    }

    /// Render the template `name` with `data`
    ///
    /// A lookup failure is logged and answered with a generic 500 page.
    /// Execution failures are only logged, since output may already be
    /// partially written.
    pub fn render<S, T>(&self, sink: &mut S, ctx: &RequestContext, name: &str, data: &T)
    where
        S: ResponseSink,
        T: Serialize + ?Sized,
    {
        let _entered = self.span.enter();
        let template = match self.loader.get(name) {
            Ok(template) => template,
            Err(err) => {
                tracing::error!(
                    template = name,
                    error = %err,
                    method = %ctx.method,
                    uri = %ctx.uri,
                    request_id = ctx.request_id.as_deref(),
                    "cannot find template"
                );
                self.serve_error(
                    sink,
                    ctx,
                    GENERIC_ERROR_MESSAGE,
                    StatusCode::INTERNAL_SERVER_ERROR,
                );
                return;
            }
        };

        if sink.header(&CONTENT_TYPE).is_none() {
            sink.set_header(CONTENT_TYPE, self.content_type.clone());
        }
        if let Err(err) = template.render_to(sink, &Value::from_serialize(data)) {
            tracing::error!(
                template = name,
                error = %err,
                method = %ctx.method,
                uri = %ctx.uri,
                request_id = ctx.request_id.as_deref(),
                "execute template"
            );
        }
    }

    /// Write a minimal plain-text error response
    pub fn serve_error<S: ResponseSink>(
        &self,
        sink: &mut S,
        ctx: &RequestContext,
        message: &str,
        status: StatusCode,
    ) {
        sink.set_header(CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE));
        sink.set_header(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static(NOSNIFF));
        sink.write_status(status);
        if let Err(err) = writeln!(sink, "{message}") {
            let _entered = self.span.enter();
            tracing::error!(
                error = %err,
                status = status.as_u16(),
                uri = %ctx.uri,
                "write error response"
            );
        }
    }

    /// Serve the configured error template for `err`
    ///
    /// The internal error is logged under a fresh [`ErrorId`]; the page only
    /// shows `external_message` and that id. If the error template is not
    /// configured or cannot be loaded, a plain-text `401` carrying
    /// `external_message` is written instead.
    pub fn serve_error_template<S, E>(
        &self,
        sink: &mut S,
        ctx: &RequestContext,
        err: &E,
        external_message: &str,
        status: StatusCode,
    ) -> ErrorEntry
    where
        S: ResponseSink,
        E: std::error::Error + ?Sized,
    {
        let entry = ErrorEntry {
            error_id: ErrorId::generate(),
            error: err.to_string(),
            status,
            request: ctx.clone(),
            fields: Vec::new(),
            span: self.span.clone(),
        };
        entry.emit("serving error page");
        let _entered = self.span.enter();

        let lookup = self.error_template.as_deref().map(|name| self.loader.get(name));
        let template = match lookup {
            Some(Ok(template)) => template,
            Some(Err(inner)) => {
                if !inner.is_not_found() {
                    tracing::error!(
                        eid = %entry.error_id,
                        error = %inner,
                        "when rendering error template"
                    );
                }
                self.serve_error(sink, ctx, external_message, StatusCode::UNAUTHORIZED);
                return entry;
            }
            None => {
                self.serve_error(sink, ctx, external_message, StatusCode::UNAUTHORIZED);
                return entry;
            }
        };

        if sink.header(&CONTENT_TYPE).is_none() {
            sink.set_header(CONTENT_TYPE, self.content_type.clone());
        }
        sink.write_status(status);
        let page = ErrorPage {
            status_code: status.as_u16(),
            status: external_message.to_string(),
            error_id: entry.error_id.to_string(),
        };
        if let Err(render_err) = template.render_to(sink, &Value::from_serialize(&page)) {
            tracing::error!(
                eid = %entry.error_id,
                error = %render_err,
                "execute template"
            );
        }
        entry
    }

    /// Write `data` as a JSON response
    ///
    /// `Content-Type: application/json` and `X-Content-Type-Options: nosniff`
    /// are set before any body byte. Encoding failures are logged; the body
    /// may then be empty or incomplete.
    pub fn json<S, T>(&self, sink: &mut S, data: &T)
    where
        S: ResponseSink,
        T: Serialize,
    {
        sink.set_header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        sink.set_header(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static(NOSNIFF));

        let result = match &self.encoder {
            Some(encoder) => encoder.encode(sink, data),
            None => CompactEncoder.encode(sink, data),
        };
        if let Err(err) = result {
            let _entered = self.span.enter();
            tracing::error!(error = %err, "encoding value as JSON");
        }
    }
}

impl fmt::Debug for RenderHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderHelper")
            .field("error_template", &self.error_template)
            .field("custom_encoder", &self.encoder.is_some())
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}
