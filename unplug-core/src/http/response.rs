//! Response building and the seams the cache and the host plug into
//!
//! Handlers may return text, structured JSON data or a finished
//! [`HttpResponse`]. [`Content`] closes that set and `HttpResponse::try_from`
//! is the one place the three shapes are coerced into a response.

use std::collections::HashMap;

use serde_json::Value;

use super::constants::{content_types, headers};
use super::extension_for;
use crate::{Error, Result};

/// HTTP status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    // 2xx Success
    Ok = 200,
    Created = 201,
    NoContent = 204,

    // 3xx Redirection
    MovedPermanently = 301,
    Found = 302,
    NotModified = 304,

    // 4xx Client Error
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,

    // 5xx Server Error
    InternalServerError = 500,
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// Get the status code as a number
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Get the reason phrase for this status code
    pub fn reason_phrase(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::Found => "Found",
            StatusCode::NotModified => "Not Modified",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// 301 or 302
    pub fn is_redirect(self) -> bool {
        matches!(self, StatusCode::MovedPermanently | StatusCode::Found)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

/// A response ready to be handed to the host
///
/// # Example
///
/// ```rust,ignore
/// use unplug_core::http::HttpResponse;
///
/// let response = HttpResponse::ok("<h1>Hi</h1>");
/// let feed = HttpResponse::ok("").xml("<rss/>").with_cacheable(false);
/// let moved = HttpResponse::moved_permanently("new-home");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    cacheable: bool,
}

impl HttpResponse {
    /// Create an empty response with no content type, cacheable by default
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: HashMap::new(), body: Vec::new(), cacheable: true }
    }

    /// Create a 200 OK HTML response
    pub fn ok(content: impl Into<String>) -> Self {
        Self::new(StatusCode::Ok).html(&content.into())
    }

    /// Create a 404 Not Found HTML response; never cacheable
    pub fn not_found(content: impl Into<String>) -> Self {
        Self::new(StatusCode::NotFound).html(&content.into()).with_cacheable(false)
    }

    /// Create a 301 redirect
    pub fn moved_permanently(location: &str) -> Self {
        Self::redirect(StatusCode::MovedPermanently, location)
    }

    /// Create a 302 redirect
    pub fn found(location: &str) -> Self {
        Self::redirect(StatusCode::Found, location)
    }

    fn redirect(status: StatusCode, location: &str) -> Self {
        Self::new(status)
            .header(headers::LOCATION, &normalize_location(location))
            .with_cacheable(false)
    }

    // Builder methods

    /// Set a header
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the Content-Type header
    pub fn content_type(self, content_type: &str) -> Self {
        self.header(headers::CONTENT_TYPE, content_type)
    }

    /// Set the body as raw bytes
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        let length = self.body.len().to_string();
        self.header(headers::CONTENT_LENGTH, &length)
    }

    /// Set the body as HTML
    pub fn html(self, html: &str) -> Self {
        self.content_type(content_types::HTML).with_body(html.as_bytes().to_vec())
    }

    /// Set the body as plain text
    pub fn text(self, text: &str) -> Self {
        self.content_type(content_types::TEXT).with_body(text.as_bytes().to_vec())
    }

    /// Set the body as an already serialized JSON document
    pub fn json(self, json: &str) -> Self {
        self.content_type(content_types::JSON).with_body(json.as_bytes().to_vec())
    }

    /// Set the body as XML
    pub fn xml(self, xml: &str) -> Self {
        self.content_type(content_types::XML).with_body(xml.as_bytes().to_vec())
    }

    /// Allow or forbid persisting this response
    pub fn with_cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }

    // Accessors

    /// Get a header value
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Get all headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Get the body as string (if valid UTF-8)
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }
}

/// Give a relative redirect target a leading and trailing `/`.
///
/// Absolute URLs are left alone.
fn normalize_location(location: &str) -> String {
    if location.contains("://") {
        return location.to_string();
    }
    let trimmed = location.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

/// What the cache and the dispatcher need to know about a response
pub trait Responder {
    fn status(&self) -> StatusCode;

    fn body(&self) -> &[u8];

    /// File extension derived from the content type
    ///
    /// `None` when there is no content type or it is not recognized.
    fn extension(&self) -> Option<&'static str>;

    /// Whether the producer allows this response to be persisted
    fn is_cacheable(&self) -> bool;

    /// Redirect target, if any
    fn location(&self) -> Option<&str> {
        None
    }
}

impl Responder for HttpResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn extension(&self) -> Option<&'static str> {
        self.header_value(headers::CONTENT_TYPE).and_then(extension_for)
    }

    fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    fn location(&self) -> Option<&str> {
        self.header_value(headers::LOCATION)
    }
}

/// Transmits a finished response; implemented by the host
pub trait ResponseSink {
    fn send(&mut self, response: &HttpResponse) -> Result<()>;
}

/// Buffers responses in memory
impl ResponseSink for Vec<HttpResponse> {
    fn send(&mut self, response: &HttpResponse) -> Result<()> {
        self.push(response.clone());
        Ok(())
    }
}

/// Everything a handler may return
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Structured(Value),
    Response(HttpResponse),
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Content::Structured(value)
    }
}

impl From<HttpResponse> for Content {
    fn from(response: HttpResponse) -> Self {
        Content::Response(response)
    }
}

impl TryFrom<Content> for HttpResponse {
    type Error = Error;

    fn try_from(content: Content) -> Result<Self> {
        match content {
            Content::Text(text) => Ok(HttpResponse::ok(text)),
            Content::Structured(value @ (Value::Object(_) | Value::Array(_))) => {
                Ok(HttpResponse::new(StatusCode::Ok).json(&value.to_string()))
            }
            Content::Structured(other) => Err(Error::InvalidResponse(format!(
                "handler returned a JSON {}, expected an object or an array",
                value_kind(&other)
            ))),
            Content::Response(response) => Ok(response),
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_code_display() {
        assert_eq!(StatusCode::Ok.to_string(), "200 OK");
        assert_eq!(StatusCode::NotFound.to_string(), "404 Not Found");
        assert_eq!(StatusCode::MovedPermanently.as_u16(), 301);
        assert!(StatusCode::Found.is_redirect());
        assert!(!StatusCode::NotModified.is_redirect());
    }

    #[test]
    fn test_ok_is_cacheable_html() {
        let response = HttpResponse::ok("Hi");

        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.body(), b"Hi");
        assert_eq!(response.extension(), Some("html"));
        assert_eq!(response.header_value("content-length"), Some("2"));
        assert!(response.is_cacheable());
    }

    #[test]
    fn test_not_found_is_never_cacheable() {
        let response = HttpResponse::not_found("gone");

        assert_eq!(response.status(), StatusCode::NotFound);
        assert!(!response.is_cacheable());
    }

    #[test]
    fn test_redirect_location_normalized() {
        assert_eq!(HttpResponse::found("about").location(), Some("/about/"));
        assert_eq!(HttpResponse::found("/a/b/").location(), Some("/a/b/"));
        assert_eq!(HttpResponse::found("").location(), Some("/"));
        assert_eq!(
            HttpResponse::moved_permanently("https://example.com/x").location(),
            Some("https://example.com/x")
        );
        assert!(!HttpResponse::found("x").is_cacheable());
        assert!(HttpResponse::found("x").with_cacheable(true).is_cacheable());
    }

    #[test]
    fn test_builders_set_extension() {
        assert_eq!(HttpResponse::ok("").json("{}").extension(), Some("json"));
        assert_eq!(HttpResponse::ok("").xml("<a/>").extension(), Some("xml"));
        assert_eq!(HttpResponse::ok("").text("x").extension(), Some("txt"));
        assert_eq!(HttpResponse::new(StatusCode::Ok).extension(), None);
    }

    #[test]
    fn test_content_coercion() {
        let text = HttpResponse::try_from(Content::from("Hi")).unwrap();
        assert_eq!(text.body_string().as_deref(), Some("Hi"));
        assert_eq!(text.extension(), Some("html"));

        let data = HttpResponse::try_from(Content::from(json!({"id": 7}))).unwrap();
        assert_eq!(data.extension(), Some("json"));
        assert_eq!(data.body(), br#"{"id":7}"#);

        let list = HttpResponse::try_from(Content::from(json!([1, 2]))).unwrap();
        assert_eq!(list.body(), b"[1,2]");

        let prebuilt = HttpResponse::not_found("x");
        assert_eq!(HttpResponse::try_from(Content::from(prebuilt.clone())).unwrap(), prebuilt);
    }

    #[test]
    fn test_scalar_structured_content_rejected() {
        let err = HttpResponse::try_from(Content::from(json!(42))).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(ref msg) if msg.contains("number")));

        let err = HttpResponse::try_from(Content::Structured(Value::Null)).unwrap_err();
        assert!(err.to_string().contains("null"));
    }

    #[test]
    fn test_vec_sink_buffers() {
        let mut sink: Vec<HttpResponse> = Vec::new();
        sink.send(&HttpResponse::ok("a")).unwrap();
        sink.send(&HttpResponse::ok("b")).unwrap();

        assert_eq!(sink.len(), 2);
    }
}
