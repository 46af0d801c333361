//! Request representation and per-request context
//!
//! The host supplies method and URI; everything else (segments, params,
//! query values) is derived here.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

/// HTTP methods understood by the host interface
///
/// Only GET and POST have route tables; the others parse fine but never
/// match a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    /// Convert method to string
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::GET),
            "POST" => Ok(HttpMethod::POST),
            "PUT" => Ok(HttpMethod::PUT),
            "DELETE" => Ok(HttpMethod::DELETE),
            "PATCH" => Ok(HttpMethod::PATCH),
            "HEAD" => Ok(HttpMethod::HEAD),
            "OPTIONS" => Ok(HttpMethod::OPTIONS),
            _ => Err(Error::UnsupportedMethod(s.to_string())),
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named parameters captured while matching a route
pub type PathParams = HashMap<String, String>;

/// A single query parameter value
///
/// Keys written as `name[]` collect every occurrence into a list; plain keys
/// keep the last value seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    List(Vec<String>),
}

impl QueryValue {
    /// The value of a plain key, `None` for lists
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::Single(value) => Some(value),
            QueryValue::List(_) => None,
        }
    }

    /// All values, a single value counts as a one-element list
    pub fn values(&self) -> Vec<&str> {
        match self {
            QueryValue::Single(value) => vec![value.as_str()],
            QueryValue::List(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// Parsed query parameters from URL
pub type QueryParams = HashMap<String, QueryValue>;

/// Percent-decode a path segment or query component.
///
/// `+` decodes to a space. Byte sequences that are not valid UTF-8 are
/// replaced rather than rejected.
pub fn url_decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes()))
            .into_owned(),
    }
}

/// Parse a raw query string (without the leading `?`)
pub fn parse_query(raw: &str) -> QueryParams {
    let mut params = QueryParams::new();

    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }

        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = url_decode(key);
        let value = url_decode(value);

        if let Some(name) = key.strip_suffix("[]") {
            match params.entry(name.to_string()).or_insert_with(|| QueryValue::List(Vec::new())) {
                QueryValue::List(values) => values.push(value),
                single => *single = QueryValue::List(vec![value]),
            }
        } else if !key.is_empty() {
            params.insert(key, QueryValue::Single(value));
        }
    }

    params
}

/// A request as handed over by the host application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: HttpMethod,
    path: String,
    query_string: Option<String>,
}

impl Request {
    /// Create a request from a method and a URI such as `/post/hello?ref=x`
    pub fn new(method: HttpMethod, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let (path, query_string) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (uri, None),
        };

        Self { method, path, query_string }
    }

    /// Shorthand for a GET request
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(HttpMethod::GET, uri)
    }

    /// Shorthand for a POST request
    pub fn post(uri: impl Into<String>) -> Self {
        Self::new(HttpMethod::POST, uri)
    }

    /// Get the HTTP method
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Get the raw (still percent-encoded) path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the raw query string, if any
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// Parse the query string
    pub fn query(&self) -> QueryParams {
        self.query_string.as_deref().map(parse_query).unwrap_or_default()
    }
}

/// What a handler sees of the current request
///
/// Built fresh for every request. Middleware may replace it wholesale and can
/// attach derived values under `locals`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Decoded request path, always starting with `/`
    pub path: String,
    pub params: PathParams,
    pub query: QueryParams,
    #[serde(default)]
    pub locals: serde_json::Map<String, Value>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, params: PathParams, query: QueryParams) -> Self {
        Self { path: path.into(), params, query, locals: serde_json::Map::new() }
    }

    /// A named route parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// A query parameter
    pub fn query_value(&self, name: &str) -> Option<&QueryValue> {
        self.query.get(name)
    }

    /// A value attached by middleware
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    /// Attach a value for later middleware and the handler
    pub fn with_local(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.locals.insert(name.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::GET);
        assert_eq!("POST".parse::<HttpMethod>().unwrap(), HttpMethod::POST);
        assert!(matches!("BREW".parse::<HttpMethod>(), Err(Error::UnsupportedMethod(m)) if m == "BREW"));
        assert_eq!(HttpMethod::DELETE.to_string(), "DELETE");
    }

    #[test]
    fn test_request_splits_query() {
        let request = Request::get("/post/hello-world?ref=x&page=2");

        assert_eq!(request.path(), "/post/hello-world");
        assert_eq!(request.query_string(), Some("ref=x&page=2"));
        let query = request.query();
        assert_eq!(query.get("ref"), Some(&QueryValue::Single("x".to_string())));
        assert_eq!(query.get("page").and_then(QueryValue::as_str), Some("2"));
    }

    #[test]
    fn test_request_without_query() {
        let request = Request::post("/contact");

        assert_eq!(request.method(), HttpMethod::POST);
        assert_eq!(request.query_string(), None);
        assert!(request.query().is_empty());
    }

    #[test]
    fn test_query_lists_and_repeats() {
        let query = parse_query("tag[]=a&tag[]=b&sort=new&sort=old&flag");

        assert_eq!(query.get("tag"), Some(&QueryValue::List(vec!["a".into(), "b".into()])));
        assert_eq!(query.get("sort"), Some(&QueryValue::Single("old".into())));
        assert_eq!(query.get("flag"), Some(&QueryValue::Single(String::new())));
    }

    #[test]
    fn test_query_decoding() {
        let query = parse_query("q=hello+world&city=K%C3%B6ln&=ignored");

        assert_eq!(query.get("q").and_then(QueryValue::as_str), Some("hello world"));
        assert_eq!(query.get("city").and_then(QueryValue::as_str), Some("Köln"));
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn test_url_decode_invalid_utf8_is_lossy() {
        assert_eq!(url_decode("caf%C3%A9"), "café");
        assert_eq!(url_decode("bad%FF"), "bad\u{FFFD}");
        assert_eq!(url_decode("100%"), "100%");
    }

    #[test]
    fn test_context_locals() {
        let ctx = RequestContext::new("/", PathParams::new(), QueryParams::new())
            .with_local("site_url", "https://example.com");

        assert_eq!(ctx.local("site_url"), Some(&Value::from("https://example.com")));
        assert_eq!(ctx.param("missing"), None);
    }
}
