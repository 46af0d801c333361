//! Request and response model shared by the router, the cache and the host
//!
//! The core never talks to a socket. The host hands over a [`Request`], the
//! router turns it into a [`RequestContext`] for the handler, handlers return
//! [`Content`], and the finished [`HttpResponse`] goes back to the host through
//! a [`ResponseSink`].
//!
//! - [`request`] - Methods, query parsing and the per-request context
//! - [`response`] - Status codes, responses, the `Content` sum type and the
//!   `Responder` seam the cache consumes

pub mod request;
pub mod response;

pub use request::{
    parse_query, url_decode, HttpMethod, PathParams, QueryParams, QueryValue, Request,
    RequestContext,
};
pub use response::{Content, HttpResponse, Responder, ResponseSink, StatusCode};

/// HTTP constants
pub mod constants {
    /// Common HTTP headers
    pub mod headers {
        pub const CONTENT_TYPE: &str = "Content-Type";
        pub const CONTENT_LENGTH: &str = "Content-Length";
        pub const LOCATION: &str = "Location";
        pub const CACHE_STATUS: &str = "X-Unplug-Cache";
    }

    /// Common content types
    pub mod content_types {
        pub const HTML: &str = "text/html; charset=utf-8";
        pub const JSON: &str = "application/json";
        pub const XML: &str = "text/xml; charset=utf-8";
        pub const TEXT: &str = "text/plain; charset=utf-8";
        pub const CSS: &str = "text/css";
        pub const JAVASCRIPT: &str = "application/javascript";
        pub const BINARY: &str = "application/octet-stream";
    }
}

/// Every extension [`extension_for`] can produce
pub const KNOWN_EXTENSIONS: [&str; 6] = ["html", "json", "xml", "txt", "css", "js"];

/// Map a `Content-Type` value to the file extension used for cache entries.
///
/// Parameters such as `charset` are ignored. Unrecognized types give `None`.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();

    match mime.as_str() {
        "text/html" => Some("html"),
        "application/json" => Some("json"),
        "text/xml" | "application/xml" => Some("xml"),
        "text/plain" => Some("txt"),
        "text/css" => Some("css"),
        "application/javascript" | "text/javascript" => Some("js"),
        mime if mime.ends_with("+xml") => Some("xml"),
        mime if mime.ends_with("+json") => Some("json"),
        _ => None,
    }
}

/// Content type served for a cache entry with the given extension
pub fn content_type_for(extension: &str) -> &'static str {
    use constants::content_types;

    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => content_types::HTML,
        "json" => content_types::JSON,
        "xml" => content_types::XML,
        "txt" => content_types::TEXT,
        "css" => content_types::CSS,
        "js" => content_types::JAVASCRIPT,
        _ => content_types::BINARY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_ignores_parameters() {
        assert_eq!(extension_for("text/html; charset=utf-8"), Some("html"));
        assert_eq!(extension_for("APPLICATION/JSON"), Some("json"));
        assert_eq!(extension_for("application/rss+xml"), Some("xml"));
        assert_eq!(extension_for("image/png"), None);
        assert_eq!(extension_for(""), None);
    }

    #[test]
    fn test_content_type_round_trip_for_known_extensions() {
        for ext in KNOWN_EXTENSIONS {
            assert_eq!(extension_for(content_type_for(ext)), Some(ext));
        }
        assert_eq!(content_type_for("bin"), constants::content_types::BINARY);
    }
}
