//! Unplug - Core
//!
//! A routing-and-caching layer that sits in front of a host application.
//!
//! # Overview
//!
//! Requests are matched against user-declared routes stored in a segment trie.
//! Successful GET responses are written to a content-addressed file and a
//! rewrite rule pointing at that file is added to the nearest `.htaccess`, so
//! the front-end web server can answer the next identical request without
//! running the application at all.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use unplug_core::prelude::*;
//!
//! let mut router = Router::new();
//! router.get("/post/:slug", |ctx: &RequestContext| {
//!     format!("<h1>{}</h1>", ctx.param("slug").unwrap_or_default())
//! });
//! router.catchall(|_ctx: &RequestContext| HttpResponse::not_found("nothing here"));
//!
//! let cache = Cache::new(CacheConfig::new("./_unplug_cache"))?;
//! let dispatcher = Dispatcher::new(router, Some(cache), DispatchConfig::default());
//!
//! // per request, inside the host:
//! let served = dispatcher.handle(&Request::new(HttpMethod::GET, "/post/hello"), &mut sink)?;
//! ```
//!
//! # Architecture
//!
//! - [`routing`] - Segment trie and the route registry built on top of it
//! - [`cache`] - Content-addressed response files and the managed rewrite rules
//! - [`dispatch`] - Per-request flow: cache lookup, routing, persistence
//! - [`http`] - Request context, responses and the `Responder` seam
//! - [`config`] - TOML/environment configuration
//! - [`logging`] - `log` facade backend with JSON, human and logfmt output

pub mod cache;
pub mod config; // Configuration system with TOML support
pub mod dispatch;
pub mod http;
pub mod logging; // Logging backend for the standard log crate
pub mod routing;

// Prelude module for convenient imports
pub mod prelude;

pub use cache::{Cache, CacheConfig, FlushPolicy};
pub use dispatch::{DispatchConfig, Dispatcher, Served};
pub use http::{Content, HttpMethod, HttpResponse, Request, RequestContext, Responder};
pub use routing::{Router, Trie};

use std::path::PathBuf;

// Main result type for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Unplug
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The SHA-256 implementation failed its self-check
    #[error("SHA-256 is not available")]
    DigestUnavailable,
    /// No rewrite configuration file between the start directory and the root
    #[error("no {name} found in {} or any parent directory", start.display())]
    RewriteFileNotFound { name: String, start: PathBuf },
    /// The cache directory cannot be created or written to
    #[error("cache directory {} is not writable: {source}", path.display())]
    CacheDirNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A handler produced something that cannot become a response
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
