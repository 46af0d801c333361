//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use unplug_core::prelude::*;
//! ```

// === Routing ===
pub use crate::routing::{Handler, Middleware, Route, Router};

// === Cache ===
pub use crate::cache::{Cache, CacheConfig, CachedEntry, FlushPolicy, Rule};

// === Dispatch ===
pub use crate::dispatch::{DispatchConfig, Dispatcher, Served};

// === HTTP types ===
pub use crate::http::{
    Content, HttpMethod, HttpResponse, QueryParams, QueryValue, Request, RequestContext,
    Responder, ResponseSink, StatusCode,
};

// === Configuration ===
pub use crate::config::UnplugConfig;
pub use crate::logging::LoggingConfig;

// === Errors ===
pub use crate::{Error, Result};
