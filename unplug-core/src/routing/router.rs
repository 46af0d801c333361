//! Route registry and per-request matching
//!
//! GET and POST each get their own [`Trie`]; every other method matches
//! against an empty one. A pattern with optional segments (`:year?`) is
//! expanded into every concrete variation before insertion.

use std::sync::Arc;

use log::{debug, warn};

use super::trie::Trie;
use crate::http::{
    url_decode, Content, HttpMethod, HttpResponse, PathParams, QueryParams, Request,
    RequestContext, Responder,
};
use crate::Result;

/// Route handler function type
///
/// Whatever the closure returns is converted through [`Content`].
pub type Handler = Arc<dyn Fn(&RequestContext) -> Content + Send + Sync>;

/// Middleware function type
///
/// Returning `Some` replaces the context, `None` leaves it untouched.
pub type Middleware = Arc<dyn Fn(&RequestContext) -> Option<RequestContext> + Send + Sync>;

type RouteId = usize;

fn into_handler<F, R>(handler: F) -> Handler
where
    F: Fn(&RequestContext) -> R + Send + Sync + 'static,
    R: Into<Content>,
{
    Arc::new(move |ctx: &RequestContext| handler(ctx).into())
}

/// A single route definition
#[derive(Clone)]
pub struct Route {
    method: HttpMethod,
    pattern: String,
    handler: Handler,
    cacheable: bool,
}

impl Route {
    fn new(method: HttpMethod, pattern: &str, handler: Handler) -> Self {
        Self { method, pattern: pattern.to_string(), handler, cacheable: true }
    }

    /// Never persist responses of this route
    pub fn no_cache(&mut self) -> &mut Self {
        self.cacheable = false;
        self
    }

    /// Get the HTTP method for this route
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Get the pattern as declared
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Whether responses of this route may be cached
    ///
    /// POST routes never are.
    pub fn is_cacheable(&self) -> bool {
        self.cacheable && self.method == HttpMethod::GET
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("cacheable", &self.cacheable)
            .finish()
    }
}

/// Result of matching a request
pub struct Matched<'a> {
    pub handler: &'a Handler,
    pub context: RequestContext,
    /// `None` when the catchall answered
    pub route: Option<&'a Route>,
}

/// Result of running a matched handler
#[derive(Debug, Clone)]
pub struct Rendered {
    pub response: HttpResponse,
    /// Context after middleware
    pub context: RequestContext,
    /// Route and response both allow caching
    pub cacheable: bool,
}

/// HTTP router
///
/// Built once at startup and read-only afterwards.
pub struct Router {
    get_routes: Trie<RouteId>,
    post_routes: Trie<RouteId>,
    unrouted: Trie<RouteId>,
    routes: Vec<Route>,
    catchall: Option<Handler>,
    middleware: Vec<Middleware>,
    base_path: String,
}

impl Router {
    /// Create a new empty router
    pub fn new() -> Self {
        Self {
            get_routes: Trie::new(),
            post_routes: Trie::new(),
            unrouted: Trie::new(),
            routes: Vec::new(),
            catchall: None,
            middleware: Vec::new(),
            base_path: String::new(),
        }
    }

    /// Mount the router under a prefix such as `/blog`
    pub fn base(&mut self, path: &str) -> &mut Self {
        self.base_path = path.trim_matches('/').to_string();
        self
    }

    /// The prefix without surrounding slashes, empty when unset
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Register a route for any method
    ///
    /// Only GET and POST routes can ever match.
    pub fn register<F, R>(&mut self, method: HttpMethod, pattern: &str, handler: F) -> &mut Route
    where
        F: Fn(&RequestContext) -> R + Send + Sync + 'static,
        R: Into<Content>,
    {
        let id = self.routes.len();
        self.routes.push(Route::new(method, pattern, into_handler(handler)));

        match method {
            HttpMethod::GET | HttpMethod::POST => {
                let trie = self.trie_mut(method);
                for variation in variations(pattern) {
                    let node = trie.insert(&variation);
                    trie.set(node, id);
                }
                debug!("Registered route {} {}", method, pattern);
            }
            other => warn!("Route {} {} will never match, only GET and POST are routed", other, pattern),
        }

        &mut self.routes[id]
    }

    /// Register a GET route
    pub fn get<F, R>(&mut self, pattern: &str, handler: F) -> &mut Route
    where
        F: Fn(&RequestContext) -> R + Send + Sync + 'static,
        R: Into<Content>,
    {
        self.register(HttpMethod::GET, pattern, handler)
    }

    /// Register a POST route
    pub fn post<F, R>(&mut self, pattern: &str, handler: F) -> &mut Route
    where
        F: Fn(&RequestContext) -> R + Send + Sync + 'static,
        R: Into<Content>,
    {
        self.register(HttpMethod::POST, pattern, handler)
    }

    /// Set the fallback used when no route matches
    pub fn catchall<F, R>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&RequestContext) -> R + Send + Sync + 'static,
        R: Into<Content>,
    {
        self.catchall = Some(into_handler(handler));
        self
    }

    /// Add middleware; runs in registration order before every handler
    pub fn middleware<F>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(&RequestContext) -> Option<RequestContext> + Send + Sync + 'static,
    {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Get all registered routes
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn has_catchall(&self) -> bool {
        self.catchall.is_some()
    }

    fn trie(&self, method: HttpMethod) -> &Trie<RouteId> {
        match method {
            HttpMethod::GET => &self.get_routes,
            HttpMethod::POST => &self.post_routes,
            _ => &self.unrouted,
        }
    }

    fn trie_mut(&mut self, method: HttpMethod) -> &mut Trie<RouteId> {
        match method {
            HttpMethod::GET => &mut self.get_routes,
            HttpMethod::POST => &mut self.post_routes,
            _ => &mut self.unrouted,
        }
    }

    /// Split a raw request path into segments after removing the base path
    pub fn segments<'p>(&self, path: &'p str) -> Vec<&'p str> {
        let mut path = path.trim_start_matches('/');

        if !self.base_path.is_empty() {
            if let Some(rest) = path.strip_prefix(self.base_path.as_str()) {
                if rest.is_empty() || rest.starts_with('/') {
                    path = rest;
                }
            }
        }

        path.trim_matches('/').split('/').collect()
    }

    /// The decoded path a request is known by, always starting with `/`
    pub fn request_path(&self, path: &str) -> String {
        let decoded: Vec<String> = self.segments(path).into_iter().map(url_decode).collect();
        format!("/{}", decoded.join("/"))
    }

    /// Find the handler for a request, falling back to the catchall
    pub fn match_route(&self, method: HttpMethod, path: &str, query: QueryParams) -> Option<Matched<'_>> {
        let segments = self.segments(path);
        let mut params = PathParams::new();

        let found = self
            .trie(method)
            .search(&segments, &mut params)
            .and_then(|node| self.trie(method).get(node))
            .and_then(|&id| self.routes.get(id));

        let decoded: Vec<String> = segments.iter().map(|s| url_decode(s)).collect();
        let context = RequestContext::new(format!("/{}", decoded.join("/")), params, query);

        match found {
            Some(route) => {
                debug!("{} {} matched {}", method, path, route.pattern);
                Some(Matched { handler: &route.handler, context, route: Some(route) })
            }
            None => {
                let handler = self.catchall.as_ref()?;
                debug!("{} {} fell through to the catchall", method, path);
                Some(Matched { handler, context, route: None })
            }
        }
    }

    /// Match, run middleware and the handler, and coerce the result
    ///
    /// `Ok(None)` means nothing matched and there is no catchall.
    pub fn route(&self, request: &Request) -> Result<Option<Rendered>> {
        let Some(matched) = self.match_route(request.method(), request.path(), request.query())
        else {
            return Ok(None);
        };

        let context = self.run_middleware(matched.context);
        let response = HttpResponse::try_from((matched.handler)(&context))?;
        let cacheable =
            matched.route.is_some_and(Route::is_cacheable) && response.is_cacheable();

        Ok(Some(Rendered { response, context, cacheable }))
    }

    fn run_middleware(&self, context: RequestContext) -> RequestContext {
        self.middleware.iter().fold(context, |ctx, middleware| middleware(&ctx).unwrap_or(ctx))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand a pattern into every concrete segment sequence it stands for.
///
/// Each optional segment (trailing `?`) may independently be present or
/// absent. The full pattern comes first, then variations with one segment
/// omitted, then two, and so on. An empty variation becomes `[""]`.
pub fn variations(pattern: &str) -> Vec<Vec<String>> {
    let segments: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    let optional: Vec<usize> = segments
        .iter()
        .enumerate()
        .filter(|(_, segment)| segment.ends_with('?'))
        .map(|(index, _)| index)
        .collect();

    let mut masks: Vec<u64> = (0..1u64 << optional.len()).collect();
    masks.sort_by_key(|mask| mask.count_ones());

    let mut result: Vec<Vec<String>> = Vec::with_capacity(masks.len());
    for mask in masks {
        let mut variation: Vec<String> = segments
            .iter()
            .enumerate()
            .filter(|(index, _)| {
                optional.iter().position(|o| o == index).is_none_or(|bit| mask & (1 << bit) == 0)
            })
            .map(|(_, segment)| segment.strip_suffix('?').unwrap_or(segment).to_string())
            .collect();

        if variation.is_empty() {
            variation.push(String::new());
        }
        if !result.contains(&variation) {
            result.push(variation);
        }
    }

    result
}
