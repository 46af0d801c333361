//! Per-request control flow
//!
//! GET requests are first answered from the cache when a valid entry exists.
//! Otherwise the router runs, the response goes to the host, and only then
//! is it persisted. A failed cache write is logged and never fails the
//! request.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::cache::Cache;
use crate::http::constants::headers;
use crate::http::{HttpMethod, HttpResponse, Request, Responder, ResponseSink, StatusCode};
use crate::routing::Router;
use crate::Result;

/// Body of the response sent when nothing matches and there is no catchall
pub const NOT_FOUND_BODY: &str = "404 - Page not found";

/// Dispatch options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Consult and populate the cache
    pub cache_enabled: bool,
    /// Prefix for relative redirect locations, e.g. `https://example.com`
    pub site_url: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { cache_enabled: true, site_url: None }
    }
}

/// How a request was answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served {
    /// Straight from a cached file; no handler ran
    FromCache(PathBuf),
    /// A handler ran; `cached` tells whether the response was persisted
    Rendered { status: StatusCode, cached: bool },
    /// No route and no catchall
    NotFound,
}

/// Router and cache wired together
pub struct Dispatcher {
    router: Router,
    cache: Option<Cache>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(router: Router, cache: Option<Cache>, config: DispatchConfig) -> Self {
        Self { router, cache, config }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn cache(&self) -> Option<&Cache> {
        self.cache.as_ref()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Register a cache invalidation predicate
    pub fn invalidate<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        match self.cache.as_mut() {
            Some(cache) => {
                cache.invalidate(predicate);
            }
            None => debug!("Ignoring invalidation predicate, no cache configured"),
        }
        self
    }

    fn active_cache(&self) -> Option<&Cache> {
        self.cache.as_ref().filter(|_| self.config.cache_enabled)
    }

    /// Answer one request through `sink`
    pub fn handle(&self, request: &Request, sink: &mut dyn ResponseSink) -> Result<Served> {
        let is_get = request.method() == HttpMethod::GET;
        let path = self.router.request_path(request.path());

        if is_get {
            if let Some(file) = self.serve_cached(&path, sink)? {
                return Ok(Served::FromCache(file));
            }
        }

        let Some(rendered) = self.router.route(request)? else {
            debug!("{} {} not found", request.method(), path);
            sink.send(&HttpResponse::not_found(NOT_FOUND_BODY))?;
            return Ok(Served::NotFound);
        };

        let response = self.absolute_location(rendered.response);
        sink.send(&response)?;

        let cached = is_get && rendered.cacheable && self.store(&path, &response);
        Ok(Served::Rendered { status: response.status(), cached })
    }

    fn serve_cached(&self, path: &str, sink: &mut dyn ResponseSink) -> Result<Option<PathBuf>> {
        let Some(entry) = self.active_cache().and_then(|cache| cache.lookup(path)) else {
            return Ok(None);
        };

        // a concurrent flush may remove the file after lookup
        let body = match entry.read() {
            Ok(body) => body,
            Err(err) => {
                warn!("Cache entry for {} unreadable, rendering instead: {}", path, err);
                return Ok(None);
            }
        };

        let response = HttpResponse::new(StatusCode::Ok)
            .content_type(entry.content_type())
            .header(headers::CACHE_STATUS, "hit")
            .with_body(body);
        sink.send(&response)?;

        debug!("Served {} from {}", path, entry.path().display());
        Ok(Some(entry.path().to_path_buf()))
    }

    fn absolute_location(&self, response: HttpResponse) -> HttpResponse {
        let absolute = match (&self.config.site_url, response.location()) {
            (Some(site_url), Some(location)) if location.starts_with('/') => {
                Some(format!("{}{}", site_url.trim_end_matches('/'), location))
            }
            _ => None,
        };

        match absolute {
            Some(location) => response.header(headers::LOCATION, &location),
            None => response,
        }
    }

    fn store(&self, path: &str, response: &HttpResponse) -> bool {
        let Some(cache) = self.active_cache() else {
            return false;
        };

        let outcome = match response.status() {
            StatusCode::Ok => cache.add(path, response).map(|file| file.is_some()),
            status if status.is_redirect() => match response.location() {
                Some(location) => cache.add_redirect(path, location, status).map(|()| true),
                None => Ok(false),
            },
            _ => Ok(false),
        };

        outcome.unwrap_or_else(|err| {
            warn!("Could not cache {}: {}", path, err);
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::http::RequestContext;
    use std::fs;
    use tempfile::TempDir;

    fn setup(router: Router) -> (TempDir, Dispatcher) {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(".htaccess"), "").unwrap();
        let cache = Cache::new(CacheConfig::new(root.path().join("_unplug_cache"))).unwrap();
        (root, Dispatcher::new(router, Some(cache), DispatchConfig::default()))
    }

    #[test]
    fn test_default_not_found() {
        let (_root, dispatcher) = setup(Router::new());
        let mut sink: Vec<HttpResponse> = Vec::new();

        let served = dispatcher.handle(&Request::get("/nope"), &mut sink).unwrap();

        assert_eq!(served, Served::NotFound);
        assert_eq!(sink[0].status(), StatusCode::NotFound);
        assert_eq!(sink[0].body(), NOT_FOUND_BODY.as_bytes());
    }

    #[test]
    fn test_post_is_never_cached() {
        let mut router = Router::new();
        router.post("/form", |_: &RequestContext| "thanks");
        let (_root, dispatcher) = setup(router);
        let mut sink: Vec<HttpResponse> = Vec::new();

        let served = dispatcher.handle(&Request::post("/form"), &mut sink).unwrap();

        assert_eq!(served, Served::Rendered { status: StatusCode::Ok, cached: false });
        assert!(dispatcher.cache().unwrap().rules().unwrap().is_empty());
    }

    #[test]
    fn test_disabled_cache_is_bypassed() {
        let mut router = Router::new();
        router.get("/", |_: &RequestContext| "home");
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(".htaccess"), "").unwrap();
        let cache = Cache::new(CacheConfig::new(root.path().join("c"))).unwrap();
        let config = DispatchConfig { cache_enabled: false, site_url: None };
        let dispatcher = Dispatcher::new(router, Some(cache), config);
        let mut sink: Vec<HttpResponse> = Vec::new();

        for _ in 0..2 {
            let served = dispatcher.handle(&Request::get("/"), &mut sink).unwrap();
            assert_eq!(served, Served::Rendered { status: StatusCode::Ok, cached: false });
        }
    }

    #[test]
    fn test_redirect_cached_as_rule_with_site_url() {
        let mut router = Router::new();
        router.get("/old", |_: &RequestContext| HttpResponse::moved_permanently("new").with_cacheable(true));
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(".htaccess"), "").unwrap();
        let cache = Cache::new(CacheConfig::new(root.path().join("c"))).unwrap();
        let config = DispatchConfig { cache_enabled: true, site_url: Some("https://example.com/".into()) };
        let dispatcher = Dispatcher::new(router, Some(cache), config);
        let mut sink: Vec<HttpResponse> = Vec::new();

        let served = dispatcher.handle(&Request::get("/old"), &mut sink).unwrap();

        assert_eq!(served, Served::Rendered { status: StatusCode::MovedPermanently, cached: true });
        assert_eq!(sink[0].location(), Some("https://example.com/new/"));
        assert_eq!(
            dispatcher.cache().unwrap().rules().unwrap(),
            vec!["RewriteRule ^old/?$ https://example.com/new/ [R=301]".to_string()]
        );
    }

    #[test]
    fn test_uncacheable_redirect_not_stored() {
        let mut router = Router::new();
        router.get("/go", |_: &RequestContext| HttpResponse::found("/elsewhere"));
        let (_root, dispatcher) = setup(router);
        let mut sink: Vec<HttpResponse> = Vec::new();

        let served = dispatcher.handle(&Request::get("/go"), &mut sink).unwrap();

        assert_eq!(served, Served::Rendered { status: StatusCode::Found, cached: false });
        assert_eq!(sink[0].location(), Some("/elsewhere/"));
    }

    #[test]
    fn test_cache_failure_still_sends_response() {
        let mut router = Router::new();
        router.get("/page", |_: &RequestContext| "page");
        let (root, dispatcher) = setup(router);
        fs::remove_file(root.path().join(".htaccess")).unwrap();
        let mut sink: Vec<HttpResponse> = Vec::new();

        let served = dispatcher.handle(&Request::get("/page"), &mut sink).unwrap();

        assert_eq!(served, Served::Rendered { status: StatusCode::Ok, cached: false });
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_unknown_type_served_from_cache() {
        let mut router = Router::new();
        router.get("/robots.txt", |_: &RequestContext| HttpResponse::ok("").text("User-agent: *"));
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(".htaccess"), "").unwrap();
        let config = CacheConfig::new(root.path().join("c")).with_cache_unknown_types(true);
        let dispatcher =
            Dispatcher::new(router, Some(Cache::new(config).unwrap()), DispatchConfig::default());
        let mut sink: Vec<HttpResponse> = Vec::new();

        let first = dispatcher.handle(&Request::get("/robots.txt"), &mut sink).unwrap();
        let second = dispatcher.handle(&Request::get("/robots.txt"), &mut sink).unwrap();

        assert_eq!(first, Served::Rendered { status: StatusCode::Ok, cached: true });
        assert!(matches!(second, Served::FromCache(ref file) if file.extension().is_some_and(|e| e == "txt")));
        assert_eq!(sink[1].header_value(headers::CONTENT_TYPE), Some("text/plain; charset=utf-8"));
        assert_eq!(sink[1].body(), b"User-agent: *");
    }

    #[test]
    fn test_invalidate_without_cache_is_noop() {
        let mut dispatcher = Dispatcher::new(Router::new(), None, DispatchConfig::default());
        dispatcher.invalidate(|_: &Path| true);

        assert!(dispatcher.cache().is_none());
    }
}
