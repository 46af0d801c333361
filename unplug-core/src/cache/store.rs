//! Content-addressed response files plus the rules that expose them

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::fs::{atomic_write, empty_directory, check_writable, relative_dir};
use super::htaccess::RewriteFile;
use super::rule::Rule;
use crate::http::{content_type_for, Responder, StatusCode, KNOWN_EXTENSIONS};
use crate::{Error, Result};

pub const DEFAULT_CACHE_DIR: &str = "_unplug_cache";
pub const DEFAULT_REWRITE_FILE: &str = ".htaccess";
pub const DEFAULT_TYPES: [&str; 3] = ["html", "xml", "json"];

const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Predicate run against a cached file before it is served; `true` means
/// stale
pub type InvalidationPredicate = Box<dyn Fn(&Path) -> bool + Send + Sync>;

/// What `flush` removes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// Empty the rules section, leave response files for an external sweep
    #[default]
    RulesOnly,
    /// Also delete everything in the cache directory
    RulesAndFiles,
}

/// Cache construction options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub dir: PathBuf,
    /// Extensions eligible for caching
    pub types: Vec<String>,
    /// Cache responses whose extension is not in `types`
    pub cache_unknown_types: bool,
    /// File name of the rewrite configuration
    pub rewrite_file: String,
    /// Where the upward search for the rewrite file starts; the cache
    /// directory when unset
    pub search_from: Option<PathBuf>,
    pub flush_policy: FlushPolicy,
}

impl CacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            types: DEFAULT_TYPES.iter().map(|t| t.to_string()).collect(),
            cache_unknown_types: false,
            rewrite_file: DEFAULT_REWRITE_FILE.to_string(),
            search_from: None,
            flush_policy: FlushPolicy::default(),
        }
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cache_unknown_types(mut self, enabled: bool) -> Self {
        self.cache_unknown_types = enabled;
        self
    }

    pub fn with_rewrite_file(mut self, name: impl Into<String>) -> Self {
        self.rewrite_file = name.into();
        self
    }

    pub fn with_search_from(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_from = Some(dir.into());
        self
    }

    pub fn with_flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.flush_policy = policy;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

/// A response file that may be served for a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    path: PathBuf,
    extension: String,
}

impl CachedEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn content_type(&self) -> &'static str {
        content_type_for(&self.extension)
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|source| Error::Read { path: self.path.clone(), source })
    }
}

/// On-disk response cache
///
/// Bodies are stored as `<sha256(path)>.<ext>` in a flat directory. Each
/// stored path gets a rule in the managed section of the nearest rewrite
/// file so the web server can answer without the application.
pub struct Cache {
    config: CacheConfig,
    dir: PathBuf,
    rewrite_file: RewriteFile,
    rewrite_base: String,
    rel_dir: String,
    invalidators: Vec<InvalidationPredicate>,
}

impl Cache {
    /// Prepare the cache directory and find the rewrite file.
    ///
    /// Fails when SHA-256 does not self-check, the cache directory is not
    /// writable, or no rewrite file exists at or above the search start.
    pub fn new(config: CacheConfig) -> Result<Self> {
        check_digest()?;

        let not_writable =
            |source: std::io::Error| Error::CacheDirNotWritable { path: config.dir.clone(), source };
        fs::create_dir_all(&config.dir).map_err(not_writable)?;
        let dir = config.dir.canonicalize().map_err(not_writable)?;
        check_writable(&dir).map_err(not_writable)?;

        let start = match &config.search_from {
            Some(start) => start
                .canonicalize()
                .map_err(|source| Error::Read { path: start.clone(), source })?,
            None => dir.clone(),
        };
        let rewrite_file = RewriteFile::locate(&start, &config.rewrite_file)?;
        let rewrite_base = rewrite_file.read()?.rewrite_base().to_string();
        let rel_dir = relative_dir(rewrite_file.dir(), &dir);

        info!(
            "Cache ready in {} (rules in {}, targets under {})",
            dir.display(),
            rewrite_file.path().display(),
            rel_dir
        );

        Ok(Self { config, dir, rewrite_file, rewrite_base, rel_dir, invalidators: Vec::new() })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Canonical cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn rewrite_file_path(&self) -> &Path {
        self.rewrite_file.path()
    }

    /// The `RewriteBase` directive found when the cache was created
    pub fn rewrite_base(&self) -> &str {
        &self.rewrite_base
    }

    /// Register a predicate; any predicate returning `true` for a file hides
    /// it from [`Cache::lookup`]
    pub fn invalidate<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.invalidators.push(Box::new(predicate));
        self
    }

    /// Persist `response` for `path` and make sure a rule serves it.
    ///
    /// Returns the written file, or `None` when the response has no content
    /// type that may be cached.
    pub fn add<R: Responder + ?Sized>(&self, path: &str, response: &R) -> Result<Option<PathBuf>> {
        let Some(extension) = self.eligible_extension(response) else {
            debug!("Not caching {}: no cacheable content type", path);
            return Ok(None);
        };

        let path = self.normalize(path);
        let file = self.save(&path, extension, response.body())?;
        self.insert(Rule::file(&path, &self.target(&file)))?;

        Ok(Some(file))
    }

    /// Like [`Cache::add`] for a pattern that is already a rewrite regex
    pub fn add_regexp<R: Responder + ?Sized>(
        &self,
        pattern: &str,
        response: &R,
    ) -> Result<Option<PathBuf>> {
        let Some(extension) = self.eligible_extension(response) else {
            debug!("Not caching {}: no cacheable content type", pattern);
            return Ok(None);
        };

        let file = self.save(pattern, extension, response.body())?;
        self.insert(Rule::regexp(pattern, &self.target(&file)))?;

        Ok(Some(file))
    }

    /// Add a redirect rule for `path`; no file is written
    pub fn add_redirect(&self, path: &str, location: &str, status: StatusCode) -> Result<()> {
        let path = self.normalize(path);
        self.insert(Rule::redirect(&path, location, status.as_u16()))?;
        Ok(())
    }

    /// Empty the managed rules section, and the cache directory when the
    /// policy says so. Returns the number of rule lines removed.
    pub fn flush(&self) -> Result<usize> {
        self.flush_with(self.config.flush_policy)
    }

    pub fn flush_with(&self, policy: FlushPolicy) -> Result<usize> {
        let removed = self.rewrite_file.update(|config| config.remove_all_rules())?;

        if policy == FlushPolicy::RulesAndFiles {
            let files = empty_directory(&self.dir)
                .map_err(|source| Error::Write { path: self.dir.clone(), source })?;
            info!("Flushed {} rule lines and {} cache entries", removed, files);
        } else {
            info!("Flushed {} rule lines", removed);
        }

        Ok(removed)
    }

    /// Rule lines currently in the managed section
    pub fn rules(&self) -> Result<Vec<String>> {
        Ok(self.rewrite_file.read()?.rules().to_vec())
    }

    /// The entry served for `path`: its body file exists, the rules section
    /// still routes the path to it, and no invalidator rejects it
    pub fn lookup(&self, path: &str) -> Option<CachedEntry> {
        let normalized = self.normalize(path);
        let rewrite = match self.rewrite_file.read() {
            Ok(rewrite) => rewrite,
            Err(err) => {
                warn!("Cannot check rules for {}: {}", path, err);
                return None;
            }
        };

        let entry = self.candidate_extensions(&normalized).into_iter().find_map(|ext| {
            let file = self.file_for(&normalized, ext);
            let routed = file.is_file()
                && rewrite.rule_exists(&Rule::file(&normalized, &self.target(&file)));
            routed.then(|| CachedEntry { path: file, extension: ext.to_string() })
        })?;

        if self.invalidators.iter().any(|stale| stale(entry.path())) {
            debug!("Cache entry {} invalidated", entry.path.display());
            return None;
        }

        Some(entry)
    }

    /// Extensions `add` may have stored `normalized` under, the one implied
    /// by the path first
    fn candidate_extensions<'a>(&'a self, normalized: &'a str) -> Vec<&'a str> {
        let unknown = self.config.cache_unknown_types;
        let storable =
            |ext: &str| self.is_eligible(ext) || (unknown && KNOWN_EXTENSIONS.iter().any(|k| *k == ext));

        let implied = extension_of(normalized).filter(|ext| storable(*ext));
        let configured = self.config.types.iter().map(String::as_str);
        let known = KNOWN_EXTENSIONS.iter().copied().filter(|_| unknown);

        let mut candidates: Vec<&str> = Vec::new();
        for ext in implied.into_iter().chain(configured).chain(known) {
            if !candidates.contains(&ext) {
                candidates.push(ext);
            }
        }
        candidates
    }

    /// Where the body for an already normalized path is stored
    pub fn file_for(&self, normalized: &str, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", hash_hex(normalized), extension))
    }

    /// Strip one leading `/` when the rewrite base already ends in one
    pub fn normalize(&self, path: &str) -> String {
        if self.rewrite_base.ends_with('/') {
            path.strip_prefix('/').unwrap_or(path).to_string()
        } else {
            path.to_string()
        }
    }

    fn is_eligible(&self, extension: &str) -> bool {
        self.config.types.iter().any(|t| t.eq_ignore_ascii_case(extension))
    }

    fn eligible_extension<R: Responder + ?Sized>(&self, response: &R) -> Option<&'static str> {
        response
            .extension()
            .filter(|ext| self.config.cache_unknown_types || self.is_eligible(ext))
    }

    fn save(&self, key: &str, extension: &str, body: &[u8]) -> Result<PathBuf> {
        let name = format!("{}.{}", hash_hex(key), extension);
        let file = atomic_write(&self.dir, &name, body)
            .map_err(|source| Error::Write { path: self.dir.join(&name), source })?;
        debug!("Stored {} bytes for {} in {}", body.len(), key, name);
        Ok(file)
    }

    fn target(&self, file: &Path) -> String {
        let name = file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        format!("{}/{}", self.rel_dir, name)
    }

    fn insert(&self, rule: Rule) -> Result<bool> {
        let inserted = self.rewrite_file.update(|config| {
            if config.rule_exists(&rule) {
                false
            } else {
                config.insert_rule(&rule);
                true
            }
        })?;

        if inserted {
            info!("Added rule: {}", rule);
        }
        Ok(inserted)
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("dir", &self.dir)
            .field("rewrite_file", &self.rewrite_file.path())
            .field("rewrite_base", &self.rewrite_base)
            .field("invalidators", &self.invalidators.len())
            .finish()
    }
}

/// Lowercase hex SHA-256 of `key`
pub fn hash_hex(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

fn check_digest() -> Result<()> {
    if hash_hex("") == EMPTY_SHA256 {
        Ok(())
    } else {
        Err(Error::DigestUnavailable)
    }
}

/// Extension of the last path segment, if it has one
fn extension_of(path: &str) -> Option<&str> {
    let last = path.rsplit('/').next()?;
    let (stem, ext) = last.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}
