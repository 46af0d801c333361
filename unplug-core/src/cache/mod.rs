//! Response cache for Unplug
//!
//! Rendered responses are written to `<sha256(path)>.<ext>` files and a
//! rewrite rule pointing at each file is kept in the managed section of the
//! nearest rewrite configuration file, so the web server can serve repeat
//! requests without running the application.

pub mod fs;
pub mod htaccess;
pub mod rule;
pub mod store;

pub use htaccess::{RewriteConfig, RewriteFile};
pub use rule::{escape_pattern, Rule};
pub use store::{
    hash_hex, Cache, CacheConfig, CachedEntry, FlushPolicy, InvalidationPredicate,
    DEFAULT_CACHE_DIR, DEFAULT_REWRITE_FILE, DEFAULT_TYPES,
};
