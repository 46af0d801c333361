//! Path routing
//!
//! - [`trie`] - Arena-backed segment trie, no knowledge of HTTP
//! - [`router`] - Route registration, optional-segment expansion and matching

pub mod router;
pub mod trie;

pub use router::{variations, Handler, Matched, Middleware, Rendered, Route, Router};
pub use trie::{NodeId, Trie, DEFAULT_WILDCARD};
