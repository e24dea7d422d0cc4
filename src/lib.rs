//! # Semcache - Embedded Semantic Cache for LLM Responses
//!
//! Semcache memoizes expensive natural-language-driven computations (such as
//! LLM calls) by fingerprinting the combination of a prompt and its
//! surrounding situational context, and serving a previously computed result
//! whenever a *semantically* similar prompt recurs in an *identical*
//! context, not just on exact text match.
//!
//! Similarity is purely statistical: a from-scratch TF-IDF vectorizer over
//! word and ideograph n-grams, ranked by cosine similarity. There are no
//! machine-learned embeddings and no external services; the cache is a
//! single in-process store with a crash-tolerant directory of JSON records
//! and time-based eviction.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use semcache::{CacheConfig, CacheStore};
//! use serde_json::json;
//!
//! fn main() -> semcache::Result<()> {
//!     let mut store = CacheStore::open(CacheConfig::new(".semcache/cache"))?;
//!
//!     let context = json!({
//!         "url": "https://example.com",
//!         "elements": [{"tag": "input", "text": "search"}],
//!     });
//!
//!     // Compute on miss, serve from cache on semantically similar repeats
//!     let response = store.get_or_compute("fill the search box", &context, || {
//!         Ok::<_, semcache::SemcacheError>(json!({"action": "fill", "selector": "#q"}))
//!     })?;
//!     println!("{}", response);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Semantic Matching**: TF-IDF + cosine similarity over prompt text,
//!   robust to mixed alphabetic and CJK scripts
//! - **Context Scoping**: lookups only match entries whose pruned context
//!   fingerprint is identical, so "fill the search box" on one page never
//!   answers for another
//! - **Durable Mirror**: one JSON record per entry in a configurable
//!   directory; corrupt records are detected, deleted, and skipped on load
//! - **TTL Eviction**: records older than the configured window are expired
//!   on load and on demand
//!
//! ## Concurrency
//!
//! All operations are synchronous and blocking; the store has no internal
//! locking. Wrap a shared [`CacheStore`] in a mutex, or keep it on one
//! thread.

#![warn(missing_docs)]

pub mod distance;
pub mod error;
pub mod fingerprint;
pub mod store;
pub mod vectorizer;

pub use error::{Result, SemcacheError};
pub use fingerprint::{ContextFingerprinter, FingerprintConfig};
pub use store::{CacheConfig, CacheEntry, CacheStats, CacheStore};
pub use vectorizer::{TfIdfVectorizer, VectorizerConfig};
