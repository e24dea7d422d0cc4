//! Cache Store
//!
//! The stateful orchestrator: owns the cached entries, their derived TF-IDF
//! vectors, and the durable mirror on disk. Lookups fingerprint the supplied
//! context, restrict candidates to entries from an identical context, and
//! rank candidate prompts by cosine similarity against the query prompt.
//!
//! All operations are synchronous and blocking, including durable reads and
//! writes. The store performs no internal locking and is not safe for
//! unsynchronized concurrent use: callers that share a store across threads
//! must wrap it in a mutex or serialize access themselves.
//!
//! # Durable format
//!
//! One JSON file per entry, named `<key>.json` inside the configured cache
//! directory:
//!
//! ```json
//! {
//!   "timestamp": "2026-08-30T12:00:00+00:00",
//!   "prompt": "fill the search box",
//!   "context": { "url": "https://example.com" },
//!   "response": { "action": "fill", "selector": "#search" }
//! }
//! ```
//!
//! The raw context is persisted (not its hash), so the fingerprint is
//! recomputed on load and a fingerprinting change migrates old records
//! automatically. Writes are not atomic; a crash mid-write can leave one
//! corrupted record, which the next load detects, deletes, and skips.
//!
//! # Example
//!
//! ```rust,no_run
//! use semcache::{CacheConfig, CacheStore};
//! use serde_json::json;
//!
//! fn main() -> semcache::Result<()> {
//!     let mut store = CacheStore::open(CacheConfig::new(".semcache/cache"))?;
//!
//!     let context = json!({"url": "https://example.com"});
//!     store.insert("fill the search box", &context, json!({"action": "fill"}))?;
//!
//!     // A semantically similar prompt in the same context hits the cache
//!     if let Some(response) = store.lookup("fill the search field", &context) {
//!         println!("cached: {}", response);
//!     }
//!     Ok(())
//! }
//! ```

use crate::distance::cosine_similarity;
use crate::error::{Result, SemcacheError};
use crate::fingerprint::{ContextFingerprinter, FingerprintConfig};
use crate::vectorizer::{TfIdfVectorizer, VectorizerConfig};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// File extension distinguishing cache records from other directory contents
const CACHE_FILE_EXT: &str = "json";

/// Configuration for a [`CacheStore`]
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding the durable cache records; created if absent
    pub cache_dir: PathBuf,
    /// Entries older than this many days are expired
    pub ttl_days: i64,
    /// Minimum cosine similarity for a lookup hit (0.0-1.0)
    pub similarity_threshold: f32,
    /// Vectorizer settings
    pub vectorizer: VectorizerConfig,
    /// Context fingerprint denylists
    pub fingerprint: FingerprintConfig,
}

impl CacheConfig {
    /// Create a config with the given cache directory and default settings
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ttl_days: 7,
            similarity_threshold: 0.7,
            vectorizer: VectorizerConfig::default(),
            fingerprint: FingerprintConfig::default(),
        }
    }

    /// Set the expiry window in days
    #[must_use]
    pub fn with_ttl_days(mut self, days: i64) -> Self {
        self.ttl_days = days;
        self
    }

    /// Set the similarity threshold
    #[must_use]
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Set the vectorizer configuration
    #[must_use]
    pub fn with_vectorizer(mut self, config: VectorizerConfig) -> Self {
        self.vectorizer = config;
        self
    }

    /// Set the fingerprint configuration
    #[must_use]
    pub fn with_fingerprint(mut self, config: FingerprintConfig) -> Self {
        self.fingerprint = config;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.ttl_days <= 0 {
            return Err(SemcacheError::InvalidConfig(
                "ttl_days must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(SemcacheError::InvalidConfig(format!(
                "similarity_threshold must be in [0.0, 1.0], got {}",
                self.similarity_threshold
            )));
        }
        let (min_n, max_n) = self.vectorizer.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(SemcacheError::InvalidConfig(format!(
                "invalid ngram_range ({}, {})",
                min_n, max_n
            )));
        }
        if self.vectorizer.max_features == 0 {
            return Err(SemcacheError::InvalidConfig(
                "max_features must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// One memoized result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Stable identifier derived from `(prompt, context_hash)`; also the
    /// durable record's file stem
    pub key: String,
    /// Original request text
    pub prompt: String,
    /// Context fingerprint at insertion time
    pub context_hash: String,
    /// Opaque cached value; never parsed or mutated by the store
    pub response: Value,
    /// Creation time, the basis for expiry
    pub timestamp: DateTime<Utc>,
    /// Last computed match quality against a query (diagnostic only)
    pub similarity_score: f32,
    /// Times this entry has been referenced; starts at 1 at creation
    pub usage_count: u64,
}

/// Durable record layout, one file per entry
#[derive(Debug, Serialize, Deserialize)]
struct DiskRecord {
    timestamp: String,
    prompt: String,
    context: Value,
    response: Value,
}

/// Aggregate cache statistics
///
/// `hit_rate` is total usage over entry count. Every entry starts with a
/// usage count of 1, so this is the average number of references per entry
/// (at least 1 for a nonempty cache), not a 0-1 hit ratio.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cached entries
    pub total_entries: usize,
    /// Sum of usage counts across entries
    pub total_usage: u64,
    /// Mean similarity score over entries with a nonzero score, 0 if none
    pub average_similarity: f32,
    /// Average references per entry
    pub hit_rate: f32,
}

/// Semantic cache of prompt/context keyed responses with a durable mirror
///
/// Owned and injectable: open as many independent stores as needed (tests
/// typically open one per temporary directory). Entries are owned
/// exclusively by the store; lookups return responses by clone.
pub struct CacheStore {
    config: CacheConfig,
    fingerprinter: ContextFingerprinter,
    vectorizer: TfIdfVectorizer,
    entries: Vec<CacheEntry>,
    /// Derived state, positionally parallel to `entries`; rebuilt in full on
    /// every mutation so corpus statistics stay globally consistent
    prompt_vectors: Vec<Vec<f32>>,
}

impl CacheStore {
    /// Open a cache store, creating the cache directory if absent and
    /// loading every surviving durable record
    ///
    /// Records that fail to parse and records older than `ttl_days` are
    /// deleted and skipped. Surviving entries recompute their context hash
    /// from the raw persisted context, so a fingerprinting change migrates
    /// old data automatically. Directory-level and file-read I/O failures
    /// are fatal.
    pub fn open(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.cache_dir)?;

        let mut store = Self {
            fingerprinter: ContextFingerprinter::new(config.fingerprint.clone()),
            vectorizer: TfIdfVectorizer::new(config.vectorizer.clone()),
            config,
            entries: Vec::new(),
            prompt_vectors: Vec::new(),
        };
        store.load_existing()?;
        Ok(store)
    }

    fn load_existing(&mut self) -> Result<()> {
        let ttl = Duration::days(self.config.ttl_days);
        let now = Utc::now();

        for dir_entry in fs::read_dir(&self.config.cache_dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CACHE_FILE_EXT) {
                continue;
            }

            // Read raw bytes; a write interrupted mid-multibyte-character
            // leaves invalid UTF-8, which must reap the record like any
            // other corruption rather than fail the open.
            let raw = fs::read(&path)?;
            let record: DiskRecord = match serde_json::from_slice(&raw) {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Removing corrupt cache record");
                    fs::remove_file(&path)?;
                    continue;
                }
            };

            let timestamp = match DateTime::parse_from_rfc3339(&record.timestamp) {
                Ok(ts) => ts.with_timezone(&Utc),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Removing cache record with invalid timestamp");
                    fs::remove_file(&path)?;
                    continue;
                }
            };

            if now - timestamp > ttl {
                debug!(path = %path.display(), "Removing expired cache record");
                fs::remove_file(&path)?;
                continue;
            }

            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();

            self.entries.push(CacheEntry {
                key,
                context_hash: self.fingerprinter.fingerprint(&record.context),
                prompt: record.prompt,
                response: record.response,
                timestamp,
                similarity_score: 0.0,
                usage_count: 1,
            });
        }

        self.refit();
        Ok(())
    }

    /// Look up a cached response for a semantically similar prompt in an
    /// identical context
    ///
    /// Candidates are the entries whose context fingerprint matches exactly;
    /// similarity applies to prompt text only, never across contexts. The
    /// best candidate at or above the similarity threshold wins, with ties
    /// kept by insertion order. A hit records the score on the entry, bumps
    /// its usage count, and returns the response by clone.
    pub fn lookup(&mut self, prompt: &str, context: &Value) -> Option<Value> {
        if self.entries.is_empty() {
            return None;
        }

        let context_hash = self.fingerprinter.fingerprint(context);
        let candidates: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.context_hash == context_hash)
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return None;
        }

        // Re-transform the query with each candidate prompt against the
        // currently-fit vocabulary
        let mut texts: Vec<&str> = Vec::with_capacity(candidates.len() + 1);
        texts.push(prompt);
        texts.extend(candidates.iter().map(|&i| self.entries[i].prompt.as_str()));
        let vectors = self.vectorizer.transform(&texts);
        let (query_vector, candidate_vectors) = vectors.split_first()?;

        // A candidate must strictly beat the running best, which starts at
        // zero, so a zero-similarity match is always a miss even when the
        // configured threshold is 0.0.
        let mut best: Option<usize> = None;
        let mut best_similarity = 0.0_f32;
        for (&entry_idx, candidate_vector) in candidates.iter().zip(candidate_vectors) {
            let similarity = cosine_similarity(query_vector, candidate_vector);
            if similarity > best_similarity && similarity >= self.config.similarity_threshold {
                best = Some(entry_idx);
                best_similarity = similarity;
            }
        }

        let entry_idx = best?;
        let similarity = best_similarity;
        let entry = &mut self.entries[entry_idx];
        entry.similarity_score = similarity;
        entry.usage_count += 1;
        debug!(similarity = similarity, prompt = prompt, "Semantic cache hit");
        Some(entry.response.clone())
    }

    /// Insert a freshly computed response
    ///
    /// Appends a new in-memory entry, re-fits the vectorizer over the full
    /// updated corpus, and persists the durable record before returning.
    ///
    /// The key is a digest of the prompt and context fingerprint, and names
    /// the backing file, so inserting an identical `(prompt, context)` pair
    /// twice appends a second in-memory entry but overwrites the single
    /// durable record. That duplication is deliberate; a reload collapses
    /// the duplicates back to one entry.
    pub fn insert(&mut self, prompt: &str, context: &Value, response: Value) -> Result<()> {
        let context_hash = self.fingerprinter.fingerprint(context);
        let key = entry_key(prompt, &context_hash);
        let timestamp = Utc::now();

        let record = DiskRecord {
            timestamp: timestamp.to_rfc3339(),
            prompt: prompt.to_string(),
            context: context.clone(),
            response: response.clone(),
        };

        self.entries.push(CacheEntry {
            key: key.clone(),
            prompt: prompt.to_string(),
            context_hash,
            response,
            timestamp,
            similarity_score: 0.0,
            usage_count: 1,
        });
        self.refit();

        // Persist before returning; not atomic, a crash here can leave one
        // corrupt record for the next load to discard
        let path = self.record_path(&key);
        fs::write(&path, serde_json::to_vec_pretty(&record)?)?;
        debug!(key = %key, prompt = prompt, "Cache entry persisted");
        Ok(())
    }

    /// Return the cached response or compute, insert, and return a new one
    ///
    /// The compute function runs only on a cache miss. Its failure is logged
    /// and re-raised unchanged; the store has no substitute response to
    /// offer. Cache persistence failures surface through the same error type
    /// via `From<SemcacheError>`.
    pub fn get_or_compute<F, E>(
        &mut self,
        prompt: &str,
        context: &Value,
        compute: F,
    ) -> std::result::Result<Value, E>
    where
        F: FnOnce() -> std::result::Result<Value, E>,
        E: From<SemcacheError> + std::fmt::Display,
    {
        if let Some(response) = self.lookup(prompt, context) {
            return Ok(response);
        }

        let response = compute().map_err(|e| {
            error!(prompt = prompt, error = %e, "Compute function failed on cache miss");
            e
        })?;
        self.insert(prompt, context, response.clone())
            .map_err(E::from)?;
        Ok(response)
    }

    /// Remove expired entries from memory and delete their backing records
    ///
    /// Scans the in-memory entries, not the cache directory: a backing
    /// record with no in-memory mirror is left alone here and reaped by the
    /// next [`CacheStore::open`]. A backing file that is already gone is not
    /// an error; other I/O failures propagate.
    pub fn clear_expired(&mut self) -> Result<()> {
        let ttl = Duration::days(self.config.ttl_days);
        let now = Utc::now();

        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| now - e.timestamp > ttl)
            .map(|e| e.key.clone())
            .collect();

        for key in &expired_keys {
            match fs::remove_file(self.record_path(key)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            debug!(key = %key, "Expired cache entry removed");
        }

        self.entries.retain(|e| now - e.timestamp <= ttl);
        self.refit();
        Ok(())
    }

    /// Current cache statistics
    pub fn statistics(&self) -> CacheStats {
        let total_entries = self.entries.len();
        if total_entries == 0 {
            return CacheStats::default();
        }

        let total_usage: u64 = self.entries.iter().map(|e| e.usage_count).sum();
        let scored: Vec<f32> = self
            .entries
            .iter()
            .map(|e| e.similarity_score)
            .filter(|&s| s > 0.0)
            .collect();
        let average_similarity = if scored.is_empty() {
            0.0
        } else {
            scored.iter().sum::<f32>() / scored.len() as f32
        };

        CacheStats {
            total_entries,
            total_usage,
            average_similarity,
            hit_rate: total_usage as f32 / total_entries as f32,
        }
    }

    /// Number of in-memory entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read-only view of the cached entries, in insertion order
    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    /// The cache directory this store persists into
    pub fn cache_dir(&self) -> &Path {
        &self.config.cache_dir
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.config
            .cache_dir
            .join(format!("{}.{}", key, CACHE_FILE_EXT))
    }

    /// Rebuild the vocabulary and every prompt vector from the full corpus.
    /// O(n) per mutation, which keeps corpus-relative IDF weights exact for
    /// the designed scale of hundreds to low thousands of entries.
    fn refit(&mut self) {
        let prompts: Vec<&str> = self.entries.iter().map(|e| e.prompt.as_str()).collect();
        self.vectorizer.fit(&prompts);
        self.prompt_vectors = self.vectorizer.transform(&prompts);
    }
}

/// Derive the stable entry key: a digest over the prompt and context
/// fingerprint, in that order
fn entry_key(prompt: &str, context_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(b":");
    hasher.update(context_hash.as_bytes());
    format!("{:x}", hasher.finalize())
}
